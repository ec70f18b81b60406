//! Orders as returned by the buyer, seller and admin order endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::ShippingAddress;
use crate::pagination::PageRequest;
use crate::types::time::opt_timestamp;
use crate::types::{OrderId, OrderStatus, PaymentMethod, StoreId, VariantId, Vnd};

/// A purchased line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOrderItem", rename_all = "camelCase")]
pub struct OrderItem {
    pub product_variant_id: Option<VariantId>,
    pub name: String,
    pub variant_name: Option<String>,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: Vnd,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderItem {
    product_variant_id: Option<VariantId>,
    product_name: Option<String>,
    name: Option<String>,
    variant_name: Option<String>,
    product_variant_name: Option<String>,
    product_image: Option<String>,
    image: Option<String>,
    image_url: Option<String>,
    quantity: Option<u32>,
    price: Option<Vnd>,
}

impl From<RawOrderItem> for OrderItem {
    fn from(raw: RawOrderItem) -> Self {
        Self {
            product_variant_id: raw.product_variant_id,
            name: raw
                .product_name
                .or(raw.name)
                .or_else(|| raw.product_variant_name.clone())
                .unwrap_or_default(),
            variant_name: raw.variant_name.or(raw.product_variant_name),
            image: raw.product_image.or(raw.image).or(raw.image_url),
            quantity: raw.quantity.unwrap_or(1),
            price: raw.price.unwrap_or_default(),
        }
    }
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Vnd {
        self.price.times(self.quantity)
    }
}

/// An order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOrder", rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<String>,
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
    pub items: Vec<OrderItem>,
    pub product_price: Option<Vnd>,
    pub shipping_fee: Vnd,
    pub discount: Vnd,
    /// Amount the buyer pays.
    pub total_price: Vnd,
    pub shipping_address: Option<ShippingAddress>,
    pub note: Option<String>,
    pub cancel_reason: Option<String>,
    #[serde(with = "opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(with = "opt_timestamp")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    id: Option<OrderId>,
    order_id: Option<OrderId>,
    #[serde(rename = "_id")]
    mongo_id: Option<OrderId>,
    order_number: Option<String>,
    status: Option<OrderStatus>,
    payment_method: Option<PaymentMethod>,
    payment_status: Option<String>,
    store_id: Option<StoreId>,
    store_name: Option<String>,
    items: Option<Vec<OrderItem>>,
    order_items: Option<Vec<OrderItem>>,
    product_price: Option<Vnd>,
    shipping_fee: Option<Vnd>,
    discount_amount: Option<Vnd>,
    discount: Option<Vnd>,
    store_discount_amount: Option<Vnd>,
    platform_discount_amount: Option<Vnd>,
    total_price: Option<Vnd>,
    total_amount: Option<Vnd>,
    final_total: Option<Vnd>,
    shipping_address: Option<ShippingAddress>,
    address: Option<ShippingAddress>,
    note: Option<String>,
    cancel_reason: Option<String>,
    #[serde(default, with = "opt_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    shipped_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    delivered_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    cancelled_at: Option<DateTime<Utc>>,
}

impl From<RawOrder> for Order {
    fn from(raw: RawOrder) -> Self {
        let discount = raw.discount_amount.or(raw.discount).unwrap_or_else(|| {
            raw.store_discount_amount.unwrap_or_default()
                + raw.platform_discount_amount.unwrap_or_default()
        });
        Self {
            id: raw
                .id
                .or(raw.order_id)
                .or(raw.mongo_id)
                .unwrap_or_else(|| OrderId::new("")),
            order_number: raw.order_number,
            status: raw.status.unwrap_or(OrderStatus::Unknown),
            payment_method: raw.payment_method,
            payment_status: raw.payment_status,
            store_id: raw.store_id,
            store_name: raw.store_name,
            items: raw.items.or(raw.order_items).unwrap_or_default(),
            product_price: raw.product_price,
            shipping_fee: raw.shipping_fee.unwrap_or_default(),
            discount,
            total_price: raw
                .total_price
                .or(raw.total_amount)
                .or(raw.final_total)
                .unwrap_or_default(),
            shipping_address: raw.shipping_address.or(raw.address),
            note: raw.note,
            cancel_reason: raw.cancel_reason,
            created_at: raw.created_at,
            confirmed_at: raw.confirmed_at,
            shipped_at: raw.shipped_at,
            delivered_at: raw.delivered_at,
            cancelled_at: raw.cancelled_at,
        }
    }
}

impl Order {
    /// Sum of item prices.
    #[must_use]
    pub fn items_total(&self) -> Vnd {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }

    #[must_use]
    pub const fn can_review(&self) -> bool {
        self.status.can_review()
    }

    /// Number to show the buyer: the order number when present, else the id.
    #[must_use]
    pub fn display_number(&self) -> &str {
        self.order_number.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

/// Query for order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Body for cancelling an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CancelRequest {
    pub reason: String,
}
