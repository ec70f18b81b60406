//! Checkout pricing and the order request.
//!
//! The buyer pays `products − discount + shipping`, never less than zero.
//! Platform commission is settled with the seller by the backend and never
//! appears here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::address::{Address, ShippingAddress};
use crate::cart::{CartLine, StoreGroup};
use crate::order::OrderItem;
use crate::promotion::{AppliedPromotion, PromotionSlots};
use crate::shipping::{self, ShippingQuote};
use crate::types::{OrderId, PaymentMethod, StoreId, VariantId, Vnd};

/// Why an order cannot be placed yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Giỏ hàng trống. Vui lòng thêm sản phẩm.")]
    EmptyCart,

    #[error("Vui lòng chọn địa chỉ giao hàng")]
    NoAddress,

    #[error("Vui lòng chọn phương thức thanh toán")]
    NoPaymentMethod,

    #[error("Số điện thoại không được để trống. Vui lòng cập nhật địa chỉ giao hàng.")]
    NoPhone,
}

/// Shipping for one store's parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreShipping {
    pub store_id: Option<StoreId>,
    pub store_name: String,
    pub quote: ShippingQuote,
}

/// Price breakdown shown before the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
    pub product_total: Vnd,
    pub discount: Vnd,
    pub shipping_fee: Vnd,
    pub final_total: Vnd,
    pub shipping: Vec<StoreShipping>,
}

impl CheckoutQuote {
    /// Combine totals. The discount is clamped to the product total.
    #[must_use]
    pub fn new(product_total: Vnd, discount: Vnd, shipping_fee: Vnd) -> Self {
        let discount = discount.min(product_total).max(Vnd::ZERO);
        Self {
            product_total,
            discount,
            shipping_fee,
            final_total: (product_total - discount + shipping_fee).max(Vnd::ZERO),
            shipping: Vec::new(),
        }
    }

    /// Quote an order split into store parcels.
    ///
    /// Each parcel ships from its store's province (when known) to
    /// `destination` at the default per-unit weight. Unknown routes pay the
    /// flat fee.
    #[must_use]
    pub fn for_groups(
        groups: &[StoreGroup],
        store_provinces: &HashMap<StoreId, String>,
        destination: Option<&str>,
        discount: Vnd,
    ) -> Self {
        let shipping: Vec<StoreShipping> = groups
            .iter()
            .map(|group| {
                let origin = group
                    .store_id
                    .as_ref()
                    .and_then(|id| store_provinces.get(id))
                    .map(String::as_str);
                StoreShipping {
                    store_id: group.store_id.clone(),
                    store_name: group.store_name.clone(),
                    quote: shipping::estimate(
                        origin,
                        destination,
                        shipping::parcel_weight(group.units()),
                    ),
                }
            })
            .collect();

        let product_total = groups.iter().map(StoreGroup::subtotal).sum();
        let shipping_fee = shipping.iter().map(|s| s.quote.fee).sum();
        Self {
            shipping,
            ..Self::new(product_total, discount, shipping_fee)
        }
    }
}

/// One item of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedItem {
    pub product_variant_id: VariantId,
    pub quantity: u32,
    pub color_id: Option<String>,
}

impl From<&CartLine> for SelectedItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_variant_id: line.variant_id.clone(),
            quantity: line.quantity.max(1),
            color_id: line.color_id().map(ToOwned::to_owned),
        }
    }
}

/// Body of `POST /api/v1/buyer/orders/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub selected_items: Vec<SelectedItem>,
    pub payment_method: PaymentMethod,
    pub note: String,
    pub address: ShippingAddress,
    #[serde(flatten)]
    pub promotions: PromotionSlots,
}

/// Everything the buyer has chosen so far.
#[derive(Debug, Clone, Default)]
pub struct CheckoutDraft {
    pub lines: Vec<CartLine>,
    pub address: Option<Address>,
    /// Phone from the buyer's profile, used when the address has none.
    pub customer_phone: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub note: String,
    pub applied: Option<AppliedPromotion>,
    /// Set when every line belongs to one store.
    pub primary_store: Option<StoreId>,
}

impl CheckoutDraft {
    /// Validate and build the order request.
    ///
    /// # Errors
    ///
    /// Checked in order: empty cart, no address, no (or unrecognised) payment
    /// method, no phone on the address or profile.
    pub fn build_request(&self) -> Result<OrderRequest, CheckoutError> {
        if self.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address = self.address.as_ref().ok_or(CheckoutError::NoAddress)?;
        let payment_method = self
            .payment_method
            .filter(|m| *m != PaymentMethod::Unknown)
            .ok_or(CheckoutError::NoPaymentMethod)?;
        let address = ShippingAddress::from_address(address, self.customer_phone.as_deref())
            .ok_or(CheckoutError::NoPhone)?;

        Ok(OrderRequest {
            selected_items: self.lines.iter().map(SelectedItem::from).collect(),
            payment_method,
            note: self.note.trim().to_owned(),
            address,
            promotions: PromotionSlots::route(self.applied.as_ref(), self.primary_store.as_ref()),
        })
    }

    #[must_use]
    pub fn product_total(&self) -> Vnd {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn discount(&self) -> Vnd {
        self.applied.as_ref().map_or(Vnd::ZERO, |a| a.discount)
    }
}

fn order_id_of(value: &Value) -> Option<OrderId> {
    ["id", "orderId"].iter().find_map(|key| match value.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(OrderId::new(s.clone())),
        Value::Number(n) => Some(OrderId::new(n.to_string())),
        _ => None,
    })
}

/// Order ids from a checkout response.
///
/// The backend answers with one order per store, either as an array or as a
/// single object.
#[must_use]
pub fn created_order_ids(data: &Value) -> Vec<OrderId> {
    match data {
        Value::Array(orders) => orders.iter().filter_map(order_id_of).collect(),
        Value::Object(_) => order_id_of(data).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Totals of an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: Vnd,
    pub shipping_fee: Vnd,
    pub discount: Vnd,
    pub total: Vnd,
}

impl OrderSummary {
    #[must_use]
    pub fn from_items(items: &[OrderItem], shipping_fee: Vnd, discount: Vnd) -> Self {
        let subtotal = items.iter().map(OrderItem::line_total).sum();
        Self {
            subtotal,
            shipping_fee,
            discount,
            total: subtotal + shipping_fee - discount,
        }
    }
}
