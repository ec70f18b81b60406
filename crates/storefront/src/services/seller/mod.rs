//! Seller (B2C) endpoints: a store's orders, shipments and promotions.
//!
//! Order actions carry `storeId` as a query parameter; the backend checks the
//! order belongs to that store. The store's catalog, wallet, returns and
//! analytics live in the submodules.

pub mod analytics;
pub mod catalog;
pub mod returns;
pub mod wallet;

use chrono::{DateTime, Utc};
use marketplace_core::order::{CancelRequest, Order, OrderQuery};
use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::promotion::{DiscountKind, Promotion, PromotionTarget};
use marketplace_core::shipment::{Shipment, StatusUpdate};
use marketplace_core::{OrderId, OrderStatus, PromotionId, ShipmentId, ShipmentStatus, StoreId, Vnd};
use reqwest::Method;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, Request, segment};
use crate::error::ApiError;
use crate::services::catalog::Store;

/// The backend wants discount values as JSON numbers.
fn decimal_number<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    match value.to_f64() {
        Some(f) => serializer.serialize_f64(f),
        None => serializer.serialize_str(&value.to_string()),
    }
}

/// Body for creating or updating a promotion, store or platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionInput {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discount_type: DiscountKind,
    pub target: PromotionTarget,
    #[serde(serialize_with = "decimal_number")]
    pub discount_value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount_value: Option<Vnd>,
    pub min_order_value: Vnd,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_usage_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_usage_per_user: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl PromotionInput {
    /// # Errors
    ///
    /// `ApiError::Validation` for a blank code, a non-positive value, a
    /// percentage above 100, or an end date not after the start.
    pub fn validate(&self) -> Result<(), ApiError> {
        let fail = |m: &str| Err(ApiError::Validation(m.to_owned()));
        if self.code.trim().is_empty() {
            return fail("Mã khuyến mãi là bắt buộc");
        }
        if self.discount_value <= Decimal::ZERO {
            return fail("Giá trị giảm phải lớn hơn 0");
        }
        if self.discount_type == DiscountKind::Percentage && self.discount_value > Decimal::ONE_HUNDRED {
            return fail("Phần trăm giảm không được vượt quá 100");
        }
        if self.end_date <= self.start_date {
            return fail("Ngày kết thúc phải sau ngày bắt đầu");
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreScoped<'a, Q: Serialize> {
    store_id: &'a StoreId,
    #[serde(flatten)]
    rest: Q,
}

/// Shipment listing filter for a store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShipmentQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ShipmentStatus>,
}

fn b2c_order(id: &OrderId, action: &str) -> String {
    format!("/api/v1/b2c/orders/{}/{action}", segment(id.as_str()))
}

fn b2c_promotion(id: &PromotionId, action: Option<&str>) -> String {
    let base = format!("/api/v1/b2c/promotions/{}", segment(id.as_str()));
    action.map_or_else(|| base.clone(), |a| format!("{base}/{a}"))
}

impl ApiClient {
    /// Stores owned by the signed-in seller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_stores(&self) -> Result<Vec<Store>, ApiError> {
        let page: Page<Store> = self.get("/api/v1/b2c/stores/my-stores").await?;
        Ok(page.content)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_orders(&self, store: &StoreId, query: &OrderQuery) -> Result<Page<Order>, ApiError> {
        let query = StoreScoped {
            store_id: store,
            rest: query,
        };
        self.get_query("/api/v1/b2c/orders", &query).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the order is not the store's.
    #[instrument(skip(self), fields(store_id = %store, order_id = %order))]
    pub async fn store_order(&self, store: &StoreId, order: &OrderId) -> Result<Order, ApiError> {
        let path = format!("/api/v1/b2c/orders/{}", segment(order.as_str()));
        self.get_query(&path, &[("storeId", store.as_str())]).await
    }

    async fn store_order_action(&self, store: &StoreId, order: &OrderId, action: &str) -> Result<Value, ApiError> {
        let request = Request::new(Method::PUT, b2c_order(order, action))
            .query(&[("storeId", store.as_str())])?;
        self.send(request).await
    }

    /// # Errors
    ///
    /// Returns the backend's error when the order is not pending.
    #[instrument(skip(self), fields(store_id = %store, order_id = %order))]
    pub async fn confirm_store_order(&self, store: &StoreId, order: &OrderId) -> Result<Value, ApiError> {
        self.store_order_action(store, order, "confirm").await
    }

    /// # Errors
    ///
    /// Returns the backend's error when the order is not confirmed.
    #[instrument(skip(self), fields(store_id = %store, order_id = %order))]
    pub async fn ship_store_order(&self, store: &StoreId, order: &OrderId) -> Result<Value, ApiError> {
        self.store_order_action(store, order, "ship").await
    }

    /// # Errors
    ///
    /// Returns the backend's error when the order is not shipped.
    #[instrument(skip(self), fields(store_id = %store, order_id = %order))]
    pub async fn deliver_store_order(&self, store: &StoreId, order: &OrderId) -> Result<Value, ApiError> {
        self.store_order_action(store, order, "deliver").await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn cancel_store_order(&self, order: &OrderId, reason: &str) -> Result<Value, ApiError> {
        let body = CancelRequest {
            reason: reason.trim().to_owned(),
        };
        self.put(&b2c_order(order, "cancel"), &body).await
    }

    /// # Errors
    ///
    /// Returns the backend's error for a disallowed transition.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn update_store_order_status(&self, order: &OrderId, status: OrderStatus) -> Result<Value, ApiError> {
        self.put(&b2c_order(order, "status"), &serde_json::json!({ "status": status }))
            .await
    }

    // =========================================================================
    // Shipments
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the order has not been handed over.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn shipment_of_order(&self, order: &OrderId) -> Result<Shipment, ApiError> {
        self.get(&format!(
            "/api/v1/b2c/shipments/order/{}",
            segment(order.as_str())
        ))
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_shipments(&self, store: &StoreId, query: &ShipmentQuery) -> Result<Page<Shipment>, ApiError> {
        let path = format!("/api/v1/b2c/shipments/store/{}", segment(store.as_str()));
        self.get_query(&path, query).await
    }

    /// # Errors
    ///
    /// Returns the backend's error for a disallowed transition.
    #[instrument(skip(self), fields(shipment_id = %id))]
    pub async fn update_shipment_status(&self, id: &ShipmentId, status: ShipmentStatus) -> Result<Value, ApiError> {
        let path = format!("/api/v1/b2c/shipments/{}/status", segment(id.as_str()));
        self.put(&path, &StatusUpdate { status }).await
    }

    // =========================================================================
    // Promotions
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_promotion_list(&self, store: &StoreId, page: &PageRequest) -> Result<Page<Promotion>, ApiError> {
        let path = format!("/api/v1/b2c/promotions/store/{}", segment(store.as_str()));
        self.get_query(&path, page).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for an invalid promotion; otherwise the
    /// backend's error (duplicate code).
    #[instrument(skip(self, input), fields(store_id = %store, code = %input.code))]
    pub async fn create_store_promotion(&self, store: &StoreId, input: &PromotionInput) -> Result<Promotion, ApiError> {
        input.validate()?;
        let path = format!("/api/v1/b2c/promotions/store/{}", segment(store.as_str()));
        self.post(&path, input).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for an invalid promotion; otherwise the
    /// backend's error.
    #[instrument(skip(self, input), fields(promotion_id = %id))]
    pub async fn update_store_promotion(&self, id: &PromotionId, input: &PromotionInput) -> Result<Promotion, ApiError> {
        input.validate()?;
        self.put(&b2c_promotion(id, None), input).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(promotion_id = %id))]
    pub async fn activate_store_promotion(&self, id: &PromotionId) -> Result<Value, ApiError> {
        self.put_empty(&b2c_promotion(id, Some("activate"))).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(promotion_id = %id))]
    pub async fn deactivate_store_promotion(&self, id: &PromotionId) -> Result<Value, ApiError> {
        self.put_empty(&b2c_promotion(id, Some("deactivate"))).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(promotion_id = %id))]
    pub async fn delete_store_promotion(&self, id: &PromotionId) -> Result<Value, ApiError> {
        self.delete(&b2c_promotion(id, None)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    pub(crate) fn input() -> PromotionInput {
        PromotionInput {
            code: "SALE10".into(),
            name: "Giảm 10%".into(),
            description: None,
            discount_type: DiscountKind::Percentage,
            target: PromotionTarget::Order,
            discount_value: Decimal::TEN,
            max_discount_value: Some(Vnd::new(50_000)),
            min_order_value: Vnd::new(100_000),
            max_usage_count: None,
            max_usage_per_user: Some(1),
            start_date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_promotion_input_wire() {
        let json = serde_json::to_value(input()).unwrap();
        assert_eq!(json["discountType"], "PERCENTAGE");
        assert_eq!(json["target"], "ORDER");
        assert_eq!(json["discountValue"], json!(10.0));
        assert_eq!(json["minOrderValue"], 100_000);
        assert!(json.get("maxUsageCount").is_none());
    }

    #[test]
    fn test_promotion_input_checks() {
        assert!(input().validate().is_ok());
        let mut over = input();
        over.discount_value = Decimal::from(150);
        assert!(over.validate().is_err());
        let mut backwards = input();
        backwards.end_date = backwards.start_date;
        assert!(backwards.validate().is_err());
        let mut fixed = input();
        fixed.discount_type = DiscountKind::FixedAmount;
        fixed.discount_value = Decimal::from(150_000);
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn test_store_scoped_query() {
        let store = StoreId::new("s1");
        let query = OrderQuery::default().with_status(OrderStatus::Pending);
        let json = serde_json::to_value(StoreScoped {
            store_id: &store,
            rest: &query,
        })
        .unwrap();
        assert_eq!(json["storeId"], "s1");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["page"], 0);
    }

    #[test]
    fn test_paths() {
        let id = PromotionId::new("p1");
        assert_eq!(b2c_promotion(&id, None), "/api/v1/b2c/promotions/p1");
        assert_eq!(b2c_promotion(&id, Some("activate")), "/api/v1/b2c/promotions/p1/activate");
        assert_eq!(b2c_order(&OrderId::new("o1"), "ship"), "/api/v1/b2c/orders/o1/ship");
    }
}
