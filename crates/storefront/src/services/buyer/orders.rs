//! Buyer orders.

use marketplace_core::checkout::{OrderRequest, created_order_ids};
use marketplace_core::order::{CancelRequest, Order, OrderQuery};
use marketplace_core::pagination::Page;
use marketplace_core::OrderId;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

fn order_path(id: &OrderId, action: &str) -> String {
    let base = format!("/api/v1/buyer/orders/{}", segment(id.as_str()));
    if action.is_empty() {
        base
    } else {
        format!("{base}/{action}")
    }
}

impl ApiClient {
    /// The buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn buyer_orders(&self, query: &OrderQuery) -> Result<Page<Order>, ApiError> {
        self.get_query("/api/v1/buyer/orders", query).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.get(&order_path(id, "")).await
    }

    /// Place an order. The backend splits it per store and answers with every
    /// created order.
    ///
    /// # Errors
    ///
    /// Returns the backend's error (stock, promotion or address problems).
    #[instrument(skip(self, request), fields(items = request.selected_items.len(), payment = ?request.payment_method))]
    pub async fn checkout_order(&self, request: &OrderRequest) -> Result<Vec<OrderId>, ApiError> {
        let data: Value = self
            .post("/api/v1/buyer/orders/checkout", request)
            .await?;
        let ids = created_order_ids(&data);
        if ids.is_empty() {
            warn!("Checkout response carried no order ids");
        } else {
            info!(orders = ids.len(), "Order placed");
        }
        Ok(ids)
    }

    /// # Errors
    ///
    /// Returns the backend's error when the order can no longer be cancelled.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId, reason: &str) -> Result<Value, ApiError> {
        let body = CancelRequest {
            reason: reason.trim().to_owned(),
        };
        self.put(&order_path(id, "cancel"), &body).await
    }

    /// Confirm receipt of a delivered order.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the order is not delivered yet.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn complete_order(&self, id: &OrderId) -> Result<Value, ApiError> {
        self.put_empty(&order_path(id, "complete")).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order_refund_status(&self, id: &OrderId) -> Result<Value, ApiError> {
        self.get(&order_path(id, "refund-status")).await
    }

    /// Pickup details for sending a returned order back.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order_return_shipment(&self, id: &OrderId) -> Result<Value, ApiError> {
        self.get(&order_path(id, "return-shipment")).await
    }
}
