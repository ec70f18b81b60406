//! Promotions a buyer can use on an order of a given value.

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::promotion::Promotion;
use marketplace_core::{StoreId, Vnd};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailableQuery<'a> {
    order_value: Vnd,
    #[serde(flatten)]
    page: &'a PageRequest,
}

impl ApiClient {
    /// Platform-wide promotions for an order worth `order_value`.
    ///
    /// # Errors
    ///
    /// Returns transport and status errors. A `success: false` answer is an
    /// empty page.
    #[instrument(skip(self, page), fields(order_value = %order_value))]
    pub async fn platform_promotions(
        &self,
        order_value: Vnd,
        page: &PageRequest,
    ) -> Result<Page<Promotion>, ApiError> {
        self.available_promotions("/api/v1/buyer/promotions/platform/available", order_value, page)
            .await
    }

    /// Promotions issued by one store.
    ///
    /// # Errors
    ///
    /// Returns transport and status errors. A `success: false` answer is an
    /// empty page.
    #[instrument(skip(self, page), fields(store_id = %store, order_value = %order_value))]
    pub async fn store_promotions(
        &self,
        store: &StoreId,
        order_value: Vnd,
        page: &PageRequest,
    ) -> Result<Page<Promotion>, ApiError> {
        let path = format!(
            "/api/v1/buyer/promotions/store/{}/available",
            segment(store.as_str())
        );
        self.available_promotions(&path, order_value, page).await
    }

    async fn available_promotions(
        &self,
        path: &str,
        order_value: Vnd,
        page: &PageRequest,
    ) -> Result<Page<Promotion>, ApiError> {
        let query = AvailableQuery { order_value, page };
        match self.get_query(path, &query).await {
            Err(ApiError::Backend(message)) => {
                warn!(path = %path, message = %message, "Promotion listing refused");
                Ok(Page::empty())
            }
            other => other,
        }
    }
}
