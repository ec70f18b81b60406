//! Store analytics. The report shapes differ between backend versions, so
//! they are returned as JSON.
//!
//! Some deployments do not serve every report and answer 404 or 500 for
//! the missing ones. Those come back as `None` rather than an error.

use chrono::NaiveDate;
use marketplace_core::StoreId;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

/// Reports that take no parameters besides the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreReport {
    Dashboard,
    Revenue,
    Orders,
    OrderStatus,
    Products,
    Customers,
    CustomerGrowth,
    Reviews,
    RatingDistribution,
    Inventory,
    SalesByCategory,
    Performance,
}

impl StoreReport {
    fn path(self, store: &StoreId) -> String {
        let (area, tail) = match self {
            Self::Dashboard => ("dashboard", ""),
            Self::Revenue => ("revenue", ""),
            Self::Orders => ("orders", ""),
            Self::OrderStatus => ("orders", "/status"),
            Self::Products => ("products", ""),
            Self::Customers => ("customers", ""),
            Self::CustomerGrowth => ("customers", "/growth"),
            Self::Reviews => ("reviews", ""),
            Self::RatingDistribution => ("reviews", "/rating-distribution"),
            Self::Inventory => ("inventory", ""),
            Self::SalesByCategory => ("sales", "/category"),
            Self::Performance => ("performance", ""),
        };
        analytics(area, store, tail)
    }
}

/// Bucket size for the sales trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl DateRange {
    fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, ApiError> {
        if end_date < start_date {
            return Err(ApiError::Validation(
                "Ngày kết thúc phải sau ngày bắt đầu".to_owned(),
            ));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }
}

fn analytics(area: &str, store: &StoreId, tail: &str) -> String {
    format!("/api/v1/b2c/analytics/{area}/{}{tail}", segment(store.as_str()))
}

/// 404 and 500 mean the report is not available here.
fn unavailable_as_none(result: Result<Value, ApiError>) -> Result<Option<Value>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if matches!(e.status(), Some(404 | 500)) => {
            debug!(error = %e, "Report not available");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason other than the
    /// report being unavailable.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_report(&self, store: &StoreId, report: StoreReport) -> Result<Option<Value>, ApiError> {
        unavailable_as_none(self.get(&report.path(store)).await)
    }

    /// # Errors
    ///
    /// `ApiError::Validation` when `end` is before `start`; otherwise the
    /// backend's error.
    #[instrument(skip(self), fields(store_id = %store, %start, %end))]
    pub async fn store_revenue_between(
        &self,
        store: &StoreId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Value>, ApiError> {
        let range = DateRange::new(start, end)?;
        let path = analytics("revenue", store, "/date-range");
        unavailable_as_none(self.get_query(&path, &range).await)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store, limit))]
    pub async fn store_top_products(&self, store: &StoreId, limit: u32) -> Result<Option<Value>, ApiError> {
        let path = analytics("products", store, "/top");
        unavailable_as_none(self.get_query(&path, &[("limit", limit)]).await)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store, limit))]
    pub async fn store_top_customers(&self, store: &StoreId, limit: u32) -> Result<Option<Value>, ApiError> {
        let path = analytics("customers", store, "/top");
        unavailable_as_none(self.get_query(&path, &[("limit", limit)]).await)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store, ?period))]
    pub async fn store_sales_trend(&self, store: &StoreId, period: TrendPeriod) -> Result<Option<Value>, ApiError> {
        let path = analytics("sales", store, "/trend");
        unavailable_as_none(self.get_query(&path, &[("period", period)]).await)
    }
}
