//! Shipper endpoints: the pickup queue and the per-parcel status steps.

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::shipment::{FailReport, Shipment};
use marketplace_core::{ShipmentId, ShipmentStatus};
use tracing::{info, instrument};

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

/// A status step a shipper can take without extra input. Failures carry a
/// reason and go through [`ApiClient::fail_shipment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipperStep {
    Picking,
    Picked,
    Shipping,
    Delivered,
    Returning,
    Returned,
}

impl ShipperStep {
    const fn action(self) -> &'static str {
        match self {
            Self::Picking => "picking",
            Self::Picked => "picked",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Returning => "returning",
            Self::Returned => "returned",
        }
    }

    /// The status the parcel should be in afterwards.
    #[must_use]
    pub const fn resulting_status(self) -> ShipmentStatus {
        match self {
            Self::Picking => ShipmentStatus::PickingUp,
            Self::Picked => ShipmentStatus::Picked,
            Self::Shipping => ShipmentStatus::Shipping,
            Self::Delivered => ShipmentStatus::Delivered,
            Self::Returning => ShipmentStatus::Returning,
            Self::Returned => ShipmentStatus::Returned,
        }
    }

    /// Parse a CLI-style name such as `picked`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [
            Self::Picking,
            Self::Picked,
            Self::Shipping,
            Self::Delivered,
            Self::Returning,
            Self::Returned,
        ]
        .into_iter()
        .find(|s| s.action().eq_ignore_ascii_case(name.trim()))
    }
}

fn step_path(id: &ShipmentId, action: &str) -> String {
    // The backend uses the singular form for updates.
    format!("/api/v1/shipper/shipment/{}/{action}", segment(id.as_str()))
}

impl ApiClient {
    /// Parcels waiting for a shipper.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn ready_to_pickup(&self) -> Result<Vec<Shipment>, ApiError> {
        let page: Page<Shipment> = self
            .get("/api/v1/shipper/shipments/ready-to-pickup")
            .await?;
        Ok(page.content)
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(shipment_id = %id))]
    pub async fn shipper_shipment(&self, id: &ShipmentId) -> Result<Shipment, ApiError> {
        self.get(&format!("/api/v1/shipper/shipments/{}", segment(id.as_str())))
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's error for an out-of-order step.
    #[instrument(skip(self), fields(shipment_id = %id, step = step.action()))]
    pub async fn advance_shipment(&self, id: &ShipmentId, step: ShipperStep) -> Result<Shipment, ApiError> {
        let shipment: Shipment = self.put_empty(&step_path(id, step.action())).await?;
        info!(status = %shipment.status, "Shipment updated");
        Ok(shipment)
    }

    /// Report a failed delivery attempt.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` without a reason; otherwise the backend's error.
    #[instrument(skip(self), fields(shipment_id = %id))]
    pub async fn fail_shipment(&self, id: &ShipmentId, reason: &str) -> Result<Shipment, ApiError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::Validation(
                "Vui lòng nhập lý do giao thất bại".to_owned(),
            ));
        }
        let body = FailReport {
            reason: reason.to_owned(),
        };
        self.put(&step_path(id, "fail"), &body).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn shipper_history(&self, page: &PageRequest) -> Result<Page<Shipment>, ApiError> {
        self.get_query("/api/v1/shipper/history", page).await
    }
}
