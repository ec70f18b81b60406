//! Parcel tracking records managed by shippers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::ShippingAddress;
use crate::shipping::{DeliveryCountdown, delivery_time_remaining};
use crate::types::time::opt_timestamp;
use crate::types::{OrderId, ShipmentId, ShipmentStatus, ShipperId, StoreId, Vnd};

/// A shipment for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    #[serde(alias = "shipmentId")]
    pub id: ShipmentId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub shipper_id: Option<ShipperId>,
    #[serde(default = "unknown_status")]
    pub status: ShipmentStatus,
    #[serde(default)]
    pub tracking_code: Option<String>,
    #[serde(default)]
    pub shipping_fee: Option<Vnd>,
    #[serde(default)]
    pub cod_amount: Option<Vnd>,
    #[serde(default)]
    pub pickup_address: Option<ShippingAddress>,
    #[serde(default)]
    pub delivery_address: Option<ShippingAddress>,
    #[serde(default)]
    pub fail_reason: Option<String>,
    #[serde(default, with = "opt_timestamp")]
    pub expected_delivery_date: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

const fn unknown_status() -> ShipmentStatus {
    ShipmentStatus::Unknown
}

/// One step of the tracking timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub status: ShipmentStatus,
    pub label: &'static str,
    pub description: &'static str,
    pub completed: bool,
    pub active: bool,
}

impl Shipment {
    /// Picking up, shipping, then delivered (or failed).
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineStep> {
        let last = if self.status == ShipmentStatus::Failed {
            (ShipmentStatus::Failed, "Giao hàng không thành công")
        } else {
            (ShipmentStatus::Delivered, "Giao hàng thành công")
        };
        let steps = [
            (ShipmentStatus::PickingUp, "Shipper đang đến lấy hàng"),
            (ShipmentStatus::Shipping, "Đơn hàng đang được vận chuyển"),
            last,
        ];
        let current = steps.iter().position(|(status, _)| *status == self.status);

        steps
            .iter()
            .enumerate()
            .map(|(index, &(status, description))| TimelineStep {
                status,
                label: status.label(),
                description,
                completed: current.is_some_and(|c| index <= c),
                active: current == Some(index),
            })
            .collect()
    }

    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.status.progress()
    }

    /// Whether the parcel is still moving.
    #[must_use]
    pub const fn is_in_transit(&self) -> bool {
        matches!(
            self.status,
            ShipmentStatus::ReadyToPickup
                | ShipmentStatus::PickingUp
                | ShipmentStatus::Picked
                | ShipmentStatus::Shipping
        )
    }

    /// Time left until the expected delivery date, if one is set.
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<DeliveryCountdown> {
        self.expected_delivery_date
            .map(|expected| delivery_time_remaining(expected, now))
    }
}

/// Body for a shipper's failed-delivery report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailReport {
    pub reason: String,
}

/// Body for a store-side status override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: ShipmentStatus,
}
