//! Status enums for marketplace entities.
//!
//! The backend sends these as upper-case strings. Values this client does not
//! know about deserialize to `Unknown` so a new backend status never breaks an
//! order listing.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Defines a string-backed enum with case-insensitive parsing, optional wire
/// aliases, and an `Unknown` catch-all.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "&'static str")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
            /// A value this client does not recognise.
            Unknown,
        }

        impl $name {
            /// The canonical wire value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unknown => "UNKNOWN",
                }
            }

            /// Parse a wire value, ignoring case and surrounding whitespace.
            #[must_use]
            pub fn parse(value: &str) -> Self {
                match value.trim().to_ascii_uppercase().as_str() {
                    $($wire $(| $alias)* => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::parse(&value)
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Order lifecycle status.
    OrderStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Processing => "PROCESSING",
        Shipping => "SHIPPING",
        Shipped => "SHIPPED",
        Delivered => "DELIVERED",
        Completed => "COMPLETED",
        Returned => "RETURNED",
        Cancelled => "CANCELLED" | "CANCELED",
        Refunded => "REFUNDED",
    }
}

impl OrderStatus {
    /// Buyers may cancel until the store starts processing.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Reviews open once the parcel has arrived.
    #[must_use]
    pub const fn can_review(self) -> bool {
        matches!(self, Self::Delivered | Self::Completed)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending | Self::Unknown => "Chờ xác nhận",
            Self::Confirmed => "Đã xác nhận",
            Self::Processing => "Đang xử lý",
            Self::Shipping | Self::Shipped => "Đang giao",
            Self::Delivered => "Đã giao",
            Self::Completed => "Hoàn tất",
            Self::Returned => "Đã trả hàng / Hoàn tiền",
            Self::Cancelled => "Đã hủy",
            Self::Refunded => "Đã hoàn tiền",
        }
    }
}

wire_enum! {
    /// How the buyer pays for an order.
    PaymentMethod {
        /// Cash on delivery.
        Cod => "COD",
        Vnpay => "VNPAY",
        Momo => "MOMO",
        /// Legacy name for VNPay.
        BankTransfer => "BANK_TRANSFER",
        /// Legacy name for MoMo.
        EWallet => "E_WALLET",
        CreditCard => "CREDIT_CARD",
        ZaloPay => "ZALOPAY",
    }
}

impl PaymentMethod {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cod => "Thanh toán khi nhận hàng (COD)",
            Self::Vnpay | Self::BankTransfer => "Thanh toán qua VNPay",
            Self::Momo | Self::EWallet => "Thanh toán qua MoMo",
            Self::CreditCard => "Thẻ tín dụng/Ghi nợ",
            Self::ZaloPay => "ZaloPay",
            Self::Unknown => "Không xác định",
        }
    }

    /// Methods that redirect the buyer to a payment gateway after checkout.
    #[must_use]
    pub const fn needs_redirect(self) -> bool {
        matches!(
            self,
            Self::Vnpay | Self::Momo | Self::BankTransfer | Self::EWallet
        )
    }
}

wire_enum! {
    /// Parcel status as tracked by the shipper.
    ShipmentStatus {
        ReadyToPickup => "READY_TO_PICKUP",
        PickingUp => "PICKING_UP" | "PICKING",
        Picked => "PICKED",
        Shipping => "SHIPPING",
        Delivered => "DELIVERED",
        Failed => "FAILED",
        Returning => "RETURNING",
        Returned => "RETURNED",
    }
}

impl ShipmentStatus {
    /// Rough completion percentage for progress bars.
    #[must_use]
    pub const fn progress(self) -> u8 {
        match self {
            Self::PickingUp => 25,
            Self::Shipping => 50,
            Self::Delivered | Self::Failed => 100,
            _ => 0,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReadyToPickup => "Chờ lấy hàng",
            Self::PickingUp => "Đang lấy hàng",
            Self::Picked => "Đã lấy hàng",
            Self::Shipping => "Đang giao",
            Self::Delivered => "Đã giao",
            Self::Failed => "Giao thất bại",
            Self::Returning => "Đang hoàn hàng",
            Self::Returned => "Đã hoàn hàng",
            Self::Unknown => "Không xác định",
        }
    }
}

wire_enum! {
    /// Promotion lifecycle status.
    PromotionStatus {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
        Expired => "EXPIRED",
        UsedUp => "USED_UP",
    }
}

impl PromotionStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Đang hoạt động",
            Self::Inactive => "Tạm dừng",
            Self::Expired => "Đã hết hạn",
            Self::UsedUp => "Đã hết lượt",
            Self::Unknown => "Không xác định",
        }
    }
}

wire_enum! {
    /// Category of an in-app notification.
    NotificationKind {
        Order => "ORDER",
        Payment => "PAYMENT",
        Shipping => "SHIPPING",
        Promotion => "PROMOTION",
        System => "SYSTEM",
        Review => "REVIEW",
    }
}

wire_enum! {
    /// Account role granted by the backend.
    Role {
        Buyer => "ROLE_BUYER" | "BUYER" | "ROLE_USER" | "USER",
        Seller => "ROLE_SELLER" | "SELLER" | "ROLE_STORE" | "STORE",
        Admin => "ROLE_ADMIN" | "ADMIN",
        Shipper => "ROLE_SHIPPER" | "SHIPPER",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_rules() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(!OrderStatus::Shipping.can_cancel());
        assert!(OrderStatus::Delivered.can_review());
        assert!(OrderStatus::Completed.can_review());
        assert!(!OrderStatus::Cancelled.can_review());
    }

    #[test]
    fn test_unknown_values_do_not_fail() {
        let status: OrderStatus = serde_json::from_str("\"ON_HOLD\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
        assert_eq!(status.label(), OrderStatus::Pending.label());
    }

    #[test]
    fn test_parse_is_case_insensitive_with_aliases() {
        assert_eq!(PaymentMethod::parse("vnpay"), PaymentMethod::Vnpay);
        assert_eq!(OrderStatus::parse("canceled"), OrderStatus::Cancelled);
        assert_eq!(Role::parse("ROLE_ADMIN"), Role::Admin);
        assert_eq!(ShipmentStatus::parse(" picking "), ShipmentStatus::PickingUp);
    }

    #[test]
    fn test_serialize_canonical_wire_value() {
        let json = serde_json::to_string(&PaymentMethod::Momo).unwrap();
        assert_eq!(json, "\"MOMO\"");
    }

    #[test]
    fn test_legacy_payment_labels() {
        assert_eq!(PaymentMethod::BankTransfer.label(), PaymentMethod::Vnpay.label());
        assert_eq!(PaymentMethod::EWallet.label(), PaymentMethod::Momo.label());
        assert!(!PaymentMethod::Cod.needs_redirect());
    }

    #[test]
    fn test_shipment_progress() {
        assert_eq!(ShipmentStatus::PickingUp.progress(), 25);
        assert_eq!(ShipmentStatus::Shipping.progress(), 50);
        assert_eq!(ShipmentStatus::Failed.progress(), 100);
        assert_eq!(ShipmentStatus::Picked.progress(), 0);
    }
}
