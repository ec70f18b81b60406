//! Newtype IDs for type-safe entity references.
//!
//! The marketplace backend hands out opaque string identifiers (document ids,
//! not integers). The `define_id!` macro wraps them so a `StoreId` can never be
//! passed where an `OrderId` is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `short()`
/// - `From<String>`, `From<&str>` and `Display`
///
/// Numeric ids sent by older endpoints are accepted and kept as their decimal
/// text.
///
/// # Example
///
/// ```rust
/// # use marketplace_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("u-1");
/// let order_id = OrderId::new("o-1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// # let _ = (user_id, order_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The trailing six characters, used for compact display.
            #[must_use]
            pub fn short(&self) -> &str {
                let start = self
                    .0
                    .char_indices()
                    .rev()
                    .nth(5)
                    .map_or(0, |(idx, _)| idx);
                &self.0[start..]
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                match ::serde_json::Value::deserialize(deserializer)? {
                    ::serde_json::Value::String(s) => Ok(Self(s)),
                    ::serde_json::Value::Number(n) => Ok(Self(n.to_string())),
                    other => Err(<D::Error as ::serde::de::Error>::custom(format!(
                        "expected string or number id, got {other}"
                    ))),
                }
            }
        }
    };
}

define_id!(UserId);
define_id!(StoreId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(OrderId);
define_id!(CartItemId);
define_id!(AddressId);
define_id!(PromotionId);
define_id!(ReviewId);
define_id!(NotificationId);
define_id!(ShipmentId);
define_id!(ReturnRequestId);
define_id!(DisputeId);
define_id!(CategoryId);
define_id!(BrandId);
define_id!(ShipperId);
define_id!(WithdrawalId);
define_id!(RefundRequestId);
define_id!(RevenueId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_short_takes_last_six_chars() {
        let id = StoreId::new("64f0c2a9e1b7d3");
        assert_eq!(id.short(), "e1b7d3");
        assert_eq!(StoreId::new("abc").short(), "abc");
    }

    #[test]
    fn test_deserialize_accepts_numbers() {
        let id: OrderId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");

        let id: OrderId = serde_json::from_str("\"ord-9\"").unwrap();
        assert_eq!(id.as_str(), "ord-9");

        assert!(serde_json::from_str::<OrderId>("true").is_err());
    }

    #[test]
    fn test_serialize_is_transparent() {
        let id = VariantId::new("v-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"v-1\"");
    }
}
