//! Saved delivery addresses.

use marketplace_core::AddressId;
use marketplace_core::address::{Address, AddressPayload};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

/// Addresses from any of the list shapes the backend uses: an array, a single
/// object, or either of those under `address`.
fn addresses_from(value: Value) -> Vec<Address> {
    let value = match value {
        Value::Object(mut map) if map.contains_key("address") => {
            map.remove("address").unwrap_or(Value::Null)
        }
        other => other,
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Address>(item) {
            Ok(address) if address.id.is_none() && address.home_address.is_empty() => None,
            Ok(address) => Some(address),
            Err(e) => {
                warn!(error = %e, "Skipping malformed address");
                None
            }
        })
        .collect()
}

impl ApiClient {
    /// Whether the buyer has saved any address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn check_address(&self) -> Result<Value, ApiError> {
        self.get("/api/v1/buyer/address/check").await
    }

    /// Saved addresses. A buyer without any gets an empty list, even though
    /// the backend answers 400 or 404 for them.
    ///
    /// # Errors
    ///
    /// Returns any other request failure.
    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        match self.get::<Value>("/api/v1/buyer/address").await {
            Ok(value) => Ok(addresses_from(value)),
            Err(e) if matches!(e.status(), Some(400 | 404)) => {
                debug!(status = ?e.status(), "No saved addresses");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// # Errors
    ///
    /// `ApiError::Address` when the address is incomplete; otherwise the
    /// backend's error.
    #[instrument(skip(self, address))]
    pub async fn create_address(&self, address: &Address) -> Result<Value, ApiError> {
        address.validate()?;
        self.post("/api/v1/buyer/address", &AddressPayload::from(address))
            .await
    }

    /// # Errors
    ///
    /// `ApiError::Address` when the address is incomplete; otherwise the
    /// backend's error.
    #[instrument(skip(self, address), fields(address_id = %id))]
    pub async fn update_address(&self, id: &AddressId, address: &Address) -> Result<Value, ApiError> {
        address.validate()?;
        let path = format!("/api/v1/buyer/address/{}", segment(id.as_str()));
        self.put(&path, &AddressPayload::from(address)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_address(&self, id: &AddressId) -> Result<Value, ApiError> {
        self.delete(&format!("/api/v1/buyer/address/{}", segment(id.as_str())))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({"id": "a1", "province": "Hà Nội", "ward": "Ba Đình", "homeAddress": "1 Kim Mã",
               "suggestedName": "Nhà", "phone": "0901234567", "isDefault": true})
    }

    #[test]
    fn test_list_shapes() {
        assert_eq!(addresses_from(json!([sample(), sample()])).len(), 2);
        assert_eq!(addresses_from(sample()).len(), 1);
        assert_eq!(addresses_from(json!({"address": [sample()]})).len(), 1);
        assert_eq!(addresses_from(json!({"address": sample()})).len(), 1);
        assert!(addresses_from(Value::Null).is_empty());
        assert!(addresses_from(json!({"address": null})).is_empty());
        assert!(addresses_from(json!({"success": true, "message": "ok"})).is_empty());
    }

    #[test]
    fn test_list_keeps_fields() {
        let list = addresses_from(json!([sample()]));
        assert_eq!(list[0].id, Some(AddressId::new("a1")));
        assert!(list[0].is_default);
    }
}
