//! Server-side cart. Every mutation answers with the refreshed cart.

use marketplace_core::cart::{Cart, CartError, CartOptions, normalize_backend_lines};
use marketplace_core::{CartItemId, VariantId};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

const CART_PATH: &str = "/api/v1/buyer/cart";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItem<'a> {
    product_variant_id: &'a VariantId,
    quantity: u32,
    #[serde(skip_serializing_if = "no_options")]
    options: &'a CartOptions,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_options(options: &&CartOptions) -> bool {
    options.is_empty()
}

#[derive(Debug, Serialize)]
struct SetQuantity {
    quantity: u32,
}

fn item_path(id: &CartItemId) -> String {
    format!("{CART_PATH}/{}", segment(id.as_str()))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        let payload: Value = self.get(CART_PATH).await?;
        Ok(Cart::new(normalize_backend_lines(&payload)))
    }

    /// # Errors
    ///
    /// `ApiError::Cart` for a zero quantity; otherwise the backend's error
    /// (usually stock).
    #[instrument(skip(self, options), fields(variant_id = %variant))]
    pub async fn add_to_cart(
        &self,
        variant: &VariantId,
        quantity: u32,
        options: &CartOptions,
    ) -> Result<Cart, ApiError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity.into());
        }
        let body = AddItem {
            product_variant_id: variant,
            quantity,
            options,
        };
        self.post::<Value, _>(CART_PATH, &body).await?;
        self.cart().await
    }

    /// # Errors
    ///
    /// `ApiError::Cart` for a zero quantity (use
    /// [`remove_cart_item`](Self::remove_cart_item)); otherwise the
    /// backend's error.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn update_cart_item(&self, id: &CartItemId, quantity: u32) -> Result<Cart, ApiError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity.into());
        }
        self.put::<Value, _>(&item_path(id), &SetQuantity { quantity })
            .await?;
        self.cart().await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn remove_cart_item(&self, id: &CartItemId) -> Result<Cart, ApiError> {
        self.delete::<Value>(&item_path(id)).await?;
        self.cart().await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.delete::<Value>(CART_PATH).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_body_omits_empty_options() {
        let variant = VariantId::new("v1");
        let empty = CartOptions::new();
        let body = serde_json::to_value(AddItem {
            product_variant_id: &variant,
            quantity: 2,
            options: &empty,
        })
        .unwrap();
        assert_eq!(body, json!({"productVariantId": "v1", "quantity": 2}));

        let color = CartOptions::from([("colorId".to_owned(), "red".to_owned())]);
        let body = serde_json::to_value(AddItem {
            product_variant_id: &variant,
            quantity: 1,
            options: &color,
        })
        .unwrap();
        assert_eq!(body["options"]["colorId"], "red");
    }

    #[test]
    fn test_item_path() {
        assert_eq!(item_path(&CartItemId::new("c/1")), "/api/v1/buyer/cart/c%2F1");
    }
}
