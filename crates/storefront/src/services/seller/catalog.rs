//! A store's own catalog: products, their variants, and each variant's
//! colors and images.
//!
//! Variant writes that carry files are multipart. The variant itself travels
//! as a JSON part named `dto`; images follow as `images` (or `image` for a
//! single color swatch).

use std::collections::BTreeMap;

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::{ProductId, StoreId, VariantId, Vnd};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::client::{ApiClient, FormBuilder, Request, segment};
use crate::error::ApiError;
use crate::services::auth::Upload;
use crate::services::catalog::{Product, ProductVariant};

/// Parent product. Variants carry the price and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub category: String,
    pub store_id: StoreId,
}

impl ProductInput {
    /// # Errors
    ///
    /// `ApiError::Validation` for a blank name or category.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Tên sản phẩm là bắt buộc".to_owned()));
        }
        if self.category.trim().is_empty() {
            return Err(ApiError::Validation("Vui lòng chọn danh mục".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    pub product_id: ProductId,
    pub name: String,
    pub price: Vnd,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form specs such as `size`, `ram` or `storage`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl VariantInput {
    /// # Errors
    ///
    /// `ApiError::Validation` for a blank name or a non-positive price.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Tên biến thể là bắt buộc".to_owned()));
        }
        check_price(self.price)
    }
}

/// One color of a variant, with its own price and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorOption {
    pub color_name: String,
    pub price: Vnd,
    pub stock: u32,
}

impl ColorOption {
    /// # Errors
    ///
    /// `ApiError::Validation` unless the name is set and price and stock are
    /// both positive.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.color_name.trim().is_empty() {
            return Err(ApiError::Validation("Tên màu là bắt buộc".to_owned()));
        }
        check_price(self.price)?;
        if self.stock == 0 {
            return Err(ApiError::Validation("Tồn kho phải lớn hơn 0".to_owned()));
        }
        Ok(())
    }
}

fn check_price(price: Vnd) -> Result<(), ApiError> {
    if price.is_positive() {
        Ok(())
    } else {
        Err(ApiError::Validation("Giá phải lớn hơn 0".to_owned()))
    }
}

/// A `dto` JSON part followed by files under `field`.
pub(crate) fn dto_form<T: Serialize>(
    dto: &T,
    field: &'static str,
    files: Vec<Upload>,
) -> Result<FormBuilder, ApiError> {
    let json = serde_json::to_vec(dto)?;
    Ok(Box::new(move || {
        let part = Part::bytes(json.clone())
            .file_name("dto.json")
            .mime_str("application/json")?;
        let mut form = Form::new().part("dto", part);
        for file in &files {
            form = form.part(field, file.part()?);
        }
        Ok(form)
    }))
}

fn variant_path(action: &str, id: &VariantId) -> String {
    format!("/api/v1/b2c/product-variants/{action}/{}", segment(id.as_str()))
}

fn variant_root(id: &VariantId) -> String {
    format!("/api/v1/b2c/product-variants/{}", segment(id.as_str()))
}

impl ApiClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// Every product of the store, including hidden ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_products(&self, store: &StoreId, page: &PageRequest) -> Result<Page<Product>, ApiError> {
        let path = format!("/api/v1/b2c/products/{}", segment(store.as_str()));
        self.get_query(&path, page).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for missing fields; otherwise the backend's
    /// error.
    #[instrument(skip(self, input), fields(store_id = %input.store_id))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        input.validate()?;
        let product = self.post("/api/v1/b2c/products/create", input).await?;
        info!(name = %input.name, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for missing fields; otherwise the backend's
    /// error.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(&self, id: &ProductId, input: &ProductInput) -> Result<Product, ApiError> {
        input.validate()?;
        let path = format!("/api/v1/b2c/products/update/{}", segment(id.as_str()));
        self.put(&path, input).await
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_variants(&self, store: &StoreId, page: &PageRequest) -> Result<Page<ProductVariant>, ApiError> {
        let path = format!("/api/v1/b2c/product-variants/{}", segment(store.as_str()));
        self.get_query(&path, page).await
    }

    /// Without images this is a plain JSON post; with images it is multipart.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for a blank name or bad price; otherwise the
    /// backend's error.
    #[instrument(skip(self, input, images), fields(product_id = %input.product_id, images = images.len()))]
    pub async fn create_variant(&self, input: &VariantInput, images: Vec<Upload>) -> Result<ProductVariant, ApiError> {
        input.validate()?;
        if images.is_empty() {
            return self
                .post("/api/v1/b2c/product-variants/create-without-image", input)
                .await;
        }
        let form = dto_form(input, "images", images)?;
        self.send(Request::new(Method::POST, "/api/v1/b2c/product-variants/create").multipart(form))
            .await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for a blank name or bad price; otherwise the
    /// backend's error.
    #[instrument(skip(self, input, images), fields(variant_id = %id, images = images.len()))]
    pub async fn update_variant(
        &self,
        id: &VariantId,
        input: &VariantInput,
        images: Vec<Upload>,
    ) -> Result<ProductVariant, ApiError> {
        input.validate()?;
        let form = dto_form(input, "images", images)?;
        self.send(Request::new(Method::PUT, variant_root(id)).multipart(form))
            .await
    }

    /// The new price is the bare JSON body.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for a non-positive price; otherwise the
    /// backend's error.
    #[instrument(skip(self), fields(variant_id = %id, price = %price))]
    pub async fn update_variant_price(&self, id: &VariantId, price: Vnd) -> Result<Value, ApiError> {
        check_price(price)?;
        self.put(&variant_path("update-price", id), &price).await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self), fields(variant_id = %id, stock))]
    pub async fn update_variant_stock(&self, id: &VariantId, stock: u32) -> Result<Value, ApiError> {
        self.put(&variant_path("update-stock", id), &stock).await
    }

    /// Variants are soft-deleted by setting their status.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self), fields(variant_id = %id))]
    pub async fn delete_variant(&self, id: &VariantId) -> Result<Value, ApiError> {
        let value = self
            .put(&variant_root(id), &serde_json::json!({ "status": "DELETED" }))
            .await?;
        info!("Variant deleted");
        Ok(value)
    }

    // =========================================================================
    // Colors & images
    // =========================================================================

    /// Every color needs its own swatch image.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for an incomplete color; otherwise the backend's
    /// error.
    #[instrument(skip(self, color, image), fields(variant_id = %id, color = %color.color_name))]
    pub async fn add_variant_color(&self, id: &VariantId, color: &ColorOption, image: Upload) -> Result<Value, ApiError> {
        color.validate()?;
        let form = dto_form(color, "image", vec![image])?;
        self.send(Request::new(Method::POST, variant_path("add-colors", id)).multipart(form))
            .await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for an incomplete color; otherwise the backend's
    /// error.
    #[instrument(skip(self, color), fields(variant_id = %id, color_id))]
    pub async fn update_variant_color(&self, id: &VariantId, color_id: &str, color: &ColorOption) -> Result<Value, ApiError> {
        color.validate()?;
        let path = format!("{}/color/{}", variant_path("update-colors", id), segment(color_id));
        self.put(&path, color).await
    }

    /// Replace the gallery. `primary` indexes into `images`.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for an empty gallery or an out-of-range
    /// primary; otherwise the backend's error.
    #[instrument(skip(self, images), fields(variant_id = %id, images = images.len(), primary))]
    pub async fn update_variant_images(&self, id: &VariantId, images: Vec<Upload>, primary: usize) -> Result<Value, ApiError> {
        if images.is_empty() {
            return Err(ApiError::Validation("Vui lòng chọn ít nhất một ảnh".to_owned()));
        }
        if primary >= images.len() {
            return Err(ApiError::Validation("Ảnh chính không hợp lệ".to_owned()));
        }
        let form: FormBuilder = Box::new(move || {
            let mut form = Form::new();
            for image in &images {
                form = form.part("images", image.part()?);
            }
            Ok(form)
        });
        let request = Request::new(Method::PUT, variant_path("update-images", id))
            .query(&[("indexPrimary", primary)])?
            .multipart(form);
        self.send(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variant() -> VariantInput {
        VariantInput {
            product_id: ProductId::new("p1"),
            name: "128GB Đen".into(),
            price: Vnd::new(12_990_000),
            stock: None,
            description: None,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_variant_wire_skips_empty_fields() {
        let mut input = variant();
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"productId": "p1", "name": "128GB Đen", "price": 12_990_000})
        );
        input.attributes.insert("storage".into(), "128GB".into());
        input.stock = Some(5);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["attributes"]["storage"], "128GB");
        assert_eq!(json["stock"], 5);
    }

    #[test]
    fn test_variant_checks() {
        assert!(variant().validate().is_ok());
        let mut free = variant();
        free.price = Vnd::ZERO;
        assert!(free.validate().is_err());
        let mut nameless = variant();
        nameless.name = "  ".into();
        assert!(nameless.validate().is_err());
    }

    #[test]
    fn test_color_needs_stock() {
        let color = ColorOption {
            color_name: "Xanh".into(),
            price: Vnd::new(100_000),
            stock: 0,
        };
        let err = color.validate().unwrap_err();
        assert_eq!(err.to_string(), "Tồn kho phải lớn hơn 0");
        assert_eq!(
            serde_json::to_value(ColorOption { stock: 2, ..color }).unwrap(),
            json!({"colorName": "Xanh", "price": 100_000, "stock": 2})
        );
    }

    #[test]
    fn test_product_checks() {
        let product = ProductInput {
            name: "iPhone 15".into(),
            description: None,
            brand: Some("Apple".into()),
            category: String::new(),
            store_id: StoreId::new("3"),
        };
        assert!(product.validate().is_err());
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["storeId"], "3");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_variant_paths() {
        let id = VariantId::new("v9");
        assert_eq!(variant_path("update-price", &id), "/api/v1/b2c/product-variants/update-price/v9");
        assert_eq!(variant_root(&id), "/api/v1/b2c/product-variants/v9");
        assert!(dto_form(&variant(), "images", vec![Upload::image("a.png", vec![0])]).unwrap()().is_ok());
    }
}
