//! Public catalog: products, variants, categories, brands, stores, and the
//! reviews and comments shown on a variant page.
//!
//! None of these need a session. Categories, brands and product or variant
//! details go through the client cache.

use marketplace_core::cart::{LineProduct, ResolvedStore, StoreRef};
use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::review::{Review, ReviewQuery, ReviewStats};
use marketplace_core::{BrandId, CategoryId, ProductId, StoreId, UserId, VariantId, Vnd};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

/// Default page size for catalog listings.
pub const CATALOG_PAGE_SIZE: u32 = 20;

/// A product (the parent of one or more variants).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    pub id: Option<ProductId>,
    pub name: String,
    pub description: Option<String>,
    #[serde(alias = "image")]
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub brand_id: Option<BrandId>,
    pub brand_name: Option<String>,
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
}

/// A purchasable variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: Option<VariantId>,
    pub product_id: Option<ProductId>,
    #[serde(alias = "variantName", alias = "productVariantName")]
    pub name: String,
    pub description: Option<String>,
    pub price: Vnd,
    pub original_price: Option<Vnd>,
    #[serde(alias = "stockQuantity")]
    pub stock: Option<u32>,
    #[serde(alias = "image")]
    pub image_url: Option<String>,
    #[serde(alias = "imageUrls")]
    pub images: Vec<String>,
    pub sold_count: Option<u64>,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
    pub store: Option<StoreRef>,
}

impl ProductVariant {
    /// First image, from either field.
    #[must_use]
    pub fn main_image(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .or_else(|| self.images.first().map(String::as_str))
    }

    /// Store details, preferring the nested `store` object.
    #[must_use]
    pub fn resolved_store(&self) -> ResolvedStore {
        let nested = self.store.as_ref();
        ResolvedStore {
            store_id: nested
                .and_then(|s| s.id.clone())
                .or_else(|| self.store_id.clone()),
            store_name: nested
                .and_then(|s| s.store_name.clone().or_else(|| s.name.clone()))
                .or_else(|| self.store_name.clone())
                .filter(|n| !n.trim().is_empty()),
        }
    }

    /// The product block of a cart line for this variant.
    #[must_use]
    pub fn to_line_product(&self) -> Option<LineProduct> {
        let id = self.id.clone()?;
        let mut product = LineProduct::new(id, self.name.clone(), self.price);
        product.image = self.main_image().map(ToOwned::to_owned);
        product.original_price = self.original_price.filter(|p| *p > self.price);
        let store = self.resolved_store();
        product.store_id = store.store_id;
        product.store_name = store.store_name;
        Some(product)
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|s| s > 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Category {
    pub id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    #[serde(alias = "image")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Brand {
    pub id: Option<BrandId>,
    pub name: String,
    pub description: Option<String>,
    #[serde(alias = "logo")]
    pub logo_url: Option<String>,
}

/// A seller's store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Store {
    pub id: Option<StoreId>,
    #[serde(alias = "name")]
    pub store_name: String,
    pub description: Option<String>,
    pub owner_id: Option<UserId>,
    #[serde(alias = "logo")]
    pub logo_url: Option<String>,
    pub province: Option<String>,
    /// Pickup address; a plain string on older records.
    pub address: Option<Value>,
    pub status: Option<String>,
    pub rating: Option<f64>,
}

impl Store {
    /// Province the store ships from.
    #[must_use]
    pub fn province(&self) -> Option<&str> {
        self.province
            .as_deref()
            .or_else(|| self.address.as_ref()?.get("province")?.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Paging for product and variant listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    /// Name filter; empty matches everything.
    pub name: String,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            name: String::new(),
            page: PageRequest::new(0, CATALOG_PAGE_SIZE),
        }
    }
}

impl CatalogQuery {
    #[must_use]
    pub fn search(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page.page = page;
        self
    }
}

impl ApiClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &CatalogQuery) -> Result<Page<Product>, ApiError> {
        self.get_query("/api/v1/products", query).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products_by_category(
        &self,
        category: &str,
        page: &PageRequest,
    ) -> Result<Page<Product>, ApiError> {
        let path = format!("/api/v1/products/category/{}", segment(category));
        self.get_query(&path, page).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products_by_category_and_brand(
        &self,
        category: &str,
        brand: &str,
        page: &PageRequest,
    ) -> Result<Page<Product>, ApiError> {
        let path = format!(
            "/api/v1/products/category/{}/brand/{}",
            segment(category),
            segment(brand)
        );
        self.get_query(&path, page).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let path = format!("/api/v1/products/{}", segment(id.as_str()));
        self.get_cached(format!("product:{id}"), &path, None::<&()>)
            .await
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn latest_variants(&self, page: &PageRequest) -> Result<Page<ProductVariant>, ApiError> {
        self.get_query("/api/v1/product-variants/latest", page)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn search_variants(&self, query: &CatalogQuery) -> Result<Page<ProductVariant>, ApiError> {
        self.get_query("/api/v1/product-variants/search", query)
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(variant_id = %id))]
    pub async fn variant(&self, id: &VariantId) -> Result<ProductVariant, ApiError> {
        let path = format!("/api/v1/product-variants/{}", segment(id.as_str()));
        self.get_cached(format!("variant:{id}"), &path, None::<&()>)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn variants_of_product(
        &self,
        id: &ProductId,
        page: &PageRequest,
    ) -> Result<Page<ProductVariant>, ApiError> {
        let path = format!("/api/v1/product-variants/product/{}", segment(id.as_str()));
        self.get_query(&path, page).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn variants_of_store(
        &self,
        id: &StoreId,
        page: &PageRequest,
    ) -> Result<Page<ProductVariant>, ApiError> {
        let path = format!("/api/v1/product-variants/store/{}", segment(id.as_str()));
        self.get_query(&path, page).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn variants_by_category(
        &self,
        category: &str,
        page: &PageRequest,
    ) -> Result<Page<ProductVariant>, ApiError> {
        let path = format!("/api/v1/product-variants/category/{}", segment(category));
        self.get_query(&path, page).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn variants_by_category_and_brand(
        &self,
        category: &str,
        brand: &str,
        page: &PageRequest,
    ) -> Result<Page<ProductVariant>, ApiError> {
        let path = format!(
            "/api/v1/product-variants/category/{}/brand/{}",
            segment(category),
            segment(brand)
        );
        self.get_query(&path, page).await
    }

    // =========================================================================
    // Categories & brands
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let page: Page<Category> = self
            .get_cached("categories".to_owned(), "/api/v1/categories/all", None::<&()>)
            .await?;
        Ok(page.content)
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category(&self, id: &CategoryId) -> Result<Category, ApiError> {
        self.get(&format!("/api/v1/categories/{}", segment(id.as_str())))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn brands(&self, page: &PageRequest) -> Result<Page<Brand>, ApiError> {
        self.get_query("/api/v1/brands", page).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn all_brands(&self) -> Result<Vec<Brand>, ApiError> {
        let page: Page<Brand> = self
            .get_cached("brands".to_owned(), "/api/v1/brands/all", None::<&()>)
            .await?;
        Ok(page.content)
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(brand_id = %id))]
    pub async fn brand(&self, id: &BrandId) -> Result<Brand, ApiError> {
        self.get(&format!("/api/v1/brands/{}", segment(id.as_str())))
            .await
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn stores(&self, page: &PageRequest) -> Result<Page<Store>, ApiError> {
        self.get_query("/api/v1/stores", page).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn store(&self, id: &StoreId) -> Result<Store, ApiError> {
        let path = format!("/api/v1/stores/{}", segment(id.as_str()));
        self.get_cached(format!("store:{id}"), &path, None::<&()>)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn stores_of_owner(&self, owner: &UserId, page: &PageRequest) -> Result<Page<Store>, ApiError> {
        let path = format!("/api/v1/stores/owner/{}", segment(owner.as_str()));
        self.get_query(&path, page).await
    }

    // =========================================================================
    // Reviews & comments
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(variant_id = %id))]
    pub async fn variant_reviews(&self, id: &VariantId, query: &ReviewQuery) -> Result<Page<Review>, ApiError> {
        let path = format!("/api/v1/reviews/product-variant/{}", segment(id.as_str()));
        self.get_query(&path, query).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(variant_id = %id))]
    pub async fn variant_review_stats(&self, id: &VariantId) -> Result<ReviewStats, ApiError> {
        self.get(&format!(
            "/api/v1/reviews/product-variant/{}/stats",
            segment(id.as_str())
        ))
        .await
    }

    /// Comments are free-form threads; returned as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(variant_id = %id))]
    pub async fn variant_comments(&self, id: &VariantId, page: &PageRequest) -> Result<Page<Value>, ApiError> {
        let path = format!("/api/v1/comments/product-variant/{}", segment(id.as_str()));
        self.get_query(&path, page).await
    }
}
