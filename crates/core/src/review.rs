//! Product reviews.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pagination::PageRequest;
use crate::types::time::opt_timestamp;
use crate::types::{OrderId, ReviewId, UserId, VariantId};

/// Why a review cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("Vui lòng chọn số sao (1-5).")]
    InvalidRating,

    #[error("Thiếu productVariantId.")]
    MissingVariant,

    #[error("Thiếu orderId.")]
    MissingOrder,
}

/// A review being written for a delivered order line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDraft {
    pub product_variant_id: Option<VariantId>,
    pub order_id: Option<OrderId>,
    pub rating: u8,
    pub comment: Option<String>,
}

/// The `review` JSON part of the multipart create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
    pub product_variant_id: VariantId,
    pub order_id: OrderId,
}

/// The `review` JSON part of the multipart update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEdit {
    pub rating: u8,
    pub comment: String,
}

const fn check_rating(rating: u8) -> Result<u8, ReviewError> {
    if rating >= 1 && rating <= 5 {
        Ok(rating)
    } else {
        Err(ReviewError::InvalidRating)
    }
}

impl ReviewDraft {
    /// # Errors
    ///
    /// Rating outside 1..=5 first, then a missing variant, then a missing order.
    pub fn validate(self) -> Result<NewReview, ReviewError> {
        let rating = check_rating(self.rating)?;
        let product_variant_id = self
            .product_variant_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or(ReviewError::MissingVariant)?;
        let order_id = self
            .order_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or(ReviewError::MissingOrder)?;
        Ok(NewReview {
            rating,
            comment: self.comment.unwrap_or_default(),
            product_variant_id,
            order_id,
        })
    }
}

impl ReviewEdit {
    /// # Errors
    ///
    /// [`ReviewError::InvalidRating`] outside 1..=5.
    pub fn new(rating: u8, comment: Option<String>) -> Result<Self, ReviewError> {
        Ok(Self {
            rating: check_rating(rating)?,
            comment: comment.unwrap_or_default(),
        })
    }
}

/// A published review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawReview", rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_variant_id: Option<VariantId>,
    pub order_id: Option<OrderId>,
    pub user_id: Option<UserId>,
    pub user_name: Option<String>,
    pub rating: u8,
    pub comment: String,
    pub images: Vec<String>,
    #[serde(with = "opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct Nested<T> {
    id: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReview {
    id: Option<ReviewId>,
    product_variant_id: Option<VariantId>,
    product_variant: Option<Nested<VariantId>>,
    order_id: Option<OrderId>,
    order: Option<Nested<OrderId>>,
    user_id: Option<UserId>,
    user_name: Option<String>,
    buyer_name: Option<String>,
    full_name: Option<String>,
    #[serde(default)]
    rating: u8,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    image_urls: Option<Vec<String>>,
    #[serde(default, with = "opt_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl From<RawReview> for Review {
    fn from(raw: RawReview) -> Self {
        Self {
            id: raw.id.unwrap_or_else(|| ReviewId::new("")),
            product_variant_id: raw
                .product_variant_id
                .or_else(|| raw.product_variant.and_then(|v| v.id)),
            order_id: raw.order_id.or_else(|| raw.order.and_then(|o| o.id)),
            user_id: raw.user_id,
            user_name: raw.user_name.or(raw.buyer_name).or(raw.full_name),
            rating: raw.rating,
            comment: raw.comment.unwrap_or_default(),
            images: if raw.images.is_empty() {
                raw.image_urls.unwrap_or_default()
            } else {
                raw.images
            },
            created_at: raw.created_at,
        }
    }
}

impl Review {
    #[must_use]
    pub fn is_for(&self, variant: &VariantId, order: &OrderId) -> bool {
        self.product_variant_id.as_ref() == Some(variant) && self.order_id.as_ref() == Some(order)
    }

    /// Filled and empty stars, e.g. `★★★★☆`.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::from(self.rating.min(5));
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

/// The buyer's existing review of a variant within an order, if any.
#[must_use]
pub fn find_existing<'a>(
    reviews: &'a [Review],
    variant: &VariantId,
    order: &OrderId,
) -> Option<&'a Review> {
    reviews.iter().find(|r| r.is_for(variant, order))
}

/// Rating summary for a variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: f64,
    pub total_reviews: u64,
    pub rating_distribution: BTreeMap<String, u64>,
}

/// Query for a variant's public reviews.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_images: Option<bool>,
}
