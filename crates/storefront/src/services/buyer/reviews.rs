//! Writing, editing and listing the buyer's own reviews.
//!
//! Create and update are multipart: the review itself travels as a JSON part
//! named `review` (filename `review.json`), followed by any `images`.

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::review::{Review, ReviewDraft, ReviewEdit, find_existing};
use marketplace_core::{OrderId, ReviewId, VariantId};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, FormBuilder, Request, segment};
use crate::error::ApiError;
use crate::services::auth::Upload;

/// Page size used when scanning the buyer's reviews for an existing one.
const EXISTING_SCAN_SIZE: u32 = 100;

fn review_form<T: Serialize>(review: &T, images: Vec<Upload>) -> Result<FormBuilder, ApiError> {
    let json = serde_json::to_vec(review)?;
    Ok(Box::new(move || {
        let part = Part::bytes(json.clone())
            .file_name("review.json")
            .mime_str("application/json")?;
        let mut form = Form::new().part("review", part);
        for image in &images {
            form = form.part("images", image.part()?);
        }
        Ok(form)
    }))
}

impl ApiClient {
    /// # Errors
    ///
    /// `ApiError::Review` for a bad rating or missing ids; otherwise the
    /// backend's error (e.g. already reviewed).
    #[instrument(skip(self, draft, images), fields(rating = draft.rating, images = images.len()))]
    pub async fn create_review(&self, draft: ReviewDraft, images: Vec<Upload>) -> Result<Value, ApiError> {
        let review = draft.validate()?;
        let form = review_form(&review, images)?;
        self.send(Request::new(Method::POST, "/api/v1/buyer/reviews").multipart(form))
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self, edit, images), fields(review_id = %id))]
    pub async fn update_review(&self, id: &ReviewId, edit: &ReviewEdit, images: Vec<Upload>) -> Result<Value, ApiError> {
        let form = review_form(edit, images)?;
        let path = format!("/api/v1/buyer/reviews/{}", segment(id.as_str()));
        self.send(Request::new(Method::PUT, path).multipart(form))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn delete_review(&self, id: &ReviewId) -> Result<(), ApiError> {
        self.delete::<Value>(&format!("/api/v1/buyer/reviews/{}", segment(id.as_str())))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_reviews(&self, page: &PageRequest) -> Result<Page<Review>, ApiError> {
        self.get_query("/api/v1/buyer/reviews/my-reviews", page)
            .await
    }

    /// The buyer's review of `variant` from `order`, if they wrote one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(variant_id = %variant, order_id = %order))]
    pub async fn existing_review(&self, variant: &VariantId, order: &OrderId) -> Result<Option<Review>, ApiError> {
        let page = self
            .my_reviews(&PageRequest::new(0, EXISTING_SCAN_SIZE))
            .await?;
        Ok(find_existing(&page.content, variant, order).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_rebuilds_for_retries() {
        let edit = ReviewEdit::new(4, Some("Tốt".into())).unwrap();
        let build = review_form(&edit, vec![Upload::image("a.png", vec![1, 2, 3])]).unwrap();
        assert!(build().is_ok());
        assert!(build().is_ok());
    }

    #[test]
    fn test_bad_image_type_fails_at_build() {
        let edit = ReviewEdit::new(4, None).unwrap();
        let upload = Upload {
            file_name: "x".into(),
            content_type: "not a mime".into(),
            bytes: vec![],
        };
        let build = review_form(&edit, vec![upload]).unwrap();
        assert!(build().is_err());
    }
}
