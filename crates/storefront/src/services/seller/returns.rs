//! The store's side of returns: answer a request, confirm the goods came
//! back intact, or dispute their condition.

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::{DisputeId, ReturnRequestId, StoreId};
use reqwest::Method;
use reqwest::multipart::Form;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::client::{ApiClient, FormBuilder, Request, segment};
use crate::error::ApiError;
use crate::services::auth::Upload;
use crate::services::buyer::returns::{Dispute, ReturnRequest, message_form};
use crate::services::seller::catalog::dto_form;

/// The backend has no single-dispute endpoint for stores, so lookups scan
/// one page this large.
const DISPUTE_SCAN_SIZE: u32 = 1000;

/// Return listing filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReturnQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Approve or reject a return. Rejections need a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnDecision {
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReturnDecision {
    #[must_use]
    pub const fn approve() -> Self {
        Self {
            approved: true,
            reason: None,
        }
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for a blank reason.
    pub fn reject(reason: &str) -> Result<Self, ApiError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::Validation("Vui lòng nhập lý do từ chối".to_owned()));
        }
        Ok(Self {
            approved: false,
            reason: Some(reason.to_owned()),
        })
    }
}

fn quality_form(reason: String, description: Option<String>, evidence: Vec<Upload>) -> FormBuilder {
    Box::new(move || {
        let mut form = Form::new().text("reason", reason.clone());
        if let Some(description) = &description {
            form = form.text("description", description.clone());
        }
        for file in &evidence {
            form = form.part("evidenceFiles", file.part()?);
        }
        Ok(form)
    })
}

fn store_returns(store: &StoreId) -> String {
    format!("/api/v1/b2c/returns/store/{}", segment(store.as_str()))
}

fn store_return(store: &StoreId, id: &ReturnRequestId, action: Option<&str>) -> String {
    let base = format!("{}/returnRequest/{}", store_returns(store), segment(id.as_str()));
    action.map_or_else(|| base.clone(), |a| format!("{base}/{a}"))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_return_requests(&self, store: &StoreId, query: &ReturnQuery) -> Result<Page<ReturnRequest>, ApiError> {
        self.get_query(&store_returns(store), query).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(store_id = %store, return_id = %id))]
    pub async fn store_return_request(&self, store: &StoreId, id: &ReturnRequestId) -> Result<ReturnRequest, ApiError> {
        self.get(&store_return(store, id, None)).await
    }

    /// Counts keyed by return status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_return_counts(&self, store: &StoreId) -> Result<Value, ApiError> {
        self.get(&format!("{}/count-by-status", store_returns(store)))
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's error once the request has been answered.
    #[instrument(skip(self, decision, evidence), fields(store_id = %store, return_id = %id, approved = decision.approved))]
    pub async fn respond_to_return(
        &self,
        store: &StoreId,
        id: &ReturnRequestId,
        decision: &ReturnDecision,
        evidence: Vec<Upload>,
    ) -> Result<ReturnRequest, ApiError> {
        let form = dto_form(decision, "evidenceFiles", evidence)?;
        let request = Request::new(Method::PUT, store_return(store, id, Some("respond"))).multipart(form);
        let updated = self.send(request).await?;
        info!("Return request answered");
        Ok(updated)
    }

    /// Accept the returned goods. The backend records a return warning
    /// against the store.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self), fields(store_id = %store, return_id = %id))]
    pub async fn confirm_return_received(&self, store: &StoreId, id: &ReturnRequestId) -> Result<ReturnRequest, ApiError> {
        self.put_empty(&store_return(store, id, Some("confirm-ok")))
            .await
    }

    /// Claim the goods came back damaged or swapped.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for a blank reason; otherwise the backend's
    /// error.
    #[instrument(skip(self, description, evidence), fields(store_id = %store, return_id = %id, files = evidence.len()))]
    pub async fn dispute_return_quality(
        &self,
        store: &StoreId,
        id: &ReturnRequestId,
        reason: &str,
        description: Option<&str>,
        evidence: Vec<Upload>,
    ) -> Result<Dispute, ApiError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::Validation("Vui lòng nhập lý do khiếu nại".to_owned()));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty()).map(ToOwned::to_owned);
        let form = quality_form(reason.to_owned(), description, evidence);
        let request = Request::new(Method::POST, store_return(store, id, Some("dispute-quality"))).multipart(form);
        self.send(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_disputes(&self, store: &StoreId, page: &PageRequest) -> Result<Page<Dispute>, ApiError> {
        self.get_query(&format!("{}/disputes", store_returns(store)), page)
            .await
    }

    /// # Errors
    ///
    /// `ApiError::NotFound` when the store has no such dispute.
    #[instrument(skip(self), fields(store_id = %store, dispute_id = %id))]
    pub async fn store_dispute(&self, store: &StoreId, id: &DisputeId) -> Result<Dispute, ApiError> {
        let page = self
            .store_disputes(store, &PageRequest::new(0, DISPUTE_SCAN_SIZE))
            .await?;
        page.content
            .into_iter()
            .find(|d| d.id.as_ref() == Some(id))
            .ok_or_else(|| ApiError::NotFound("Không tìm thấy khiếu nại".to_owned()))
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self, content, files), fields(store_id = %store, dispute_id = %id))]
    pub async fn post_store_dispute_message(
        &self,
        store: &StoreId,
        id: &DisputeId,
        content: &str,
        files: Vec<Upload>,
    ) -> Result<Dispute, ApiError> {
        let path = format!("{}/disputes/{}/message", store_returns(store), segment(id.as_str()));
        self.send(Request::new(Method::POST, path).multipart(message_form(content, files)))
            .await
    }
}
