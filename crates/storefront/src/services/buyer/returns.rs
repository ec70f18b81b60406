//! Return requests and the disputes raised when a store rejects one.

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::{DisputeId, OrderId, ReturnRequestId, Vnd};
use reqwest::Method;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, FormBuilder, Request, segment};
use crate::error::ApiError;
use crate::services::auth::Upload;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReturnRequest {
    pub id: Option<ReturnRequestId>,
    pub order_id: Option<OrderId>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub refund_amount: Option<Vnd>,
    pub reject_reason: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dispute {
    pub id: Option<DisputeId>,
    pub return_request_id: Option<ReturnRequestId>,
    pub status: Option<String>,
    pub messages: Vec<Value>,
    pub created_at: Option<String>,
}

/// What the buyer fills in to return an order. Bank details are needed for
/// COD orders, which are refunded by transfer.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnForm {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account_number: Option<String>,
    #[serde(skip)]
    pub evidence: Vec<Upload>,
}

/// Text plus attachments, for disputes and dispute messages.
pub(crate) fn message_form(content: &str, files: Vec<Upload>) -> FormBuilder {
    let content = content.to_owned();
    Box::new(move || {
        let mut form = Form::new().text("content", content.clone());
        for file in &files {
            form = form.part("attachmentFiles", file.part()?);
        }
        Ok(form)
    })
}

pub(crate) fn files_form(field: &'static str, files: Vec<Upload>) -> FormBuilder {
    Box::new(move || {
        let mut form = Form::new();
        for file in &files {
            form = form.part(field, file.part()?);
        }
        Ok(form)
    })
}

impl ApiClient {
    /// # Errors
    ///
    /// `ApiError::Validation` without a reason; otherwise the backend's error.
    #[instrument(skip(self, form), fields(order_id = %order, files = form.evidence.len()))]
    pub async fn request_return(&self, order: &OrderId, form: ReturnForm) -> Result<ReturnRequest, ApiError> {
        if form.reason.trim().is_empty() {
            return Err(ApiError::Validation("Vui lòng chọn lý do trả hàng".to_owned()));
        }
        let path = format!("/api/v1/buyer/orders/{}/return", segment(order.as_str()));
        let request = Request::new(Method::POST, path)
            .query(&form)?
            .multipart(files_form("evidenceFiles", form.evidence));
        self.send(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn returns(&self, page: &PageRequest) -> Result<Page<ReturnRequest>, ApiError> {
        self.get_query("/api/v1/buyer/orders/returns", page).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(return_id = %id))]
    pub async fn return_request(&self, id: &ReturnRequestId) -> Result<ReturnRequest, ApiError> {
        self.get(&format!("/api/v1/buyer/orders/returns/{}", segment(id.as_str())))
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's error once the store has acted on the request.
    #[instrument(skip(self), fields(return_id = %id))]
    pub async fn cancel_return(&self, id: &ReturnRequestId) -> Result<Value, ApiError> {
        self.put_empty(&format!(
            "/api/v1/buyer/orders/returns/{}/cancel",
            segment(id.as_str())
        ))
        .await
    }

    /// Escalate a rejected return.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self, content, files), fields(return_id = %id))]
    pub async fn open_dispute(&self, id: &ReturnRequestId, content: &str, files: Vec<Upload>) -> Result<Dispute, ApiError> {
        let path = format!("/api/v1/buyer/orders/returns/{}/dispute", segment(id.as_str()));
        self.send(Request::new(Method::POST, path).multipart(message_form(content, files)))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn disputes(&self, page: &PageRequest) -> Result<Page<Dispute>, ApiError> {
        self.get_query("/api/v1/buyer/orders/disputes", page).await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self, content, files), fields(dispute_id = %id))]
    pub async fn post_dispute_message(&self, id: &DisputeId, content: &str, files: Vec<Upload>) -> Result<Dispute, ApiError> {
        let path = format!("/api/v1/buyer/orders/disputes/{}/message", segment(id.as_str()));
        self.send(Request::new(Method::POST, path).multipart(message_form(content, files)))
            .await
    }
}
