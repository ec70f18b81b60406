//! Platform money: service-fee revenue, store withdrawals and buyer refunds.

use chrono::NaiveDate;
use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::{OrderId, RefundRequestId, RevenueId, Vnd, WithdrawalId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::required_reason;
use crate::client::{ApiClient, segment};
use crate::error::ApiError;
use crate::services::seller::wallet::{Withdrawal, WithdrawalQuery};

/// One service fee the platform takes from an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RevenueEntry {
    pub id: Option<RevenueId>,
    pub amount: Vnd,
    pub revenue_type: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "shopName")]
    pub store_name: Option<String>,
    pub order_id: Option<OrderId>,
    pub created_at: Option<String>,
}

/// Which revenue list to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueListing {
    All,
    Pending,
    Collected,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevenueRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
    page: u32,
    size: u32,
}

/// A buyer refund awaiting or past admin review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefundRequest {
    pub id: Option<RefundRequestId>,
    pub order_id: Option<OrderId>,
    #[serde(alias = "refundAmount")]
    pub amount: Vnd,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub refund_transaction_id: Option<String>,
    pub created_at: Option<String>,
}

/// Refund listing filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefundQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    /// `PENDING`, `COMPLETED` or `REJECTED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RefundAction {
    Approve,
    Reject,
}

/// The admin's call on a refund. Unset fields go out as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundDecision {
    pub refund_request_id: RefundRequestId,
    pub action: RefundAction,
    pub refund_transaction_id: Option<String>,
    pub admin_note: Option<String>,
    pub rejection_reason: Option<String>,
}

impl RefundDecision {
    /// # Errors
    ///
    /// `ApiError::Validation` when a rejection has no reason.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.action == RefundAction::Reject {
            required_reason(
                self.rejection_reason.as_deref().unwrap_or_default(),
                "Lý do từ chối hoàn tiền là bắt buộc",
            )?;
        }
        Ok(())
    }
}

/// The admin withdrawal list pages from 1, unlike every other list.
fn one_based(query: &WithdrawalQuery) -> WithdrawalQuery {
    let mut query = query.clone();
    query.page.page = query.page.page.saturating_add(1);
    query
}

fn withdrawal(id: &WithdrawalId, action: &str) -> String {
    format!("/api/v1/admin/withdrawals/{}/{action}", segment(id.as_str()))
}

impl ApiClient {
    // =========================================================================
    // Revenue
    // =========================================================================

    /// Totals such as collected service fees and platform discount losses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn revenue_statistics(&self) -> Result<Value, ApiError> {
        self.get("/api/v1/admin/revenues/statistics").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn platform_revenues(&self, listing: RevenueListing, page: &PageRequest) -> Result<Page<RevenueEntry>, ApiError> {
        let path = match listing {
            RevenueListing::All => "/api/v1/admin/revenues",
            RevenueListing::Pending => "/api/v1/admin/revenues/pending",
            RevenueListing::Collected => "/api/v1/admin/revenues/collected",
        };
        self.get_query(path, page).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` when `end` is before `start`; otherwise the
    /// backend's error.
    #[instrument(skip(self), fields(%start, %end))]
    pub async fn platform_revenues_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        page: &PageRequest,
    ) -> Result<Page<RevenueEntry>, ApiError> {
        if end < start {
            return Err(ApiError::Validation(
                "Ngày kết thúc phải sau ngày bắt đầu".to_owned(),
            ));
        }
        let query = RevenueRange {
            start_date: start,
            end_date: end,
            page: page.page,
            size: page.size,
        };
        self.get_query("/api/v1/admin/revenues/date-range", &query)
            .await
    }

    // =========================================================================
    // Withdrawals
    // =========================================================================

    /// `query.page` is zero-based like every other list here.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_withdrawals(&self, query: &WithdrawalQuery) -> Result<Page<Withdrawal>, ApiError> {
        self.get_query("/api/v1/admin/withdrawals", &one_based(query))
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self, note), fields(withdrawal_id = %id))]
    pub async fn approve_withdrawal(&self, id: &WithdrawalId, note: &str) -> Result<Withdrawal, ApiError> {
        let body = serde_json::json!({ "note": note.trim() });
        let approved = self.put(&withdrawal(id, "approve"), &body).await?;
        info!("Withdrawal approved");
        Ok(approved)
    }

    /// # Errors
    ///
    /// `ApiError::Validation` without a reason; otherwise the backend's error.
    #[instrument(skip(self, reason), fields(withdrawal_id = %id))]
    pub async fn reject_withdrawal(&self, id: &WithdrawalId, reason: &str) -> Result<Withdrawal, ApiError> {
        let reason = required_reason(reason, "Lý do từ chối là bắt buộc")?;
        self.put(&withdrawal(id, "reject"), &serde_json::json!({ "reason": reason }))
            .await
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_refunds(&self, query: &RefundQuery) -> Result<Page<RefundRequest>, ApiError> {
        self.get_query("/api/v1/admin/refunds", query).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(refund_id = %id))]
    pub async fn admin_refund(&self, id: &RefundRequestId) -> Result<RefundRequest, ApiError> {
        self.get(&format!("/api/v1/admin/refunds/{}", segment(id.as_str())))
            .await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for a rejection without a reason; otherwise the
    /// backend's error.
    #[instrument(skip(self, decision), fields(refund_id = %decision.refund_request_id, action = ?decision.action))]
    pub async fn process_refund(&self, decision: &RefundDecision) -> Result<RefundRequest, ApiError> {
        decision.validate()?;
        let refund = self.post("/api/v1/admin/refunds/process", decision).await?;
        info!("Refund processed");
        Ok(refund)
    }

    /// Counts keyed by refund status, plus `TOTAL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn refund_statistics(&self) -> Result<Value, ApiError> {
        self.get("/api/v1/admin/refunds/statistics").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_withdrawal_page_is_one_based() {
        let query = WithdrawalQuery {
            page: PageRequest::new(0, 20),
            status: Some("PENDING".into()),
        };
        let json = serde_json::to_value(one_based(&query)).unwrap();
        assert_eq!(json["page"], 1);
        assert_eq!(json["size"], 20);
        assert_eq!(json["status"], "PENDING");
    }

    #[test]
    fn test_refund_rejection_needs_reason() {
        let mut decision = RefundDecision {
            refund_request_id: RefundRequestId::new("rf1"),
            action: RefundAction::Reject,
            refund_transaction_id: None,
            admin_note: None,
            rejection_reason: Some("  ".into()),
        };
        assert!(decision.validate().is_err());
        decision.action = RefundAction::Approve;
        assert!(decision.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            json!({
                "refundRequestId": "rf1",
                "action": "APPROVE",
                "refundTransactionId": null,
                "adminNote": null,
                "rejectionReason": "  "
            })
        );
    }

    #[test]
    fn test_refund_amount_alias() {
        let refund: RefundRequest =
            serde_json::from_value(json!({"id": 2, "refundAmount": 150_000, "status": "PENDING"})).unwrap();
        assert_eq!(refund.amount, Vnd::new(150_000));
        assert_eq!(refund.id, Some(RefundRequestId::new("2")));
    }
}
