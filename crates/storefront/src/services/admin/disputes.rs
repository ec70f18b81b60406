//! Dispute resolution. A buyer disputes a rejected return; a store disputes
//! the condition of returned goods. Each kind has its own ruling.

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::{DisputeId, Vnd};
use serde::Serialize;
use tracing::{info, instrument};

use super::required_reason;
use crate::client::{ApiClient, segment};
use crate::error::ApiError;
use crate::services::buyer::returns::Dispute;

/// Dispute listing filter.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// `RETURN_REJECTION` or `RETURN_QUALITY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_type: Option<String>,
}

/// Ruling on a buyer's dispute over a rejected return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnRuling {
    ApproveReturn,
    RejectReturn,
}

/// Ruling on a store's quality dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityRuling {
    ApproveStore,
    RejectStore,
    PartialRefund,
}

/// What the buyer paid for the disputed item, split the way partial refunds
/// are capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemValue {
    pub product_price: Vnd,
    pub store_discount: Vnd,
    pub platform_commission: Vnd,
}

impl ItemValue {
    /// A partial refund must stay below this. Buyer-paid shipping is not
    /// counted.
    #[must_use]
    pub const fn refund_ceiling(&self) -> Vnd {
        self.product_price
            .saturating_sub(self.store_discount)
            .saturating_sub(self.platform_commission)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityResolution {
    pub decision: QualityRuling,
    pub reason: String,
    /// Required for [`QualityRuling::PartialRefund`].
    pub partial_refund_amount: Option<Vnd>,
    /// When known, the partial refund is checked against its ceiling.
    pub item: Option<ItemValue>,
    /// The store delivered faulty goods in the first place, so a win still
    /// costs it a return warning.
    pub had_return_request: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QualityBody<'a> {
    decision: QualityRuling,
    reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial_refund_amount: Option<Vnd>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    should_increment_warning: bool,
}

impl QualityResolution {
    fn body(&self) -> Result<QualityBody<'_>, ApiError> {
        let partial_refund_amount = match self.decision {
            QualityRuling::PartialRefund => Some(self.checked_partial_refund()?),
            QualityRuling::ApproveStore | QualityRuling::RejectStore => None,
        };
        Ok(QualityBody {
            decision: self.decision,
            reason: self.reason.trim(),
            partial_refund_amount,
            should_increment_warning: self.decision == QualityRuling::ApproveStore
                && self.had_return_request,
        })
    }

    fn checked_partial_refund(&self) -> Result<Vnd, ApiError> {
        let amount = self.partial_refund_amount.ok_or_else(|| {
            ApiError::Validation(
                "Số tiền hoàn một phần là bắt buộc khi chọn PARTIAL_REFUND".to_owned(),
            )
        })?;
        if !amount.is_positive() {
            return Err(ApiError::Validation(
                "Số tiền hoàn một phần phải lớn hơn 0".to_owned(),
            ));
        }
        if let Some(item) = self.item {
            let ceiling = item.refund_ceiling();
            if amount >= ceiling {
                return Err(ApiError::Validation(format!(
                    "Số tiền hoàn một phần ({amount}) phải nhỏ hơn {ceiling} \
                     (tổng tiền gốc - giảm giá shop - hoa hồng sàn). Phí ship người mua chịu."
                )));
            }
        }
        Ok(amount)
    }
}

fn admin_dispute(id: &DisputeId, action: Option<&str>) -> String {
    let base = format!("/api/v1/admin/disputes/{}", segment(id.as_str()));
    action.map_or_else(|| base.clone(), |a| format!("{base}/{a}"))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_disputes(&self, query: &DisputeQuery) -> Result<Page<Dispute>, ApiError> {
        self.get_query("/api/v1/admin/disputes", query).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(dispute_id = %id))]
    pub async fn admin_dispute(&self, id: &DisputeId) -> Result<Dispute, ApiError> {
        self.get(&admin_dispute(id, None)).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` without a reason; otherwise the backend's error.
    #[instrument(skip(self, reason), fields(dispute_id = %id, ?ruling))]
    pub async fn resolve_return_dispute(&self, id: &DisputeId, ruling: ReturnRuling, reason: &str) -> Result<Dispute, ApiError> {
        let reason = required_reason(reason, "Lý do giải quyết là bắt buộc")?;
        let body = serde_json::json!({ "decision": ruling, "reason": reason });
        let dispute = self.put(&admin_dispute(id, Some("resolve")), &body).await?;
        info!("Dispute resolved");
        Ok(dispute)
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for a missing reason or an invalid partial
    /// refund; otherwise the backend's error.
    #[instrument(skip(self, resolution), fields(dispute_id = %id, decision = ?resolution.decision))]
    pub async fn resolve_quality_dispute(&self, id: &DisputeId, resolution: &QualityResolution) -> Result<Dispute, ApiError> {
        required_reason(&resolution.reason, "Lý do giải quyết là bắt buộc")?;
        let body = resolution.body()?;
        let dispute = self
            .put(&admin_dispute(id, Some("resolve-quality")), &body)
            .await?;
        info!("Quality dispute resolved");
        Ok(dispute)
    }

    /// Admin messages are text only.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for an empty message; otherwise the backend's
    /// error.
    #[instrument(skip(self, content), fields(dispute_id = %id))]
    pub async fn post_admin_dispute_message(&self, id: &DisputeId, content: &str) -> Result<Dispute, ApiError> {
        let content = required_reason(content, "Nội dung tin nhắn là bắt buộc")?;
        self.post(
            &admin_dispute(id, Some("message")),
            &serde_json::json!({ "content": content }),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolution(decision: QualityRuling) -> QualityResolution {
        QualityResolution {
            decision,
            reason: "Hàng bị trầy".into(),
            partial_refund_amount: None,
            item: Some(ItemValue {
                product_price: Vnd::new(1_000_000),
                store_discount: Vnd::new(100_000),
                platform_commission: Vnd::new(50_000),
            }),
            had_return_request: true,
        }
    }

    #[test]
    fn test_partial_refund_is_capped() {
        let mut partial = resolution(QualityRuling::PartialRefund);
        assert!(partial.body().is_err());
        partial.partial_refund_amount = Some(Vnd::new(850_000));
        let err = partial.body().unwrap_err().to_string();
        assert!(err.starts_with("Số tiền hoàn một phần (850.000đ) phải nhỏ hơn 850.000đ"));
        partial.partial_refund_amount = Some(Vnd::new(300_000));
        let body = serde_json::to_value(partial.body().unwrap()).unwrap();
        assert_eq!(body["partialRefundAmount"], 300_000);
        assert!(body.get("shouldIncrementWarning").is_none());
    }

    #[test]
    fn test_store_win_after_return_adds_warning() {
        let body = serde_json::to_value(resolution(QualityRuling::ApproveStore).body().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"decision": "APPROVE_STORE", "reason": "Hàng bị trầy", "shouldIncrementWarning": true})
        );
        let mut clean = resolution(QualityRuling::ApproveStore);
        clean.had_return_request = false;
        let body = serde_json::to_value(clean.body().unwrap()).unwrap();
        assert!(body.get("shouldIncrementWarning").is_none());
    }

    #[test]
    fn test_dispute_query_wire() {
        let query = DisputeQuery {
            dispute_type: Some("RETURN_QUALITY".into()),
            ..DisputeQuery::default()
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["disputeType"], "RETURN_QUALITY");
        assert!(json.get("status").is_none());
    }
}
