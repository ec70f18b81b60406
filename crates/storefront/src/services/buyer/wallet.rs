//! Buyer wallet: refunds land here and can be withdrawn to a bank account.

use marketplace_core::Vnd;
use marketplace_core::pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub amount: Vnd,
    pub balance_after: Option<Vnd>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

/// Transaction listing filter.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    /// `DEPOSIT`, `PAYMENT`, `REFUND` or `WITHDRAWAL`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub amount: Vnd,
    pub bank_name: String,
    pub bank_account_number: String,
    pub bank_account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl WithdrawalRequest {
    /// # Errors
    ///
    /// `ApiError::Validation` for a non-positive amount, an amount above the
    /// balance, or missing bank details.
    pub fn validate(&self, balance: Vnd) -> Result<(), ApiError> {
        if !self.amount.is_positive() {
            return Err(ApiError::Validation("Số tiền rút phải lớn hơn 0".to_owned()));
        }
        if self.amount > balance {
            return Err(ApiError::Validation(format!(
                "Số dư không đủ. Số dư hiện tại: {balance}"
            )));
        }
        if [&self.bank_name, &self.bank_account_number, &self.bank_account_name]
            .iter()
            .any(|f| f.trim().is_empty())
        {
            return Err(ApiError::Validation(
                "Vui lòng nhập đầy đủ thông tin ngân hàng".to_owned(),
            ));
        }
        Ok(())
    }
}

/// The balance comes back as a number or inside `{balance}`.
fn balance_from(value: &Value) -> Vnd {
    let raw = value.get("balance").unwrap_or(value);
    serde_json::from_value(raw.clone()).unwrap_or_default()
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn wallet_balance(&self) -> Result<Vnd, ApiError> {
        let value: Value = self.get("/api/v1/buyer/wallet/balance").await?;
        Ok(balance_from(&value))
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn wallet_info(&self) -> Result<Value, ApiError> {
        self.get("/api/v1/buyer/wallet/info").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn wallet_transactions(&self, query: &TransactionQuery) -> Result<Page<WalletTransaction>, ApiError> {
        self.get_query("/api/v1/buyer/wallet/transactions", query)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn withdrawal_requests(&self, page: &PageRequest) -> Result<Page<Value>, ApiError> {
        self.get_query("/api/v1/buyer/wallet/withdrawal-requests", page)
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self))]
    pub async fn withdrawal_request(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&format!(
            "/api/v1/buyer/wallet/withdrawal-requests/{}",
            segment(id)
        ))
        .await
    }

    /// Check the request against the current balance, then submit it.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` when the request is invalid; otherwise the
    /// backend's error.
    #[instrument(skip(self, request), fields(amount = %request.amount))]
    pub async fn request_withdrawal(&self, request: &WithdrawalRequest) -> Result<Value, ApiError> {
        let balance = self.wallet_balance().await?;
        request.validate(balance)?;
        self.post("/api/v1/buyer/wallet/withdrawal-request", request)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(amount: i64) -> WithdrawalRequest {
        WithdrawalRequest {
            amount: Vnd::new(amount),
            bank_name: "VCB".into(),
            bank_account_number: "0011".into(),
            bank_account_name: "NGUYEN VAN A".into(),
            note: None,
        }
    }

    #[test]
    fn test_withdrawal_checks() {
        let balance = Vnd::new(100_000);
        assert!(request(50_000).validate(balance).is_ok());
        assert!(request(0).validate(balance).is_err());
        assert!(request(150_000).validate(balance).is_err());
        let mut missing = request(10_000);
        missing.bank_name = " ".into();
        assert!(missing.validate(balance).is_err());
    }

    #[test]
    fn test_balance_shapes() {
        assert_eq!(balance_from(&json!(250000)), Vnd::new(250_000));
        assert_eq!(balance_from(&json!({"balance": "1000"})), Vnd::new(1_000));
        assert_eq!(balance_from(&json!({"other": 1})), Vnd::ZERO);
    }
}
