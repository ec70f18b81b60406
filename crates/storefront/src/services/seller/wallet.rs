//! Store wallet: earnings from delivered orders, and withdrawals that an
//! admin approves.

use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::{StoreId, Vnd, WithdrawalId};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::client::{ApiClient, segment};
use crate::error::ApiError;
use crate::services::buyer::wallet::{TransactionQuery, WalletTransaction};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreWallet {
    pub balance: Vnd,
    pub total_earned: Option<Vnd>,
    pub total_withdrawn: Option<Vnd>,
}

/// A withdrawal as stores and admins see it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: Option<WithdrawalId>,
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
    pub amount: Vnd,
    pub status: Option<String>,
    pub bank_name: Option<String>,
    #[serde(alias = "bankAccountNumber")]
    pub bank_account: Option<String>,
    #[serde(alias = "bankAccountName")]
    pub account_holder: Option<String>,
    pub note: Option<String>,
    #[serde(alias = "rejectionReason")]
    pub reject_reason: Option<String>,
    pub created_at: Option<String>,
}

/// Withdrawal listing filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WithdrawalQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    /// `PENDING`, `APPROVED` or `REJECTED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreWithdrawal {
    pub amount: Vnd,
    pub bank_name: String,
    pub bank_account: String,
    pub account_holder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StoreWithdrawal {
    /// # Errors
    ///
    /// `ApiError::Validation` for a non-positive amount, an amount above the
    /// available balance, or missing bank details.
    pub fn validate(&self, balance: Vnd) -> Result<(), ApiError> {
        if !self.amount.is_positive() {
            return Err(ApiError::Validation("Vui lòng nhập số tiền hợp lệ".to_owned()));
        }
        if self.amount > balance {
            return Err(ApiError::Validation(
                "Số tiền rút vượt quá số dư khả dụng".to_owned(),
            ));
        }
        if [&self.bank_name, &self.bank_account, &self.account_holder]
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

fn store_wallet(store: &StoreId) -> String {
    format!("/api/v1/b2c/wallet/store/{}", segment(store.as_str()))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_wallet(&self, store: &StoreId) -> Result<StoreWallet, ApiError> {
        self.get(&store_wallet(store)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_wallet_transactions(
        &self,
        store: &StoreId,
        query: &TransactionQuery,
    ) -> Result<Page<WalletTransaction>, ApiError> {
        self.get_query(&format!("{}/transactions", store_wallet(store)), query)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn store_withdrawals(&self, store: &StoreId, query: &WithdrawalQuery) -> Result<Page<Withdrawal>, ApiError> {
        self.get_query(&format!("{}/withdrawals", store_wallet(store)), query)
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(store_id = %store, withdrawal_id = %id))]
    pub async fn store_withdrawal(&self, store: &StoreId, id: &WithdrawalId) -> Result<Withdrawal, ApiError> {
        self.get(&format!("{}/withdrawal/{}", store_wallet(store), segment(id.as_str())))
            .await
    }

    /// Check the request against the wallet balance, then submit it.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` when the request is invalid; otherwise the
    /// backend's error.
    #[instrument(skip(self, request), fields(store_id = %store, amount = %request.amount))]
    pub async fn request_store_withdrawal(&self, store: &StoreId, request: &StoreWithdrawal) -> Result<Withdrawal, ApiError> {
        let wallet = self.store_wallet(store).await?;
        request.validate(wallet.balance)?;
        let withdrawal = self
            .post(&format!("{}/withdrawal", store_wallet(store)), request)
            .await?;
        info!("Withdrawal requested");
        Ok(withdrawal)
    }
}
