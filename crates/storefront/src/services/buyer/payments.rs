//! Payment endpoints. The backend talks to VNPay and MoMo; the client only
//! starts payments, asks for their status, and requests refunds.

use marketplace_core::payment::{
    MomoPayment, MomoPaymentRequest, MomoRefund, PaymentError, VnpayPaymentRequest, VnpayQuery,
    VnpayRefund, vnpay_payment_url,
};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

impl ApiClient {
    // =========================================================================
    // VNPay
    // =========================================================================

    /// Create a VNPay payment and return the URL to send the buyer to.
    ///
    /// # Errors
    ///
    /// `ApiError::Payment` when the backend answers without a URL.
    #[instrument(skip(self, request), fields(amount = %request.amount))]
    pub async fn create_vnpay_payment(&self, request: &VnpayPaymentRequest) -> Result<String, ApiError> {
        let data: Value = self
            .post("/api/v1/buyer/payments/create_payment_url", request)
            .await?;
        let url = vnpay_payment_url(&data).ok_or_else(|| {
            error!(response = %data, "VNPay response carried no payment URL");
            PaymentError::MissingPaymentUrl
        })?;
        info!("VNPay payment URL created");
        Ok(url)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %query.order_id))]
    pub async fn vnpay_query(&self, query: &VnpayQuery) -> Result<Value, ApiError> {
        self.post("/api/v1/buyer/payments/query", query).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %refund.order_id, amount = %refund.amount))]
    pub async fn vnpay_refund(&self, refund: &VnpayRefund) -> Result<Value, ApiError> {
        self.post("/api/v1/buyer/payments/refund", refund).await
    }

    // =========================================================================
    // MoMo
    // =========================================================================

    /// # Errors
    ///
    /// `ApiError::Payment` when MoMo reports a failure or no pay URL comes
    /// back.
    #[instrument(skip(self, request), fields(amount = %request.amount, orders = request.order_ids.len()))]
    pub async fn create_momo_payment(&self, request: &MomoPaymentRequest) -> Result<MomoPayment, ApiError> {
        let data: Value = self
            .post("/api/v1/buyer/payments/momo/create_payment_request", request)
            .await?;
        let payment = MomoPayment::from_response(&data).inspect_err(|e| {
            error!(error = %e, "MoMo payment request failed");
        })?;
        info!(momo_order_id = ?payment.order_id, "MoMo payment created");
        Ok(payment)
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for a blank id; otherwise the backend's error.
    #[instrument(skip(self))]
    pub async fn momo_payment_status(&self, momo_order_id: &str) -> Result<Value, ApiError> {
        let id = nonblank(momo_order_id)?;
        self.get(&format!(
            "/api/v1/buyer/payments/momo/check_status/{}",
            segment(id)
        ))
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, refund), fields(amount = %refund.amount))]
    pub async fn momo_refund(&self, refund: &MomoRefund) -> Result<Value, ApiError> {
        self.post("/api/v1/buyer/payments/momo/refund", refund)
            .await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for a blank id; otherwise the backend's error.
    #[instrument(skip(self))]
    pub async fn momo_refund_status(&self, refund_order_id: &str) -> Result<Value, ApiError> {
        let id = nonblank(refund_order_id)?;
        self.get(&format!(
            "/api/v1/buyer/payments/momo/refund/check_status/{}",
            segment(id)
        ))
        .await
    }
}

fn nonblank(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::Validation("Order ID là bắt buộc".to_owned()));
    }
    Ok(id)
}
