//! Payment gateway requests and callbacks.
//!
//! The storefront never talks to VNPay or MoMo directly. The backend creates
//! the gateway session and hands back a redirect URL; after payment VNPay
//! sends the buyer back with the transaction result in the query string.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{OrderId, PaymentMethod, Vnd};

/// Smallest MoMo refund.
pub const MOMO_REFUND_MIN: Vnd = Vnd::new(1_000);
/// Largest MoMo refund.
pub const MOMO_REFUND_MAX: Vnd = Vnd::new(50_000_000);

/// Payment request and response problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Backend không trả về payment URL")]
    MissingPaymentUrl,

    #[error("{message}")]
    Momo { result_code: i64, message: String },

    #[error("transId và amount là bắt buộc")]
    MissingRefundFields,

    #[error("Số tiền hoàn phải từ 1.000đ đến 50.000.000đ")]
    RefundOutOfRange(Vnd),

    #[error("Số tiền thanh toán phải lớn hơn 0")]
    NonPositiveAmount,
}

/// Body for `POST /api/v1/buyer/payments/create_payment_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VnpayPaymentRequest {
    pub amount: Vnd,
    pub order_info: String,
    pub bank_code: String,
    pub language: String,
}

impl VnpayPaymentRequest {
    /// # Errors
    ///
    /// [`PaymentError::NonPositiveAmount`] for zero or negative amounts.
    pub fn new(amount: Vnd, order_info: impl Into<String>) -> Result<Self, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::NonPositiveAmount);
        }
        Ok(Self {
            amount,
            order_info: order_info.into(),
            bank_code: String::new(),
            language: "vn".to_owned(),
        })
    }

    #[must_use]
    pub fn with_bank(mut self, bank_code: impl Into<String>) -> Self {
        self.bank_code = bank_code.into();
        self
    }
}

/// Pull a payment URL out of the shapes the VNPay endpoint returns: a bare
/// string, `{paymentUrl}`, `{data: {paymentUrl}}` or `{data: "<url>"}`.
#[must_use]
pub fn vnpay_payment_url(data: &Value) -> Option<String> {
    let url = match data {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => obj
            .get("paymentUrl")
            .and_then(Value::as_str)
            .or_else(|| match obj.get("data") {
                Some(Value::String(s)) => Some(s.as_str()),
                Some(inner) => inner.get("paymentUrl").and_then(Value::as_str),
                None => None,
            }),
        _ => None,
    };
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(ToOwned::to_owned)
}

/// The result VNPay appends to the return URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VnpayCallback {
    pub response_code: Option<String>,
    pub txn_ref: Option<String>,
    /// Paid amount (VNPay sends hundredths of a đồng).
    pub amount: Vnd,
    pub transaction_no: Option<String>,
    /// `yyyyMMddHHmmss`.
    pub transaction_date: Option<String>,
    pub bank_code: Option<String>,
    pub order_info: Option<String>,
}

impl VnpayCallback {
    /// Parse from a query string, with or without the leading `?`, or from a
    /// full return URL.
    #[must_use]
    pub fn from_query(input: &str) -> Self {
        let query = match url::Url::parse(input) {
            Ok(parsed) => parsed.query().unwrap_or_default().to_owned(),
            Err(_) => input.trim_start_matches('?').to_owned(),
        };

        let mut callback = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "vnp_ResponseCode" => callback.response_code = Some(value),
                "vnp_TxnRef" => callback.txn_ref = Some(value),
                "vnp_Amount" => {
                    callback.amount = Vnd::new(value.trim().parse::<i64>().unwrap_or(0) / 100);
                }
                "vnp_TransactionNo" => callback.transaction_no = Some(value),
                "vnp_TransactionDate" => callback.transaction_date = Some(value),
                "vnp_BankCode" => callback.bank_code = Some(value),
                "vnp_OrderInfo" => callback.order_info = Some(value),
                _ => {}
            }
        }
        callback
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_code.as_deref() == Some("00")
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        vnpay_message(self.response_code.as_deref().unwrap_or_default())
    }

    /// Body for re-checking this transaction with the backend.
    #[must_use]
    pub fn query_request(&self) -> VnpayQuery {
        VnpayQuery {
            order_id: self.txn_ref.clone().unwrap_or_default(),
            trans_date: self.transaction_date.clone().unwrap_or_default(),
            ip_address: String::new(),
        }
    }
}

/// Body for `POST /api/v1/buyer/payments/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnpayQuery {
    pub order_id: String,
    pub trans_date: String,
    pub ip_address: String,
}

/// Body for `POST /api/v1/buyer/payments/refund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnpayRefund {
    /// `02` full refund, `03` partial.
    pub transaction_type: String,
    pub order_id: String,
    pub amount: Vnd,
    pub transaction_date: String,
    pub reason: String,
    pub created_by: String,
    pub ip_address: String,
}

/// VNPay response code description.
#[must_use]
pub fn vnpay_message(code: &str) -> &'static str {
    match code {
        "00" => "Giao dịch thành công",
        "07" => "Trừ tiền thành công. Giao dịch bị nghi ngờ (liên quan tới lừa đảo, giao dịch bất thường).",
        "09" => "Giao dịch không thành công do: Thẻ/Tài khoản của khách hàng chưa đăng ký dịch vụ InternetBanking tại ngân hàng.",
        "10" => "Giao dịch không thành công do: Khách hàng xác thực thông tin thẻ/tài khoản không đúng quá 3 lần",
        "11" => "Giao dịch không thành công do: Đã hết hạn chờ thanh toán. Xin quý khách vui lòng thực hiện lại giao dịch.",
        "12" => "Giao dịch không thành công do: Thẻ/Tài khoản của khách hàng bị khóa.",
        "13" => "Giao dịch không thành công do Quý khách nhập sai mật khẩu xác thực giao dịch (OTP). Xin quý khách vui lòng thực hiện lại giao dịch.",
        "24" => "Giao dịch không thành công do: Khách hàng hủy giao dịch",
        "51" => "Giao dịch không thành công do: Tài khoản của quý khách không đủ số dư để thực hiện giao dịch.",
        "65" => "Giao dịch không thành công do: Tài khoản của Quý khách đã vượt quá hạn mức giao dịch trong ngày.",
        "75" => "Ngân hàng thanh toán đang bảo trì.",
        "79" => "Giao dịch không thành công do: KH nhập sai mật khẩu thanh toán quá số lần quy định. Xin quý khách vui lòng thực hiện lại giao dịch",
        "99" => "Các lỗi khác (lỗi còn lại, không có trong danh sách mã lỗi đã liệt kê)",
        _ => "Lỗi không xác định",
    }
}

/// A bank selectable on the VNPay page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BankCode {
    pub code: &'static str,
    pub name: &'static str,
}

/// Banks offered at checkout. The empty code lets the buyer choose on VNPay.
pub const VNPAY_BANK_CODES: &[BankCode] = &[
    BankCode { code: "", name: "Cổng thanh toán VNPay (Tất cả phương thức)" },
    BankCode { code: "VNPAYQR", name: "Thanh toán qua ứng dụng hỗ trợ VNPAYQR" },
    BankCode { code: "VNBANK", name: "Thanh toán qua ATM-Tài khoản ngân hàng nội địa" },
    BankCode { code: "INTCARD", name: "Thanh toán qua thẻ quốc tế" },
    BankCode { code: "NCB", name: "Ngân hàng NCB" },
    BankCode { code: "VIETCOMBANK", name: "Ngân hàng Vietcombank" },
    BankCode { code: "VIETINBANK", name: "Ngân hàng Vietinbank" },
    BankCode { code: "BIDV", name: "Ngân hàng BIDV" },
    BankCode { code: "AGRIBANK", name: "Ngân hàng Agribank" },
    BankCode { code: "TECHCOMBANK", name: "Ngân hàng Techcombank" },
    BankCode { code: "MB", name: "Ngân hàng MB" },
    BankCode { code: "ACB", name: "Ngân hàng ACB" },
    BankCode { code: "SACOMBANK", name: "Ngân hàng Sacombank" },
    BankCode { code: "TPBANK", name: "Ngân hàng TPBank" },
    BankCode { code: "VPBank", name: "Ngân hàng VPBank" },
];

/// Body for `POST /api/v1/buyer/payments/momo/create_payment_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomoPaymentRequest {
    pub amount: Vnd,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_ids: Vec<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_info: Option<String>,
}

impl MomoPaymentRequest {
    /// Pay for one or more orders created by a single checkout.
    ///
    /// # Errors
    ///
    /// [`PaymentError::NonPositiveAmount`] for zero or negative amounts.
    pub fn new(amount: Vnd, order_ids: Vec<OrderId>) -> Result<Self, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::NonPositiveAmount);
        }
        let order_id = order_ids.first().cloned();
        let order_info = order_id
            .as_ref()
            .map(|id| format!("Thanh toán đơn hàng {id}"));
        Ok(Self {
            amount,
            order_id,
            order_ids,
            order_info,
        })
    }

    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.order_info = Some(info.into());
        self
    }
}

/// A MoMo payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomoPayment {
    pub pay_url: String,
    pub order_id: Option<String>,
    pub trans_id: Option<String>,
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl MomoPayment {
    /// Read the create-payment response.
    ///
    /// # Errors
    ///
    /// [`PaymentError::Momo`] when MoMo reports a non-zero `resultCode`,
    /// [`PaymentError::MissingPaymentUrl`] when no URL is present.
    pub fn from_response(body: &Value) -> Result<Self, PaymentError> {
        if let Some(code) = body.get("resultCode").and_then(Value::as_i64).filter(|&c| c != 0) {
            let message = text(body.get("message"))
                .unwrap_or_else(|| format!("MoMo API error: resultCode {code}"));
            return Err(PaymentError::Momo {
                result_code: code,
                message,
            });
        }

        let source = if body.get("payUrl").is_some() {
            body
        } else {
            body.get("data").unwrap_or(body)
        };
        let pay_url = text(source.get("payUrl"))
            .or_else(|| text(source.get("paymentUrl")))
            .ok_or(PaymentError::MissingPaymentUrl)?;

        Ok(Self {
            pay_url,
            order_id: text(source.get("orderId")),
            trans_id: text(source.get("transId")),
        })
    }
}

/// Body for `POST /api/v1/buyer/payments/momo/refund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomoRefund {
    pub trans_id: String,
    pub amount: Vnd,
    pub description: String,
}

impl MomoRefund {
    /// # Errors
    ///
    /// [`PaymentError::MissingRefundFields`] for a blank transaction id or a
    /// zero amount, [`PaymentError::RefundOutOfRange`] outside
    /// 1 000đ..=50 000 000đ.
    pub fn new(
        trans_id: impl Into<String>,
        amount: Vnd,
        description: Option<String>,
    ) -> Result<Self, PaymentError> {
        let trans_id = trans_id.into();
        if trans_id.trim().is_empty() || amount.is_zero() {
            return Err(PaymentError::MissingRefundFields);
        }
        if !(MOMO_REFUND_MIN..=MOMO_REFUND_MAX).contains(&amount) {
            return Err(PaymentError::RefundOutOfRange(amount));
        }
        Ok(Self {
            trans_id,
            amount,
            description: description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Hoàn tiền đơn hàng".to_owned()),
        })
    }
}

/// Where to send the buyer after checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRedirect {
    pub method: PaymentMethod,
    pub url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vnpay_callback_from_return_url() {
        let cb = VnpayCallback::from_query(
            "https://shop.example/payment/callback?vnp_Amount=15000000&vnp_BankCode=NCB\
             &vnp_OrderInfo=Order+%23123&vnp_ResponseCode=00&vnp_TxnRef=123\
             &vnp_TransactionDate=20240501101500&vnp_TransactionNo=14000000",
        );
        assert!(cb.is_success());
        assert_eq!(cb.amount, Vnd::new(150_000));
        assert_eq!(cb.order_info.as_deref(), Some("Order #123"));
        assert_eq!(cb.message(), "Giao dịch thành công");

        let query = cb.query_request();
        assert_eq!(query.order_id, "123");
        assert_eq!(query.trans_date, "20240501101500");
    }

    #[test]
    fn test_vnpay_callback_failure_from_bare_query() {
        let cb = VnpayCallback::from_query("?vnp_ResponseCode=24&vnp_TxnRef=9");
        assert!(!cb.is_success());
        assert_eq!(cb.amount, Vnd::ZERO);
        assert!(cb.message().contains("hủy giao dịch"));
        assert_eq!(vnpay_message("42"), "Lỗi không xác định");
    }

    #[test]
    fn test_vnpay_payment_url_shapes() {
        let url = "https://sandbox.vnpayment.vn/pay?x=1";
        assert_eq!(vnpay_payment_url(&json!(url)).as_deref(), Some(url));
        assert_eq!(vnpay_payment_url(&json!({"paymentUrl": url})).as_deref(), Some(url));
        assert_eq!(vnpay_payment_url(&json!({"data": {"paymentUrl": url}})).as_deref(), Some(url));
        assert_eq!(vnpay_payment_url(&json!({"data": url})).as_deref(), Some(url));
        assert!(vnpay_payment_url(&json!({"data": {}})).is_none());
    }

    #[test]
    fn test_vnpay_request_defaults() {
        let body = serde_json::to_value(VnpayPaymentRequest::new(Vnd::new(100), "x").unwrap()).unwrap();
        assert_eq!(body["language"], "vn");
        assert_eq!(body["bankCode"], "");
        assert_eq!(body["amount"], 100);
        assert!(VnpayPaymentRequest::new(Vnd::ZERO, "x").is_err());
    }

    #[test]
    fn test_momo_request_body() {
        let req = MomoPaymentRequest::new(Vnd::new(250_000), vec![OrderId::new("o1"), OrderId::new("o2")]).unwrap();
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["amount"], 250_000);
        assert_eq!(body["orderId"], "o1");
        assert_eq!(body["orderIds"], json!(["o1", "o2"]));
        assert_eq!(body["orderInfo"], "Thanh toán đơn hàng o1");

        let body = serde_json::to_value(MomoPaymentRequest::new(Vnd::new(1), Vec::new()).unwrap()).unwrap();
        assert_eq!(body, json!({"amount": 1}));
    }

    #[test]
    fn test_momo_response_shapes() {
        let top = MomoPayment::from_response(&json!({"resultCode": 0, "payUrl": "https://momo/x", "orderId": "m1"})).unwrap();
        assert_eq!(top.pay_url, "https://momo/x");
        assert_eq!(top.order_id.as_deref(), Some("m1"));

        let nested = MomoPayment::from_response(&json!({"data": {"paymentUrl": "https://momo/y", "transId": 55}})).unwrap();
        assert_eq!(nested.pay_url, "https://momo/y");
        assert_eq!(nested.trans_id.as_deref(), Some("55"));

        let err = MomoPayment::from_response(&json!({"resultCode": 1001, "message": "Giao dịch thất bại"})).unwrap_err();
        assert_eq!(err.to_string(), "Giao dịch thất bại");

        let err = MomoPayment::from_response(&json!({"resultCode": 42})).unwrap_err();
        assert_eq!(err.to_string(), "MoMo API error: resultCode 42");

        assert_eq!(
            MomoPayment::from_response(&json!({"message": "ok"})).unwrap_err(),
            PaymentError::MissingPaymentUrl
        );
    }

    #[test]
    fn test_momo_refund_bounds() {
        assert!(MomoRefund::new("t1", Vnd::new(1_000), None).is_ok());
        assert!(MomoRefund::new("t1", Vnd::new(50_000_000), None).is_ok());
        assert_eq!(
            MomoRefund::new("t1", Vnd::new(999), None).unwrap_err(),
            PaymentError::RefundOutOfRange(Vnd::new(999))
        );
        assert_eq!(
            MomoRefund::new(" ", Vnd::new(5_000), None).unwrap_err(),
            PaymentError::MissingRefundFields
        );
        let refund = MomoRefund::new("t1", Vnd::new(5_000), Some(String::new())).unwrap();
        assert_eq!(refund.description, "Hoàn tiền đơn hàng");
    }
}
