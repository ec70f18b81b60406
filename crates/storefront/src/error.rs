//! Unified error type for backend calls.
//!
//! Every service returns `Result<T, ApiError>`. Backend failures collapse to
//! one human-readable message taken from the response body (`error`, then
//! `message`), falling back to the HTTP status.

use marketplace_core::address::AddressErrors;
use marketplace_core::cart::CartError;
use marketplace_core::checkout::CheckoutError;
use marketplace_core::payment::PaymentError;
use marketplace_core::promotion::PromotionRejection;
use marketplace_core::review::ReviewError;
use thiserror::Error;

/// Errors returned by the storefront client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response.
    #[error("Không thể kết nối đến server. Vui lòng kiểm tra kết nối mạng. ({0})")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// No session, or the session could not be refreshed.
    #[error("Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại")]
    Unauthorized,

    /// Rate limited; seconds to wait.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The envelope said `success: false`.
    #[error("{0}")]
    Backend(String),

    /// The body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Input rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Address(#[from] AddressErrors),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Promotion(#[from] PromotionRejection),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Review(#[from] ReviewError),
}

impl ApiError {
    /// HTTP status behind this error, when there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Unauthorized => Some(401),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Build from a failed response body.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        let message = failure_message(status, body);
        if status == 404 {
            Self::NotFound(message)
        } else {
            Self::Status { status, message }
        }
    }
}

/// `error`, else `message`, else `Lỗi <status>`.
pub(crate) fn failure_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message"].into_iter().find_map(|key| {
                v.get(key)
                    .and_then(serde_json::Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToOwned::to_owned)
            })
        })
        .unwrap_or_else(|| format!("Lỗi {status}"))
}
