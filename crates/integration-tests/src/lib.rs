//! Test harness for the storefront client.
//!
//! [`FakeBackend`] serves an axum router on an ephemeral local port and
//! records every request it sees, so tests can drive a real
//! [`ApiClient`] over HTTP and then check what was sent.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use marketplace_storefront::{ApiClient, SessionStore, StorefrontConfig};
use serde_json::{Value, json};
use url::Url;

/// A request as the fake backend received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

/// Requests seen so far, shared with the server task.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Recorded>>>);

impl RequestLog {
    fn push(&self, request: Recorded) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    #[must_use]
    pub fn all(&self) -> Vec<Recorded> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests to `path`, in order.
    #[must_use]
    pub fn to(&self, path: &str) -> Vec<Recorded> {
        self.all().into_iter().filter(|r| r.path == path).collect()
    }

    #[must_use]
    pub fn count(&self, path: &str) -> usize {
        self.to(path).len()
    }
}

async fn record(State(log): State<RequestLog>, request: Request, next: Next) -> Response {
    log.push(Recorded {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        query: request.uri().query().map(ToOwned::to_owned),
        authorization: request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned),
    });
    next.run(request).await
}

/// A backend double listening on `127.0.0.1`.
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub log: RequestLog,
}

impl FakeBackend {
    /// Serve `router` until the test's runtime shuts down.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start(router: Router) -> std::io::Result<Self> {
        let log = RequestLog::default();
        let app = router.layer(middleware::from_fn_with_state(log.clone(), record));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, log })
    }

    /// Config pointed at this backend, with short retry pauses.
    ///
    /// # Panics
    ///
    /// If the bound address does not form a URL.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn config(&self) -> StorefrontConfig {
        let url = Url::parse(&format!("http://{}", self.addr)).expect("local address is a valid URL");
        let mut config = StorefrontConfig::new(url);
        config.timeout = Duration::from_secs(5);
        config.retry_delay = Duration::from_millis(10);
        config
    }

    /// A client with its own empty session.
    ///
    /// # Panics
    ///
    /// If the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client(&self) -> ApiClient {
        ApiClient::with_session(self.config(), SessionStore::new()).expect("client builds")
    }
}

/// `{ success: true, data }`.
#[must_use]
pub fn ok(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

/// `{ success: false, message }`.
#[must_use]
pub fn refused(message: &str) -> Value {
    json!({ "success": false, "message": message })
}
