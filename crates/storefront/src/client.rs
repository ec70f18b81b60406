//! HTTP plumbing shared by every service.
//!
//! One `ApiClient` wraps a `reqwest::Client`, the session, and a `moka` cache
//! for public catalog reads. Every request goes through [`ApiClient::send`],
//! which handles:
//!
//! - Bearer token injection from the session
//! - Retrying 502/503/504 (the backend sleeps on a free tier and answers
//!   with gateway errors while it boots)
//! - One token refresh and replay on 401
//! - 429 → [`ApiError::RateLimited`]
//! - Unwrapping the `{success, data, error, message}` envelope

use std::borrow::Cow;
use std::sync::Arc;

use moka::future::Cache;
use reqwest::Method;
use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

use crate::config::StorefrontConfig;
use crate::error::ApiError;
use crate::session::{RefreshData, SessionStore};

const REFRESH_PATH: &str = "/api/v1/users/refresh-token";

/// Builds a multipart form. Forms are consumed on send, so retries rebuild.
pub(crate) type FormBuilder = Box<dyn Fn() -> Result<Form, reqwest::Error> + Send + Sync>;

pub(crate) enum Body {
    Empty,
    Json(Value),
    Multipart(FormBuilder),
}

/// A request that can be replayed.
pub(crate) struct Request {
    method: Method,
    path: String,
    query: Option<Value>,
    body: Body,
}

impl Request {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: Body::Empty,
        }
    }

    /// Accepts a struct, a map, or `&[(key, value)]` pairs.
    pub(crate) fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self, ApiError> {
        self.query = Some(query_map(serde_json::to_value(query)?));
        Ok(self)
    }

    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub(crate) fn multipart(mut self, build: FormBuilder) -> Self {
        self.body = Body::Multipart(build);
        self
    }
}

/// Flatten a serialized query into one JSON object.
///
/// Pair slices serialize as `[[k, v], ...]`, which serde_urlencoded rejects,
/// so they are folded into a map. Nulls are dropped for the same reason.
fn query_map(value: Value) -> Value {
    let entries: Vec<(String, Value)> = match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(pairs) => pairs
            .into_iter()
            .filter_map(|pair| match pair {
                Value::Array(kv) => match <[Value; 2]>::try_from(kv) {
                    Ok([Value::String(key), value]) => Some((key, value)),
                    _ => None,
                },
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Value::Object(entries.into_iter().filter(|(_, v)| !v.is_null()).collect())
}

/// Percent-encode an id for use as a path segment.
pub(crate) fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// Unwrap the backend envelope.
///
/// Non-JSON bodies come back as a JSON string (some payment endpoints answer
/// with a bare URL). `success: false` is an error; otherwise `data` when it is
/// present and non-null, else the whole body.
pub(crate) fn unwrap_envelope(text: &str) -> Result<Value, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    let Ok(body) = serde_json::from_str::<Value>(trimmed) else {
        return Ok(Value::String(trimmed.to_owned()));
    };

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = ["error", "message"]
            .into_iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Yêu cầu thất bại");
        return Err(ApiError::Backend(message.to_owned()));
    }

    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => Ok(data),
            Some(_) | None => Ok(Value::Object(map)),
        },
        other => Ok(other),
    }
}

/// Client for the marketplace backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    config: StorefrontConfig,
    session: SessionStore,
    cache: Cache<String, Value>,
    /// Serializes token refreshes. A waiter whose token was already replaced
    /// skips its own refresh.
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    /// Create a client with an empty session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        Self::with_session(config, SessionStore::new())
    }

    /// Create a client sharing an existing session store.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn with_session(config: StorefrontConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                config,
                session,
                cache,
                refresh_lock: Mutex::new(()),
            }),
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Drop every cached catalog read.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Request::new(Method::GET, path)).await
    }

    pub(crate) async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(Request::new(Method::GET, path).query(query)?)
            .await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Request::new(Method::POST, path).json(body)?)
            .await
    }

    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Request::new(Method::POST, path)).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Request::new(Method::PUT, path).json(body)?)
            .await
    }

    pub(crate) async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Request::new(Method::PUT, path)).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Request::new(Method::DELETE, path)).await
    }

    /// GET through the catalog cache.
    pub(crate) async fn get_cached<T, Q>(
        &self,
        key: String,
        path: &str,
        query: Option<&Q>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        if let Some(value) = self.inner.cache.get(&key).await {
            debug!(key = %key, "Cache hit");
            return decode(value, path);
        }

        let mut request = Request::new(Method::GET, path);
        if let Some(query) = query {
            request = request.query(query)?;
        }
        let value = self.send_value(request).await?;
        self.inner.cache.insert(key, value.clone()).await;
        decode(value, path)
    }

    /// Cached value for `key`, loading it with `load` on a miss.
    pub(crate) async fn cached_value<F>(&self, key: &str, load: F) -> Result<Value, ApiError>
    where
        F: Future<Output = Result<Value, ApiError>>,
    {
        if let Some(value) = self.inner.cache.get(key).await {
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }
        let value = load.await?;
        self.inner.cache.insert(key.to_owned(), value.clone()).await;
        Ok(value)
    }

    /// Send and decode.
    pub(crate) async fn send<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        let path = request.path.clone();
        let value = self.send_value(request).await?;
        decode(value, &path)
    }

    // =========================================================================
    // Core request loop
    // =========================================================================

    /// Send a request and return the unwrapped envelope payload.
    ///
    /// # Errors
    ///
    /// See the module docs for the status mapping.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub(crate) async fn send_value(&self, request: Request) -> Result<Value, ApiError> {
        if let Some(session) = self.inner.session.get().await
            && session.is_expired()
            && session.can_refresh()
            && let Err(e) = self.refresh_unless_rotated(&session.access_token).await
        {
            warn!(error = %e, "Proactive token refresh failed");
        }

        let mut attempts = 0;
        let mut refreshed = false;

        loop {
            let (builder, bearer) = self.build(&request).await?;
            let response = builder.send().await?;
            let status = response.status();

            if matches!(status.as_u16(), 502..=504) && attempts < self.inner.config.max_retries {
                attempts += 1;
                warn!(
                    status = %status,
                    attempt = attempts,
                    "Backend unavailable, retrying"
                );
                tokio::time::sleep(self.inner.config.retry_delay).await;
                continue;
            }

            // A 401 without a token is a plain failure, e.g. bad credentials.
            if status == reqwest::StatusCode::UNAUTHORIZED
                && let Some(sent) = bearer
            {
                if !refreshed && self.inner.session.refresh_token().await.is_some() {
                    refreshed = true;
                    match self.refresh_unless_rotated(&sent).await {
                        Ok(()) => continue,
                        Err(e) => warn!(error = %e, "Token refresh failed"),
                    }
                }
                self.inner.session.clear().await;
                return Err(ApiError::Unauthorized);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                return Err(ApiError::RateLimited(retry_after));
            }

            let text = response.text().await?;

            if !status.is_success() {
                error!(
                    status = %status,
                    body = %text.chars().take(500).collect::<String>(),
                    "Backend returned non-success status"
                );
                return Err(ApiError::from_body(status.as_u16(), &text));
            }

            return unwrap_envelope(&text);
        }
    }

    /// The builder plus the access token it carries, if any.
    async fn build(
        &self,
        request: &Request,
    ) -> Result<(reqwest::RequestBuilder, Option<SecretString>), ApiError> {
        let url = self.inner.config.endpoint(&request.path)?;
        let mut builder = self.inner.http.request(request.method.clone(), url);

        let bearer = self.inner.session.access_token().await;
        if let Some(token) = &bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(query) = &request.query {
            builder = builder.query(query);
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(body) => builder.json(body),
            Body::Multipart(build) => builder.multipart(build()?),
        };
        Ok((builder, bearer))
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` when there is no refresh token, or the
    /// backend's error when the refresh is rejected.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.exchange_refresh_token().await
    }

    /// Refresh only if the session still holds `stale`. Another request may
    /// have refreshed while this one waited for the lock.
    async fn refresh_unless_rotated(&self, stale: &SecretString) -> Result<(), ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;
        let current = self.inner.session.access_token().await;
        if current.is_some_and(|t| t.expose_secret() != stale.expose_secret()) {
            debug!("Token already refreshed by another request");
            return Ok(());
        }
        self.exchange_refresh_token().await
    }

    /// Callers hold `refresh_lock`.
    async fn exchange_refresh_token(&self) -> Result<(), ApiError> {
        let refresh_token = self
            .inner
            .session
            .refresh_token()
            .await
            .ok_or(ApiError::Unauthorized)?;

        let url = self.inner.config.endpoint(REFRESH_PATH)?;
        let response = self
            .inner
            .http
            .post(url)
            .json(&serde_json::json!({ "refreshToken": refresh_token.expose_secret() }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), &text));
        }

        let refreshed: RefreshData = serde_json::from_value(unwrap_envelope(&text)?)?;
        self.inner.session.rotate(refreshed).await;
        debug!("Access token refreshed");
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(value: Value, path: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| {
        error!(error = %e, path = %path, "Failed to decode backend response");
        ApiError::Parse(e)
    })
}
