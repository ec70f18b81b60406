//! Login session and token storage.
//!
//! The backend issues a JWT access token and a refresh token at login. The
//! access token's `exp` claim is read (not verified) so the client can refresh
//! shortly before expiry instead of waiting for a 401.

use std::path::Path;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use marketplace_core::{Role, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ApiError;

/// The signed-in user, as far as the login response tells us.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Tokens plus the user they belong to.
#[derive(Debug, Clone)]
pub struct Session {
    /// JWT access token for API requests.
    pub access_token: SecretString,
    /// Token for `POST /api/v1/users/refresh-token`.
    pub refresh_token: Option<SecretString>,
    /// Unix timestamp from the access token's `exp` claim.
    pub access_token_expires_at: Option<i64>,
    pub user: SessionUser,
}

/// `data` of a successful login.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// `data` of a successful refresh.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshData {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Unix `exp` claim of a JWT, without verifying the signature.
fn jwt_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

impl Session {
    #[must_use]
    pub fn new(access_token: String, refresh_token: Option<String>, user: SessionUser) -> Self {
        Self {
            access_token_expires_at: jwt_expiry(&access_token),
            access_token: SecretString::from(access_token),
            refresh_token: refresh_token.filter(|t| !t.is_empty()).map(SecretString::from),
            user,
        }
    }

    /// The login response doesn't echo the email, so the one typed in is kept.
    pub(crate) fn from_login(data: LoginData, email: &str) -> Self {
        let user = SessionUser {
            id: data.id,
            name: data.username,
            email: Some(email.to_owned()),
            phone: None,
            roles: data.roles,
        };
        Self::new(data.token, data.refresh_token, user)
    }

    /// Swap in refreshed tokens. The old refresh token is kept when the
    /// backend doesn't rotate it.
    pub(crate) fn rotate(&mut self, refreshed: RefreshData) {
        self.access_token_expires_at = jwt_expiry(&refreshed.token);
        self.access_token = SecretString::from(refreshed.token);
        if let Some(refresh) = refreshed.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(SecretString::from(refresh));
        }
    }

    /// Check if the access token has expired (60 second buffer). Tokens
    /// without an `exp` claim never expire client-side.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(60)
    }

    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.access_token_expires_at
            .is_some_and(|expires_at| now >= expires_at.saturating_sub(seconds))
    }

    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.user.roles.contains(&role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// On-disk form of a session. Only written to the user's own session file.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: SessionUser,
}

/// Shared, async-safe session holder.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, session: Session) {
        *self.inner.write().await = Some(session);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn is_signed_in(&self) -> bool {
        self.inner.read().await.is_some()
    }

    pub(crate) async fn access_token(&self) -> Option<SecretString> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub(crate) async fn refresh_token(&self) -> Option<SecretString> {
        self.inner
            .read()
            .await
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
    }

    pub(crate) async fn rotate(&self, refreshed: RefreshData) {
        if let Some(session) = self.inner.write().await.as_mut() {
            session.rotate(refreshed);
        }
    }

    /// Write the current session as JSON, or remove the file when signed out.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Io` if the file cannot be written or removed.
    pub async fn persist_to(&self, path: &Path) -> Result<(), ApiError> {
        let stored = self.inner.read().await.as_ref().map(|s| StoredSession {
            access_token: s.access_token.expose_secret().to_owned(),
            refresh_token: s
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            user: s.user.clone(),
        });

        match stored {
            Some(stored) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent).await?;
                }
                write_private(path, &serde_json::to_vec_pretty(&stored)?).await?;
            }
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    /// Load a session saved by [`persist_to`](Self::persist_to). A missing
    /// file leaves the store signed out.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Io` or `ApiError::Parse` for unreadable files.
    pub async fn load_from(&self, path: &Path) -> Result<bool, ApiError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredSession = serde_json::from_slice(&bytes)?;
        self.set(Session::new(
            stored.access_token,
            stored.refresh_token,
            stored.user,
        ))
        .await;
        Ok(true)
    }
}

/// The file holds live tokens, so on unix it is readable by the owner only.
#[cfg(unix)]
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}

#[cfg(not(unix))]
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, bytes).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jwt(exp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u1","exp":{exp}}}"#));
        format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig")
    }

    #[test]
    fn test_reads_exp_claim() {
        assert_eq!(jwt_expiry(&jwt(1_700_000_000)), Some(1_700_000_000));
        assert_eq!(jwt_expiry("opaque-token"), None);
    }

    #[test]
    fn test_expiry_buffer() {
        let now = chrono::Utc::now().timestamp();
        let expiring = Session::new(jwt(now + 30), None, SessionUser::default());
        assert!(expiring.is_expired());
        let fresh = Session::new(jwt(now + 3600), Some(String::new()), SessionUser::default());
        assert!(!fresh.is_expired());
        assert!(!fresh.can_refresh());
        let opaque = Session::new("opaque".into(), Some("r".into()), SessionUser::default());
        assert!(!opaque.is_expired());
        assert!(opaque.can_refresh());
    }

    #[test]
    fn test_extreme_exp_does_not_overflow() {
        let ancient = Session::new(jwt(i64::MIN), None, SessionUser::default());
        assert!(ancient.is_expired());
        let distant = Session::new(jwt(i64::MAX), None, SessionUser::default());
        assert!(!distant.is_expired());
    }

    #[test]
    fn test_rotate_keeps_old_refresh_token() {
        let mut session = Session::new("a".into(), Some("r1".into()), SessionUser::default());
        session.rotate(RefreshData {
            token: "b".into(),
            refresh_token: None,
        });
        assert_eq!(session.access_token.expose_secret(), "b");
        assert_eq!(session.refresh_token.as_ref().unwrap().expose_secret(), "r1");
    }

    #[test]
    fn test_login_roles() {
        let data: LoginData = serde_json::from_value(serde_json::json!({
            "token": "t", "refresh_token": "r", "id": 5, "username": "lan",
            "roles": ["ROLE_BUYER", "ROLE_ADMIN"]
        }))
        .unwrap();
        let session = Session::from_login(data, "lan@example.vn");
        assert!(session.is_admin());
        assert!(session.has_role(Role::Buyer));
        assert!(!session.has_role(Role::Shipper));
        assert_eq!(session.user.email.as_deref(), Some("lan@example.vn"));
        assert!(!format!("{session:?}").contains("\"t\""));
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let path = std::env::temp_dir().join(format!("mkt-session-{}.json", std::process::id()));
        let store = SessionStore::new();
        store
            .set(Session::new("tok".into(), Some("ref".into()), SessionUser::default()))
            .await;
        store.persist_to(&path).await.unwrap();

        let loaded = SessionStore::new();
        assert!(loaded.load_from(&path).await.unwrap());
        assert_eq!(
            loaded.access_token().await.unwrap().expose_secret(),
            "tok"
        );

        loaded.clear().await;
        loaded.persist_to(&path).await.unwrap();
        assert!(!loaded.load_from(&path).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path =
            std::env::temp_dir().join(format!("mkt-session-mode-{}.json", std::process::id()));
        std::fs::write(&path, b"{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = SessionStore::new();
        store
            .set(Session::new("tok".into(), Some("ref".into()), SessionUser::default()))
            .await;
        store.persist_to(&path).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        std::fs::remove_file(&path).unwrap();
    }
}
