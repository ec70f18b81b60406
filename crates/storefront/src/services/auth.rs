//! Registration, login, tokens and profile.

use chrono::NaiveDate;
use marketplace_core::address::Address;
use marketplace_core::{Email, Phone, Role, UserId};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::client::{ApiClient, Request};
use crate::error::ApiError;
use crate::session::{LoginData, Session, SessionUser};

/// Largest avatar the backend accepts.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Accepted avatar MIME types.
pub const AVATAR_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

/// New account details.
#[derive(Debug, Clone)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: SecretString,
    pub retype_password: SecretString,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
    retype_password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(rename = "dateOfBirth", skip_serializing_if = "Option::is_none")]
    date_of_birth: Option<NaiveDate>,
}

/// The signed-in user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Option<UserId>,
    #[serde(alias = "full_name")]
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    #[serde(alias = "avatar")]
    pub avatar_url: Option<String>,
    pub roles: Vec<Role>,
    #[serde(alias = "addresses")]
    pub address: Vec<Address>,
}

impl UserProfile {
    /// Best name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("Khách hàng")
    }
}

/// Profile fields the user can change. All three are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
}

impl ProfileUpdate {
    /// # Errors
    ///
    /// `ApiError::Validation` when the name or phone is blank, or the phone is
    /// not 10 digits.
    pub fn new(full_name: &str, phone: &str, date_of_birth: NaiveDate) -> Result<Self, ApiError> {
        if full_name.trim().is_empty() || phone.trim().is_empty() {
            return Err(ApiError::Validation(
                "fullName, phone và dateOfBirth là bắt buộc".to_owned(),
            ));
        }
        let phone = Phone::parse(phone).map_err(|e| ApiError::Validation(e.to_string()))?;
        Ok(Self {
            full_name: full_name.trim().to_owned(),
            phone: phone.as_str().to_owned(),
            date_of_birth,
        })
    }
}

/// An image to upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Guess the content type from the file extension.
    #[must_use]
    pub fn image(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let ext = file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let content_type = match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };
        Self {
            file_name,
            content_type: content_type.to_owned(),
            bytes,
        }
    }

    pub(crate) fn part(&self) -> Result<Part, reqwest::Error> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
    }
}

fn check_avatar(upload: &Upload) -> Result<(), ApiError> {
    if !AVATAR_TYPES.contains(&upload.content_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "File không đúng định dạng. Chỉ hỗ trợ: {}",
            AVATAR_TYPES.join(", ")
        )));
    }
    if upload.bytes.len() > MAX_AVATAR_BYTES {
        return Err(ApiError::Validation(
            "File quá lớn. Kích thước tối đa: 5MB".to_owned(),
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct SocialLogin {
    token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    user: SessionUser,
}

impl ApiClient {
    /// Create an account. The backend emails a verification code.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for an invalid email or mismatched passwords;
    /// otherwise the backend's error.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<Value, ApiError> {
        let email = Email::parse(&registration.email)
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if registration.password.expose_secret() != registration.retype_password.expose_secret() {
            return Err(ApiError::Validation("Mật khẩu nhập lại không khớp".to_owned()));
        }
        let body = RegisterBody {
            full_name: registration.full_name.trim(),
            email: email.as_str(),
            password: registration.password.expose_secret(),
            retype_password: registration.retype_password.expose_secret(),
            phone: registration
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty()),
            date_of_birth: registration.date_of_birth,
        };
        self.post("/api/v1/users/register", &body).await
    }

    /// # Errors
    ///
    /// Returns the backend's error for an unknown or expired code.
    #[instrument(skip(self))]
    pub async fn verify_email(&self, code: &str) -> Result<Value, ApiError> {
        self.get_query("/api/v1/users/verify", &[("code", code)])
            .await
    }

    /// Sign in and keep the session.
    ///
    /// # Errors
    ///
    /// Returns the backend's message (or "Đăng nhập thất bại") on bad
    /// credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session, ApiError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let data: LoginData = match self.post("/api/v1/users/login", &body).await {
            Ok(data) => data,
            Err(ApiError::Backend(message)) if message == "Yêu cầu thất bại" => {
                return Err(ApiError::Backend("Đăng nhập thất bại".to_owned()));
            }
            Err(e) => return Err(e),
        };
        let session = Session::from_login(data, email);
        self.session().set(session.clone()).await;
        Ok(session)
    }

    /// Finish a Google sign-in.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the code is rejected.
    #[instrument(skip(self, code))]
    pub async fn social_login(&self, code: &str, redirect_uri: &str) -> Result<Option<Session>, ApiError> {
        let body = serde_json::json!({ "code": code, "redirectUri": redirect_uri });
        let login: SocialLogin = self
            .post("/api/v1/users/auth/social/callback", &body)
            .await?;
        let Some(token) = login.token else {
            return Ok(None);
        };
        let session = Session::new(token, login.refresh_token, login.user);
        self.session().set(session.clone()).await;
        Ok(Some(session))
    }

    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` when signed out.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let mut profile: UserProfile = self.get("/api/v1/users/current").await?;
        // /current omits roles; the login response had them.
        if profile.roles.is_empty()
            && let Some(session) = self.session().get().await
        {
            profile.roles = session.user.roles;
        }
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<Value, ApiError> {
        self.send(Request::new(Method::POST, "/forgot-password").query(&[("email", email)])?)
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's error for an invalid or expired reset token.
    #[instrument(skip(self, token, password))]
    pub async fn reset_password(&self, token: &str, password: &SecretString) -> Result<Value, ApiError> {
        let body = serde_json::json!({ "token": token, "password": password.expose_secret() });
        self.post("/reset-password", &body).await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self))]
    pub async fn send_verification_email(&self) -> Result<Value, ApiError> {
        self.post_empty("/api/v1/users/send-verification-email")
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's error when the old password is wrong.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<Value, ApiError> {
        let body = serde_json::json!({
            "oldPassword": old_password.expose_secret(),
            "newPassword": new_password.expose_secret(),
        });
        self.post("/api/v1/users/change-password", &body).await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        self.put("/api/v1/users/profile", update).await
    }

    /// Upload a new avatar (jpeg, png, gif or webp, at most 5 MB).
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for the wrong type or size; otherwise the
    /// backend's error.
    #[instrument(skip(self, upload), fields(file = %upload.file_name, bytes = upload.bytes.len()))]
    pub async fn update_avatar(&self, upload: Upload) -> Result<Value, ApiError> {
        check_avatar(&upload)?;
        let request = Request::new(Method::PUT, "/api/v1/users/avatar").multipart(Box::new(
            move || Ok(Form::new().part("avatarFile", upload.part()?)),
        ));
        self.send(request).await
    }

    /// Sign out. The local session is cleared even when the backend call
    /// fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.post_empty::<Value>("/api/v1/users/logout").await {
            warn!(error = %e, "Logout request failed");
        }
        self.session().clear().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_update_requires_fields() {
        let dob = NaiveDate::from_ymd_opt(2000, 1, 2).unwrap();
        assert!(ProfileUpdate::new(" ", "0901234567", dob).is_err());
        assert!(ProfileUpdate::new("Lan", "123", dob).is_err());
        let update = ProfileUpdate::new(" Lan ", "0901234567", dob).unwrap();
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["fullName"], "Lan");
        assert_eq!(json["dateOfBirth"], "2000-01-02");
    }

    #[test]
    fn test_avatar_checks() {
        assert!(check_avatar(&Upload::image("me.PNG", vec![0; 10])).is_ok());
        assert!(check_avatar(&Upload::image("me.bmp", vec![0; 10])).is_err());
        assert!(check_avatar(&Upload::image("me.jpg", vec![0; MAX_AVATAR_BYTES + 1])).is_err());
    }

    #[test]
    fn test_register_body_omits_blank_optionals() {
        let body = RegisterBody {
            full_name: "Lan",
            email: "lan@example.vn",
            password: "p",
            retype_password: "p",
            phone: None,
            date_of_birth: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["retype_password"], "p");
        assert!(json.get("phone").is_none());
        assert!(json.get("dateOfBirth").is_none());
    }

    #[test]
    fn test_profile_display_name() {
        let profile: UserProfile =
            serde_json::from_value(serde_json::json!({"email": "a@b.vn", "address": []})).unwrap();
        assert_eq!(profile.display_name(), "a@b.vn");
    }
}
