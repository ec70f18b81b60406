//! Shipper accounts. Admins create them; shippers cannot self-register.

use chrono::NaiveDate;
use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::{Email, ShipperId};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::client::{ApiClient, Request, segment};
use crate::error::ApiError;
use crate::services::auth::Upload;
use crate::services::seller::catalog::dto_form;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Shipper {
    pub id: Option<ShipperId>,
    #[serde(alias = "name")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub status: Option<String>,
    pub active: Option<bool>,
}

/// Shipper listing filter. Blank filters are left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShipperQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A new shipper account.
#[derive(Debug, Clone)]
pub struct ShipperAccount {
    pub full_name: String,
    pub email: String,
    pub password: SecretString,
    pub retype_password: SecretString,
    pub date_of_birth: NaiveDate,
    pub phone: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShipperAccountBody<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
    date_of_birth: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipperUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

fn admin_shipper(id: &ShipperId, action: Option<&str>) -> String {
    let base = format!("/api/v1/admin/shipper/{}", segment(id.as_str()));
    action.map_or_else(|| base.clone(), |a| format!("{base}/{a}"))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_shippers(&self, query: &ShipperQuery) -> Result<Page<Shipper>, ApiError> {
        self.get_query("/api/v1/admin/shipper", query).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(shipper_id = %id))]
    pub async fn admin_shipper(&self, id: &ShipperId) -> Result<Shipper, ApiError> {
        self.get(&admin_shipper(id, None)).await
    }

    /// Create the account, with an optional avatar.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for a missing name, a bad email, or passwords
    /// that differ; otherwise the backend's error (email taken).
    #[instrument(skip(self, account, avatar), fields(has_avatar = avatar.is_some()))]
    pub async fn create_shipper(&self, account: &ShipperAccount, avatar: Option<Upload>) -> Result<Shipper, ApiError> {
        if account.full_name.trim().is_empty() || account.password.expose_secret().is_empty() {
            return Err(ApiError::Validation(
                "Vui lòng điền đầy đủ thông tin bắt buộc".to_owned(),
            ));
        }
        let email = Email::parse(&account.email).map_err(|e| ApiError::Validation(e.to_string()))?;
        if account.password.expose_secret() != account.retype_password.expose_secret() {
            return Err(ApiError::Validation("Mật khẩu xác nhận không khớp".to_owned()));
        }
        let body = ShipperAccountBody {
            email: email.as_str(),
            password: account.password.expose_secret(),
            full_name: account.full_name.trim(),
            date_of_birth: account.date_of_birth,
            phone: account
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty()),
        };
        let form = dto_form(&body, "avatar", avatar.into_iter().collect())?;
        let shipper = self
            .send(Request::new(Method::POST, "/api/v1/admin/shipper").multipart(form))
            .await?;
        info!("Shipper account created");
        Ok(shipper)
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self, update), fields(shipper_id = %id))]
    pub async fn update_shipper(&self, id: &ShipperId, update: &ShipperUpdate) -> Result<Shipper, ApiError> {
        let path = format!("/api/v1/admin/shipper/shipper/{}", segment(id.as_str()));
        self.put(&path, update).await
    }

    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self), fields(shipper_id = %id))]
    pub async fn activate_shipper(&self, id: &ShipperId) -> Result<Value, ApiError> {
        self.put_empty(&admin_shipper(id, Some("activate"))).await
    }

    /// The backend emails the new password to the shipper.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    #[instrument(skip(self), fields(shipper_id = %id))]
    pub async fn reset_shipper_password(&self, id: &ShipperId) -> Result<Value, ApiError> {
        self.post_empty(&admin_shipper(id, Some("reset-password")))
            .await
    }

    /// Totals such as active, banned and total shippers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn shipper_statistics(&self) -> Result<Value, ApiError> {
        self.get("/api/v1/admin/shipper/statistics").await
    }
}
