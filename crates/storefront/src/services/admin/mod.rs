//! Platform administration: store approval, user bans, platform promotions
//! and the statistics overview. Shippers, money and disputes live in the
//! submodules.

pub mod disputes;
pub mod finance;
pub mod shippers;

use marketplace_core::order::Order;
use marketplace_core::pagination::{Page, PageRequest};
use marketplace_core::promotion::Promotion;
use marketplace_core::{OrderId, PromotionId, StoreId, UserId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::client::{ApiClient, Request, segment};
use crate::error::ApiError;
use crate::services::catalog::Store;
use crate::services::seller::PromotionInput;

/// Stores as admins review them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreListing {
    Pending,
    Approved,
}

/// User listing filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserQuery {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Option<UserId>,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub status: Option<String>,
    pub is_banned: bool,
}

/// How long a ban lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BanDuration {
    OneDay,
    SevenDays,
    ThirtyDays,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBan {
    pub user_id: UserId,
    pub reason: String,
    pub duration: BanDuration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BanStatus {
    pub is_banned: bool,
    pub reason: Option<String>,
    pub banned_until: Option<String>,
}

fn required_reason<'a>(reason: &'a str, message: &str) -> Result<&'a str, ApiError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApiError::Validation(message.to_owned()));
    }
    Ok(reason)
}

fn admin_store(id: &StoreId, action: &str) -> String {
    format!("/api/v1/admin/stores/{}/{action}", segment(id.as_str()))
}

fn admin_promotion(id: &PromotionId, action: Option<&str>) -> String {
    let base = format!("/api/v1/admin/promotions/{}", segment(id.as_str()));
    action.map_or_else(|| base.clone(), |a| format!("{base}/{a}"))
}

impl ApiClient {
    // =========================================================================
    // Stores
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_stores(&self, listing: StoreListing, page: &PageRequest) -> Result<Page<Store>, ApiError> {
        let path = match listing {
            StoreListing::Pending => "/api/v1/admin/stores/pending",
            StoreListing::Approved => "/api/v1/admin/stores/approved",
        };
        self.get_query(path, page).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn approve_store(&self, id: &StoreId) -> Result<Value, ApiError> {
        let value = self.put_empty(&admin_store(id, "approve")).await?;
        info!("Store approved");
        Ok(value)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn reject_store(&self, id: &StoreId, reason: &str) -> Result<Value, ApiError> {
        let request = Request::new(Method::PUT, admin_store(id, "reject"))
            .query(&[("reason", reason.trim())])?;
        self.send(request).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` without a reason; otherwise the backend's error.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn ban_store(&self, id: &StoreId, reason: &str) -> Result<Value, ApiError> {
        let reason = required_reason(reason, "Lý do ban cửa hàng là bắt buộc")?;
        let request = Request::new(Method::PUT, admin_store(id, "ban")).query(&[("reason", reason)])?;
        self.send(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn unban_store(&self, id: &StoreId) -> Result<Value, ApiError> {
        self.put_empty(&admin_store(id, "unban")).await
    }

    /// Set a store's status directly, e.g. `ACTIVE` or `SUSPENDED`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error for an unknown status.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn set_store_status(&self, id: &StoreId, status: &str) -> Result<Value, ApiError> {
        let request = Request::new(Method::PUT, admin_store(id, "status"))
            .query(&[("status", status.trim().to_ascii_uppercase())])?;
        self.send(request).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_users(&self, query: &UserQuery) -> Result<Page<AdminUser>, ApiError> {
        self.get_query("/api/v1/admin/users", query).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` without a reason; otherwise the backend's error.
    #[instrument(skip(self, ban), fields(user_id = %ban.user_id, duration = ?ban.duration))]
    pub async fn ban_user(&self, ban: &UserBan) -> Result<Value, ApiError> {
        required_reason(&ban.reason, "Lý do ban người dùng là bắt buộc")?;
        let value = self.post("/api/v1/admin/users/ban", ban).await?;
        info!("User banned");
        Ok(value)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn unban_user(&self, id: &UserId) -> Result<Value, ApiError> {
        self.delete(&format!("/api/v1/admin/users/unban/{}", segment(id.as_str())))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn user_ban_status(&self, id: &UserId) -> Result<BanStatus, ApiError> {
        self.get(&format!(
            "/api/v1/admin/users/{}/ban-status",
            segment(id.as_str())
        ))
        .await
    }

    // =========================================================================
    // Platform promotions
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_promotions(&self, page: &PageRequest) -> Result<Page<Promotion>, ApiError> {
        self.get_query("/api/v1/admin/promotions", page).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for an invalid promotion; otherwise the
    /// backend's error.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_platform_promotion(&self, input: &PromotionInput) -> Result<Promotion, ApiError> {
        input.validate()?;
        self.post("/api/v1/admin/promotions/platform", input).await
    }

    /// # Errors
    ///
    /// `ApiError::Validation` for an invalid promotion; otherwise the
    /// backend's error.
    #[instrument(skip(self, input), fields(promotion_id = %id))]
    pub async fn update_platform_promotion(&self, id: &PromotionId, input: &PromotionInput) -> Result<Promotion, ApiError> {
        input.validate()?;
        let path = format!("/api/v1/admin/promotions/platform/{}", segment(id.as_str()));
        self.put(&path, input).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(promotion_id = %id))]
    pub async fn activate_platform_promotion(&self, id: &PromotionId) -> Result<Value, ApiError> {
        self.put_empty(&admin_promotion(id, Some("activate"))).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(promotion_id = %id))]
    pub async fn deactivate_platform_promotion(&self, id: &PromotionId) -> Result<Value, ApiError> {
        self.put_empty(&admin_promotion(id, Some("deactivate"))).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(promotion_id = %id))]
    pub async fn delete_platform_promotion(&self, id: &PromotionId) -> Result<Value, ApiError> {
        self.delete(&admin_promotion(id, None)).await
    }

    // =========================================================================
    // Orders & statistics
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn admin_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.get(&format!("/api/v1/admin/orders/{}", segment(id.as_str())))
            .await
    }

    /// Dashboard figures. The shape varies between backend versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn statistics_overview(&self) -> Result<Value, ApiError> {
        self.get("/api/v1/admin/statistics/overview").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ban_body() {
        let ban = UserBan {
            user_id: UserId::new("u1"),
            reason: "spam".into(),
            duration: BanDuration::SevenDays,
        };
        assert_eq!(
            serde_json::to_value(&ban).unwrap(),
            json!({"userId": "u1", "reason": "spam", "duration": "SEVEN_DAYS"})
        );
    }

    #[test]
    fn test_reason_required() {
        assert!(required_reason("  ", "x").is_err());
        assert_eq!(required_reason(" fraud ", "x").unwrap(), "fraud");
    }

    #[test]
    fn test_user_query_skips_empty_filters() {
        let query = UserQuery {
            role: Some("SELLER".into()),
            ..UserQuery::default()
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["role"], "SELLER");
        assert!(json.get("status").is_none());
        assert_eq!(json["size"], 10);
    }

    #[test]
    fn test_admin_paths() {
        assert_eq!(
            admin_store(&StoreId::new("s 1"), "approve"),
            "/api/v1/admin/stores/s%201/approve"
        );
        assert_eq!(
            admin_promotion(&PromotionId::new("p1"), None),
            "/api/v1/admin/promotions/p1"
        );
    }

    #[test]
    fn test_ban_status_decodes() {
        let status: BanStatus =
            serde_json::from_value(json!({"isBanned": true, "reason": "spam"})).unwrap();
        assert!(status.is_banned);
    }
}
