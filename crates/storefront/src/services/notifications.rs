//! Notification inboxes. Buyers, stores and admins each have one, with the
//! same operations under different paths.

use marketplace_core::notification::{Notification, NotificationQuery};
use marketplace_core::pagination::Page;
use marketplace_core::{NotificationId, StoreId};
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, segment};
use crate::error::ApiError;

/// Whose inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbox {
    Buyer,
    Store(StoreId),
    Admin,
}

impl Inbox {
    fn base(&self) -> String {
        match self {
            Self::Buyer => "/api/v1/buyer/notifications".to_owned(),
            Self::Store(id) => format!("/api/v1/b2c/stores/{}/notifications", segment(id.as_str())),
            Self::Admin => "/api/v1/admin/notifications".to_owned(),
        }
    }

    fn item(&self, id: &NotificationId) -> String {
        format!("{}/{}", self.base(), segment(id.as_str()))
    }

    fn read_all(&self) -> String {
        match self {
            Self::Admin => format!("{}/mark-all-read", self.base()),
            _ => format!("{}/read-all", self.base()),
        }
    }
}

/// The unread counter comes back as a bare number or as `{count}`.
fn count_from(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| {
            ["count", "unreadCount"]
                .iter()
                .find_map(|k| value.get(*k)?.as_u64())
        })
        .unwrap_or(0)
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn notifications(&self, inbox: &Inbox, query: &NotificationQuery) -> Result<Page<Notification>, ApiError> {
        self.get_query(&inbox.base(), query).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn unread_notifications(&self, inbox: &Inbox) -> Result<u64, ApiError> {
        let value: Value = self
            .get(&format!("{}/unread-count", inbox.base()))
            .await?;
        Ok(count_from(&value))
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn mark_notification_read(&self, inbox: &Inbox, id: &NotificationId) -> Result<(), ApiError> {
        self.put_empty::<Value>(&format!("{}/read", inbox.item(id)))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self, inbox: &Inbox) -> Result<(), ApiError> {
        self.put_empty::<Value>(&inbox.read_all()).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn delete_notification(&self, inbox: &Inbox, id: &NotificationId) -> Result<(), ApiError> {
        self.delete::<Value>(&inbox.item(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbox_paths() {
        let id = NotificationId::new("n1");
        assert_eq!(Inbox::Buyer.item(&id), "/api/v1/buyer/notifications/n1");
        assert_eq!(
            Inbox::Store(StoreId::new("s1")).read_all(),
            "/api/v1/b2c/stores/s1/notifications/read-all"
        );
        assert_eq!(Inbox::Admin.read_all(), "/api/v1/admin/notifications/mark-all-read");
    }

    #[test]
    fn test_count_shapes() {
        assert_eq!(count_from(&json!(3)), 3);
        assert_eq!(count_from(&json!({"count": 4})), 4);
        assert_eq!(count_from(&json!({"unreadCount": 5})), 5);
        assert_eq!(count_from(&json!({"success": true})), 0);
    }
}
