//! In-app notifications for buyers, stores and admins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::time::{format_date_vn, opt_timestamp};
use crate::types::{NotificationId, NotificationKind, OrderId};

/// A notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub message: String,
    #[serde(rename = "type", default = "unknown_kind")]
    pub kind: NotificationKind,
    #[serde(default, alias = "read")]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, with = "opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

const fn unknown_kind() -> NotificationKind {
    NotificationKind::Unknown
}

impl Notification {
    /// Short marker for terminal output.
    #[must_use]
    pub const fn icon(&self) -> &'static str {
        match self.kind {
            NotificationKind::Order => "📦",
            NotificationKind::Payment => "💳",
            NotificationKind::Shipping => "🚚",
            NotificationKind::Promotion => "🎁",
            NotificationKind::System => "🔔",
            NotificationKind::Review => "⭐",
            NotificationKind::Unknown => "📢",
        }
    }
}

/// Filter for notification listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
}

impl Default for NotificationQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            is_read: None,
        }
    }
}

impl NotificationQuery {
    #[must_use]
    pub const fn unread() -> Self {
        Self {
            page: 0,
            size: 10,
            is_read: Some(false),
        }
    }
}

#[must_use]
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

/// "Vừa xong", "5 phút trước", ... and the plain date after a week.
#[must_use]
pub fn relative_time(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - created;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Vừa xong".to_owned()
    } else if minutes < 60 {
        format!("{minutes} phút trước")
    } else if hours < 24 {
        format!("{hours} giờ trước")
    } else if days < 7 {
        format!("{days} ngày trước")
    } else {
        format_date_vn(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    #[test]
    fn test_notification_decode() {
        let n: Notification = serde_json::from_value(json!({
            "id": 7,
            "title": "Đơn hàng đã giao",
            "content": "Đơn #12 đã được giao",
            "type": "order",
            "read": true,
            "orderId": "12",
            "createdAt": "2024-05-01T08:00:00"
        }))
        .unwrap();
        assert_eq!(n.id.as_str(), "7");
        assert_eq!(n.kind, NotificationKind::Order);
        assert!(n.is_read);
        assert_eq!(n.message, "Đơn #12 đã được giao");
        assert_eq!(n.icon(), "📦");

        let bare: Notification = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(bare.kind, NotificationKind::Unknown);
        assert!(!bare.is_read);
        assert!(bare.created_at.is_none());
    }

    #[test]
    fn test_unread_count() {
        let list: Vec<Notification> = serde_json::from_value(json!([
            {"id": 1, "isRead": false},
            {"id": 2, "isRead": true},
            {"id": 3}
        ]))
        .unwrap();
        assert_eq!(unread_count(&list), 2);
        assert_eq!(unread_count(&[]), 0);
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now - Duration::seconds(30), now), "Vừa xong");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5 phút trước");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3 giờ trước");
        assert_eq!(relative_time(now - Duration::days(6), now), "6 ngày trước");
        assert_eq!(relative_time(now - Duration::days(10), now), "10/05/2024");
    }

    #[test]
    fn test_query_params() {
        let json = serde_json::to_value(NotificationQuery::default()).unwrap();
        assert!(json.get("isRead").is_none());
        let json = serde_json::to_value(NotificationQuery::unread()).unwrap();
        assert_eq!(json["isRead"], false);
    }
}
