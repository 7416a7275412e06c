use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    MonthCompleted,
    NewBillCycle,
    PaymentPending,
    PaymentReceived,
    RemarkAdded,
}

/// An in-app notice addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub is_read: Option<bool>,
}

impl NotificationPatch {
    pub fn mark_read() -> Self {
        Self {
            is_read: Some(true),
            ..Default::default()
        }
    }

    pub fn apply(&self, notification: &mut Notification) {
        if let Some(title) = &self.title {
            notification.title = title.clone();
        }
        if let Some(message) = &self.message {
            notification.message = message.clone();
        }
        if let Some(is_read) = self.is_read {
            notification.is_read = is_read;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Template,
    System,
}

/// A direct message from one user to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

/// One party's rating of the other at the end of a stay. At most one per
/// (reviewer, stay).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub stay_id: String,
    /// Stars, from [`Review::MIN_RATING`] to [`Review::MAX_RATING`].
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;

    pub fn has_valid_rating(&self) -> bool {
        (Self::MIN_RATING..=Self::MAX_RATING).contains(&self.rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_defaults_to_text() {
        let json = serde_json::json!({
            "id": "m1",
            "senderId": "a",
            "receiverId": "b",
            "content": "hi",
            "timestamp": "2025-12-01T10:00:00Z",
            "isRead": false
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
    }

    #[test]
    fn mark_read_patch_touches_only_flag() {
        let mut n = Notification {
            id: "n1".into(),
            user_id: "u1".into(),
            role: Role::Tenant,
            title: "Bill".into(),
            message: "New bill".into(),
            kind: NotificationKind::NewBillCycle,
            is_read: false,
            created_at: Utc::now(),
        };
        NotificationPatch::mark_read().apply(&mut n);
        assert!(n.is_read);
        assert_eq!(n.title, "Bill");
    }
}
