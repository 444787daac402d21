//! Notification rows and the drafts produced by the policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reminder,
    Alert,
    Info,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reminder => "reminder",
            NotificationKind::Alert => "alert",
            NotificationKind::Info => "info",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reminder" => Ok(NotificationKind::Reminder),
            "alert" => Ok(NotificationKind::Alert),
            "info" => Ok(NotificationKind::Info),
            _ => Err(CoreError::UnknownVariant {
                kind: "notification type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Calendar,
    Budget,
    Family,
    System,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Calendar => "calendar",
            NotificationCategory::Budget => "budget",
            NotificationCategory::Family => "family",
            NotificationCategory::System => "system",
        }
    }
}

impl FromStr for NotificationCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" => Ok(NotificationCategory::Calendar),
            "budget" => Ok(NotificationCategory::Budget),
            "family" => Ok(NotificationCategory::Family),
            "system" => Ok(NotificationCategory::System),
            _ => Err(CoreError::UnknownVariant {
                kind: "notification category",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    /// Free text; doubles as the compatibility dedup key.
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

/// Everything needed to write a notification except owner and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

impl NotificationDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::MissingField("title"));
        }
        if self.message.trim().is_empty() {
            return Err(CoreError::MissingField("message"));
        }
        Ok(())
    }
}
