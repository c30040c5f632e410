use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity or category for user-visible notifications.
///
/// This enum classifies notifications by their intent and visual styling,
/// allowing the UI to display them appropriately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Indicates a successful operation or positive outcome.
    Success,
    /// Neutral informational message that does not indicate success or failure.
    Info,
    /// Indicates a non-critical issue that the user should be aware of, but
    /// does not prevent normal operation.
    Warning,
    /// Indicates an error or failure that may affect functionality.
    Error,
}

/// A transient inline message for the user interface. Unlike
/// [`NotificationRecord`] it is never stored in the notification list.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// The type/severity of the notification, determining its visual style.
    pub notification_type: NotificationType,
    /// The text content to display to the user.
    pub message: String,
}

/// What happened to the work entry a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Created,
    Updated,
    Deleted,
}

/// Who performed the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformerType {
    #[default]
    Driver,
    Admin,
}

/// Structured payload attached to notifications produced from work entry
/// changes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDetails {
    pub action: NotificationAction,
    pub performer: String,
    pub performer_type: PerformerType,
    /// Free-form snapshot of the affected row. Updates also carry a
    /// `changes` array of `"Field: old → new"` strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_data: Option<Map<String, Value>>,
}

impl NotificationDetails {
    /// Returns the human-readable field changes recorded for an update, if
    /// any.
    pub fn changes(&self) -> Vec<&str> {
        self.entry_data
            .as_ref()
            .and_then(|data| data.get("changes"))
            .and_then(Value::as_array)
            .map(|changes| changes.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Everything a caller provides to create a notification. The store fills
/// in the identifier, the timestamp and the read flag.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDescriptor {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub details: Option<NotificationDetails>,
}

impl NotificationDescriptor {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type,
            details: None,
        }
    }

    pub fn with_details(mut self, details: NotificationDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// A notification kept in the notification panel.
///
/// Everything except `read` is fixed at creation. `read` only ever goes from
/// `false` to `true`, and only through the notification store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<NotificationDetails>,
}

/// A native alert shown outside of the application panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeNotification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    /// Identifies the alert so it can be closed or clicked later.
    pub tag: String,
}
