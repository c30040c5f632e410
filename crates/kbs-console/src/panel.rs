//! The notification panel and what the console prints for backend messages.

use std::collections::BTreeMap;
use std::fmt::Write;

use kbs_bridge::MessageFromBackend;
use kbs_bridge::config::Config;
use kbs_bridge::notification::{NativeNotification, NotificationRecord};
use kbs_bridge::permission::PermissionState;
use kbs_bridge::work_entry::{EntryTotals, WorkEntry};

use crate::formatting::{format_rupees, format_timestamp, type_icon, unread_badge};

/// Frontend copy of the backend state it renders.
#[derive(Debug, Default)]
pub struct Panel {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
    pub permission: PermissionState,
    /// Whether a permission prompt waits for `allow` or `block`.
    pub prompt_pending: bool,
    /// Native alerts currently on screen, by tag.
    pub alerts: BTreeMap<String, NativeNotification>,
}

impl Panel {
    /// Applies a backend message and returns the text to print, if any.
    pub fn handle(&mut self, message: MessageFromBackend) -> Option<String> {
        match message {
            MessageFromBackend::NotificationMessage(notification) => Some(format!(
                "{} {}",
                type_icon(notification.notification_type),
                notification.message
            )),
            MessageFromBackend::NotificationsUpdate {
                notifications,
                unread_count,
            } => {
                let arrived = notifications.len() > self.notifications.len()
                    || notifications.first().map(|record| &record.id)
                        != self.notifications.first().map(|record| &record.id);
                self.notifications = notifications;
                self.unread_count = unread_count;
                arrived.then(|| self.render_bell())
            }
            MessageFromBackend::PermissionStateUpdate(permission) => {
                let changed = permission != self.permission;
                self.permission = permission;
                changed.then(|| render_permission(permission).to_string())
            }
            MessageFromBackend::PermissionPrompt => {
                self.prompt_pending = true;
                Some("KBS Earthmovers wants to show notifications. Type `allow` or `block`.".into())
            }
            MessageFromBackend::ShowNativeNotification(notification) => {
                let text = render_alert(&notification);
                self.alerts.insert(notification.tag.clone(), notification);
                Some(text)
            }
            MessageFromBackend::CloseNativeNotification(tag) => {
                if self.alerts.remove(&tag).is_some() {
                    log::debug!("Native notification {tag} closed");
                }
                None
            }
            MessageFromBackend::FocusWindow => Some("(window brought to front)".into()),
            MessageFromBackend::ConfigurationResponse(config) => Some(render_config(&config)),
            MessageFromBackend::WorkEntriesResponse { entries, totals } => {
                Some(render_entries(&entries, &totals))
            }
        }
    }

    /// The bell with its unread badge.
    pub fn render_bell(&self) -> String {
        match unread_badge(self.unread_count) {
            Some(badge) => format!("🔔 [{badge}]"),
            None => "🔔".to_string(),
        }
    }

    /// The full panel: header, list and permission settings.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} Notifications", self.render_bell());
        if self.unread_count > 0 {
            let _ = writeln!(out, "{} unread", self.unread_count);
        }

        if self.notifications.is_empty() {
            let _ = writeln!(out, "  No notifications yet");
        }
        for record in &self.notifications {
            out.push_str(&render_record(record));
        }

        out.push_str(render_permission(self.permission));
        out
    }
}

fn render_record(record: &NotificationRecord) -> String {
    let mut out = String::new();
    let marker = if record.read { " " } else { "•" };
    let _ = writeln!(
        out,
        "{marker} {} {}",
        type_icon(record.notification_type),
        record.title
    );
    let _ = writeln!(out, "    {}", record.message);
    if let Some(details) = &record.details {
        for change in details.changes() {
            let _ = writeln!(out, "    - {change}");
        }
    }
    let _ = writeln!(
        out,
        "    {}  id {}",
        format_timestamp(&record.timestamp),
        record.id
    );
    out
}

fn render_permission(permission: PermissionState) -> &'static str {
    match permission {
        PermissionState::Default => "Push notifications are off. Type `enable` to turn them on.",
        PermissionState::Granted => "Push notifications are enabled.",
        PermissionState::Denied => {
            "Push notifications are blocked. Allow them in the system settings to turn them on."
        }
    }
}

fn render_alert(notification: &NativeNotification) -> String {
    format!(
        "┌ {}\n│ {}\n└ click {} to open",
        notification.title, notification.body, notification.tag
    )
}

fn render_config(config: &Config) -> String {
    let backend = match config.backend.url.as_deref() {
        Some(url) if config.backend.credentials().is_some() => url,
        _ => "not configured",
    };
    format!(
        "Backend: {backend} ({}.{})\nNative notifications: {}\nAlerts close after {}s, confirmation after {}s",
        config.backend.schema,
        config.backend.table,
        if config.notifications.native_enabled {
            "supported"
        } else {
            "unsupported"
        },
        config.notifications.event_dismiss_secs,
        config.notifications.confirmation_dismiss_secs,
    )
}

fn render_entries(entries: &[WorkEntry], totals: &EntryTotals) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        let _ = writeln!(out, "No work entries found");
    }
    for entry in entries {
        let _ = writeln!(
            out,
            "{} {:<20} {:<16} {:<9} {:>5}h  total {}  received {}  advance {}  balance {}  [{}]",
            entry.date,
            entry.rental_person_name,
            entry.driver_name,
            entry.machine_type.to_string(),
            entry.hours_driven,
            format_rupees(entry.total_amount),
            format_rupees(entry.amount_received),
            format_rupees(entry.advance_amount),
            format_rupees(entry.balance()),
            entry.id.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(
        out,
        "{} entr(-y/-ies), {}h, total {}, received {}, advance {}, balance {}",
        entries.len(),
        totals.total_hours,
        format_rupees(totals.total_amount),
        format_rupees(totals.total_received),
        format_rupees(totals.total_advance),
        format_rupees(totals.total_balance),
    );
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kbs_bridge::notification::{NotificationMessage, NotificationType};

    use super::*;

    fn record(id: &str, read: bool) -> NotificationRecord {
        NotificationRecord {
            id: id.into(),
            title: "New Work Entry Created".into(),
            message: "Vignesh submitted a new JCB entry for Mr. Rao".into(),
            notification_type: NotificationType::Info,
            timestamp: Utc::now(),
            read,
            details: None,
        }
    }

    #[test]
    fn new_notifications_ring_the_bell() {
        let mut panel = Panel::default();
        let text = panel.handle(MessageFromBackend::NotificationsUpdate {
            notifications: vec![record("a", false)],
            unread_count: 1,
        });
        assert_eq!(text.as_deref(), Some("🔔 [1]"));

        // marking as read only updates the state
        let text = panel.handle(MessageFromBackend::NotificationsUpdate {
            notifications: vec![record("a", true)],
            unread_count: 0,
        });
        assert_eq!(text, None);
        assert_eq!(panel.render_bell(), "🔔");
    }

    #[test]
    fn panel_lists_records_and_permission() {
        let panel = Panel {
            notifications: vec![record("b", false), record("a", true)],
            unread_count: 1,
            permission: PermissionState::Denied,
            ..Panel::default()
        };

        let text = panel.render();
        assert!(text.starts_with("🔔 [1] Notifications\n1 unread\n"));
        assert!(text.contains("• ℹ New Work Entry Created"));
        assert!(text.contains("id b"));
        assert!(text.ends_with("Allow them in the system settings to turn them on."));
    }

    #[test]
    fn empty_panel() {
        let text = Panel::default().render();
        assert!(text.contains("No notifications yet"));
        assert!(text.contains("Type `enable`"));
    }

    #[test]
    fn tracks_native_alerts_and_prompts() {
        let mut panel = Panel::default();
        assert!(panel.handle(MessageFromBackend::PermissionPrompt).is_some());
        assert!(panel.prompt_pending);

        let alert = NativeNotification {
            title: "Notifications enabled".into(),
            body: "You will now receive push notifications for new work entries.".into(),
            icon: None,
            tag: "permission-confirmation".into(),
        };
        let text = panel
            .handle(MessageFromBackend::ShowNativeNotification(alert))
            .unwrap();
        assert!(text.contains("click permission-confirmation"));
        assert!(panel.alerts.contains_key("permission-confirmation"));

        panel.handle(MessageFromBackend::CloseNativeNotification(
            "permission-confirmation".into(),
        ));
        assert!(panel.alerts.is_empty());
    }

    #[test]
    fn inline_messages_carry_their_icon() {
        let mut panel = Panel::default();
        let text = panel.handle(MessageFromBackend::NotificationMessage(NotificationMessage {
            notification_type: NotificationType::Error,
            message: "Notification permission was denied. Please enable it in your settings."
                .into(),
        }));
        assert_eq!(
            text.as_deref(),
            Some("✖ Notification permission was denied. Please enable it in your settings.")
        );
    }
}
