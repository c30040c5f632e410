//! Turns row changes on the work entries table into notification
//! descriptors.
//!
//! The change feed carries no identity of the admin who edited or deleted a
//! row, so updates and deletes are attributed to a fixed label. Missing
//! columns render as empty text.

use kbs_bridge::notification::{
    NotificationAction, NotificationDescriptor, NotificationDetails, NotificationType,
    PerformerType,
};
use kbs_supabase::{ChangeEvent, RowChange, RowSnapshot};
use serde_json::{Map, Value};

/// Attribution used when the performer is an unidentified admin.
pub const ADMIN_PERFORMER: &str = "Admin User";

/// Numeric columns compared on update: column and display label, plus
/// whether the value is a rupee amount.
const TRACKED_FIELDS: [(&str, &str, bool); 4] = [
    ("hours_driven", "Hours", false),
    ("total_amount", "Total", true),
    ("amount_received", "Received", true),
    ("advance_amount", "Advance", true),
];

/// A row change as seen by the notification system.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkEntryChange {
    pub action: NotificationAction,
    pub performer: String,
    pub performer_type: PerformerType,
    pub old_row: Option<RowSnapshot>,
    pub new_row: Option<RowSnapshot>,
}

impl WorkEntryChange {
    pub fn from_row_change(change: &RowChange) -> Self {
        match change.event {
            ChangeEvent::Insert => Self {
                action: NotificationAction::Created,
                performer: text(&change.new, "driver_name"),
                performer_type: entry_type(&change.new),
                old_row: None,
                new_row: Some(change.new.clone()),
            },
            ChangeEvent::Update => Self {
                action: NotificationAction::Updated,
                performer: ADMIN_PERFORMER.to_string(),
                performer_type: PerformerType::Admin,
                old_row: change.old.clone(),
                new_row: Some(change.new.clone()),
            },
            ChangeEvent::Delete => Self {
                action: NotificationAction::Deleted,
                performer: ADMIN_PERFORMER.to_string(),
                performer_type: PerformerType::Admin,
                old_row: change.old.clone(),
                new_row: None,
            },
        }
    }

    /// Builds the notification announcing this change.
    pub fn describe(self) -> NotificationDescriptor {
        let empty = RowSnapshot::new();
        let old = self.old_row.as_ref().unwrap_or(&empty);
        let new = self.new_row.as_ref().unwrap_or(&empty);

        let (notification_type, title, message, entry_data) = match self.action {
            NotificationAction::Created => (
                NotificationType::Info,
                "New Work Entry Created",
                format!(
                    "{} submitted a new {} entry for {}",
                    text(new, "driver_name"),
                    text(new, "machine_type"),
                    text(new, "rental_person_name"),
                ),
                snapshot(
                    new,
                    &[
                        ("rentalPerson", "rental_person_name"),
                        ("machineType", "machine_type"),
                        ("hours", "hours_driven"),
                        ("totalAmount", "total_amount"),
                        ("date", "date"),
                        ("time", "time"),
                    ],
                ),
            ),
            NotificationAction::Updated => {
                let mut data = snapshot(
                    new,
                    &[
                        ("rentalPerson", "rental_person_name"),
                        ("machineType", "machine_type"),
                        ("driver", "driver_name"),
                    ],
                );
                let changes = field_changes(old, new).into_iter().map(Value::from).collect();
                data.insert("changes".to_string(), Value::Array(changes));
                (
                    NotificationType::Info,
                    "Work Entry Updated",
                    format!(
                        "Entry for {} has been updated by admin",
                        text(new, "rental_person_name")
                    ),
                    data,
                )
            }
            NotificationAction::Deleted => (
                NotificationType::Warning,
                "Work Entry Deleted",
                format!(
                    "Entry for {} has been deleted by admin",
                    text(old, "rental_person_name")
                ),
                snapshot(
                    old,
                    &[
                        ("rentalPerson", "rental_person_name"),
                        ("machineType", "machine_type"),
                        ("driver", "driver_name"),
                        ("date", "date"),
                    ],
                ),
            ),
        };

        NotificationDescriptor::new(notification_type, title, message).with_details(
            NotificationDetails {
                action: self.action,
                performer: self.performer,
                performer_type: self.performer_type,
                entry_data: Some(entry_data),
            },
        )
    }
}

/// Summarizes one row change.
pub fn summarize(change: &RowChange) -> NotificationDescriptor {
    WorkEntryChange::from_row_change(change).describe()
}

/// Lists the tracked numeric columns that differ between `old` and `new` as
/// `"Label: old → new"` strings, in a fixed order.
pub fn field_changes(old: &RowSnapshot, new: &RowSnapshot) -> Vec<String> {
    TRACKED_FIELDS
        .iter()
        .filter(|(column, _, _)| old.get(*column) != new.get(*column))
        .map(|(column, label, is_amount)| {
            let currency = if *is_amount { "₹" } else { "" };
            format!(
                "{label}: {currency}{} → {currency}{}",
                text(old, column),
                text(new, column)
            )
        })
        .collect()
}

/// Notification for an entry the admin deleted from the dashboard.
pub fn entry_deleted() -> NotificationDescriptor {
    NotificationDescriptor::new(
        NotificationType::Success,
        "Entry Deleted",
        "Work entry has been deleted successfully.",
    )
}

/// Notification for a failed delete from the dashboard.
pub fn delete_failed(reason: &str) -> NotificationDescriptor {
    NotificationDescriptor::new(
        NotificationType::Error,
        "Delete Failed",
        format!("Error deleting entry: {reason}"),
    )
}

/// Notification for an entry the admin created from the dashboard.
pub fn entry_created() -> NotificationDescriptor {
    NotificationDescriptor::new(
        NotificationType::Success,
        "Entry Created",
        "New work entry has been created successfully.",
    )
}

/// Notification for an entry the admin edited from the dashboard.
pub fn entry_updated() -> NotificationDescriptor {
    NotificationDescriptor::new(
        NotificationType::Success,
        "Entry Updated",
        "Work entry has been updated successfully.",
    )
}

pub fn save_failed(reason: &str) -> NotificationDescriptor {
    NotificationDescriptor::new(
        NotificationType::Error,
        "Save Failed",
        format!("Error saving entry: {reason}"),
    )
}

/// Renders a column for display. Strings are shown without quotes; missing
/// and null columns are empty.
fn text(row: &RowSnapshot, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(value)) => value.clone(),
        Some(value) => value.to_string(),
    }
}

fn entry_type(row: &RowSnapshot) -> PerformerType {
    match row.get("entry_type").and_then(Value::as_str) {
        Some("admin") => PerformerType::Admin,
        _ => PerformerType::Driver,
    }
}

/// Copies the given columns under new keys. Missing columns become `null`.
fn snapshot(row: &RowSnapshot, keys: &[(&str, &str)]) -> Map<String, Value> {
    keys.iter()
        .map(|(key, column)| {
            let value = row.get(*column).cloned().unwrap_or(Value::Null);
            (key.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> RowSnapshot {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn change(event: ChangeEvent, new: Value, old: Option<Value>) -> RowChange {
        RowChange {
            event,
            table: "work_entries".into(),
            new: row(new),
            old: old.map(row),
        }
    }

    #[test]
    fn insert_names_driver_machine_and_client() {
        let descriptor = summarize(&change(
            ChangeEvent::Insert,
            json!({"driver_name": "Vignesh", "machine_type": "JCB", "rental_person_name": "Mr. Rao"}),
            None,
        ));

        assert_eq!(descriptor.title, "New Work Entry Created");
        assert_eq!(descriptor.notification_type, NotificationType::Info);
        assert_eq!(descriptor.message, "Vignesh submitted a new JCB entry for Mr. Rao");

        let details = descriptor.details.unwrap();
        assert_eq!(details.action, NotificationAction::Created);
        assert_eq!(details.performer, "Vignesh");
        assert_eq!(details.performer_type, PerformerType::Driver);
        let data = details.entry_data.unwrap();
        assert_eq!(data["rentalPerson"], "Mr. Rao");
        assert_eq!(data["hours"], Value::Null);
    }

    #[test]
    fn insert_uses_recorded_entry_type() {
        let descriptor = summarize(&change(
            ChangeEvent::Insert,
            json!({"driver_name": "Mohan", "entry_type": "admin", "hours_driven": 3.5}),
            None,
        ));

        let details = descriptor.details.unwrap();
        assert_eq!(details.performer_type, PerformerType::Admin);
        assert_eq!(details.entry_data.unwrap()["hours"], 3.5);
    }

    #[test]
    fn update_lists_only_changed_fields() {
        let descriptor = summarize(&change(
            ChangeEvent::Update,
            json!({
                "rental_person_name": "Mr. Rao", "hours_driven": 4,
                "total_amount": 6000, "amount_received": 1000, "advance_amount": 500
            }),
            Some(json!({
                "rental_person_name": "Mr. Rao", "hours_driven": 4,
                "total_amount": 5000, "amount_received": 1000, "advance_amount": 500
            })),
        ));

        assert_eq!(descriptor.title, "Work Entry Updated");
        assert_eq!(descriptor.message, "Entry for Mr. Rao has been updated by admin");
        let details = descriptor.details.unwrap();
        assert_eq!(details.performer, ADMIN_PERFORMER);
        assert_eq!(details.performer_type, PerformerType::Admin);
        assert_eq!(details.changes(), vec!["Total: ₹5000 → ₹6000"]);
    }

    #[test]
    fn field_changes_keep_fixed_order() {
        let old = row(json!({"hours_driven": 2, "advance_amount": 0}));
        let new = row(json!({"hours_driven": 3, "advance_amount": 100}));

        assert_eq!(
            field_changes(&old, &new),
            vec!["Hours: 2 → 3", "Advance: ₹0 → ₹100"]
        );
        assert!(field_changes(&new, &new).is_empty());
    }

    #[test]
    fn delete_is_a_warning_about_the_old_row() {
        let descriptor = summarize(&change(
            ChangeEvent::Delete,
            json!({}),
            Some(json!({
                "rental_person_name": "Mr. Rao", "machine_type": "Tractor",
                "driver_name": "Sakthi", "date": "2024-05-01"
            })),
        ));

        assert_eq!(descriptor.title, "Work Entry Deleted");
        assert_eq!(descriptor.notification_type, NotificationType::Warning);
        assert_eq!(descriptor.message, "Entry for Mr. Rao has been deleted by admin");
        let details = descriptor.details.unwrap();
        assert_eq!(details.action, NotificationAction::Deleted);
        let data = details.entry_data.unwrap();
        assert_eq!(data["driver"], "Sakthi");
        assert_eq!(data["date"], "2024-05-01");
    }

    #[test]
    fn missing_fields_render_blank() {
        let descriptor = summarize(&change(ChangeEvent::Delete, json!({}), None));
        assert_eq!(descriptor.message, "Entry for  has been deleted by admin");
    }

    #[test]
    fn dashboard_outcomes_carry_no_details() {
        let created = entry_created();
        assert_eq!(created.title, "Entry Created");
        assert_eq!(created.notification_type, NotificationType::Success);
        assert!(created.details.is_none());

        assert_eq!(entry_updated().message, "Work entry has been updated successfully.");

        let failed = save_failed("duplicate key");
        assert_eq!(failed.notification_type, NotificationType::Error);
        assert_eq!(failed.message, "Error saving entry: duplicate key");
    }
}
