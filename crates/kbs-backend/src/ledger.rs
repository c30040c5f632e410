//! Filtering and totals over fetched work entries, and the rows written
//! when an admin saves one.

use chrono::{DateTime, NaiveTime, Utc};
use kbs_bridge::work_entry::{EntryFilter, EntryTab, EntryTotals, EntryType, WorkEntry};
use serde_json::{Map, Value};

/// Columns an admin may set from the dashboard.
const EDITABLE_COLUMNS: [&str; 9] = [
    "rental_person_name",
    "driver_name",
    "machine_type",
    "hours_driven",
    "total_amount",
    "amount_received",
    "advance_amount",
    "date",
    "time",
];

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Returns whether `entry` passes every condition set in `filter`.
pub fn matches(entry: &WorkEntry, filter: &EntryFilter) -> bool {
    let tab_matches = match filter.tab {
        EntryTab::All => true,
        EntryTab::Driver => entry.entry_type == EntryType::Driver,
        EntryTab::Admin => entry.entry_type == EntryType::Admin,
    };

    tab_matches
        && filter.date_from.is_none_or(|from| entry.date >= from)
        && filter.date_to.is_none_or(|to| entry.date <= to)
        && filter
            .machine_type
            .is_none_or(|machine| entry.machine_type == machine)
        && filter
            .driver
            .as_deref()
            .is_none_or(|driver| contains_ignore_case(&entry.driver_name, driver))
        && filter.search.as_deref().is_none_or(|search| {
            contains_ignore_case(&entry.rental_person_name, search)
                || contains_ignore_case(&entry.driver_name, search)
        })
}

/// Keeps the entries matching `filter`, preserving their order.
pub fn filter_entries(entries: Vec<WorkEntry>, filter: &EntryFilter) -> Vec<WorkEntry> {
    entries
        .into_iter()
        .filter(|entry| matches(entry, filter))
        .collect()
}

pub fn totals(entries: &[WorkEntry]) -> EntryTotals {
    entries
        .iter()
        .fold(EntryTotals::default(), |totals, entry| EntryTotals {
            total_amount: totals.total_amount + entry.total_amount,
            total_received: totals.total_received + entry.amount_received,
            total_advance: totals.total_advance + entry.advance_amount,
            total_hours: totals.total_hours + entry.hours_driven,
            total_balance: totals.total_balance + entry.balance(),
        })
}

fn editable_columns(entry: &WorkEntry) -> Result<Map<String, Value>, serde_json::Error> {
    let Value::Object(mut row) = serde_json::to_value(entry)? else {
        return Ok(Map::new());
    };
    row.retain(|column, _| EDITABLE_COLUMNS.contains(&column.as_str()));
    Ok(row)
}

/// Row inserted for an entry created from the dashboard. It is marked as an
/// admin entry and takes the current time of day when none was given.
pub fn new_admin_row(entry: &WorkEntry, now: NaiveTime) -> Result<Map<String, Value>, serde_json::Error> {
    let mut row = editable_columns(entry)?;
    if entry.time.as_deref().is_none_or(str::is_empty) {
        row.insert("time".to_string(), Value::from(now.format("%H:%M").to_string()));
    }
    row.insert("entry_type".to_string(), serde_json::to_value(EntryType::Admin)?);
    Ok(row)
}

/// Changes written for an edited entry, stamped with `updated_at`.
pub fn update_row(entry: &WorkEntry, now: DateTime<Utc>) -> Result<Map<String, Value>, serde_json::Error> {
    let mut row = editable_columns(entry)?;
    row.insert("updated_at".to_string(), Value::from(now.to_rfc3339()));
    Ok(row)
}
