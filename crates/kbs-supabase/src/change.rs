use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row as delivered by the change feed: column name to JSON value.
pub type RowSnapshot = Map<String, Value>;

/// Kind of row-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        formatter.write_str(label)
    }
}

/// Selects which changes a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub event: ChangeEvent,
    pub schema: String,
    pub table: String,
}

impl ChangeFilter {
    pub fn new(event: ChangeEvent, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            event,
            schema: schema.into(),
            table: table.into(),
        }
    }
}

/// One row change delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub event: ChangeEvent,
    pub table: String,
    /// The row after the change. Empty for deletes.
    pub new: RowSnapshot,
    /// The row before the change. Only present for updates and deletes, and
    /// only carries every column when the table replicates full rows.
    pub old: Option<RowSnapshot>,
}
