use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Machines available for rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum MachineType {
    #[serde(rename = "JCB")]
    Jcb,
    Tractor,
    Harvester,
}

impl std::str::FromStr for MachineType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jcb" => Ok(Self::Jcb),
            "tractor" => Ok(Self::Tractor),
            "harvester" => Ok(Self::Harvester),
            other => Err(format!("unknown machine type `{other}`")),
        }
    }
}

impl std::fmt::Display for MachineType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Jcb => "JCB",
            Self::Tractor => "Tractor",
            Self::Harvester => "Harvester",
        };
        formatter.write_str(label)
    }
}

/// Who submitted the entry: a driver from the field form or an admin from
/// the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    #[default]
    Driver,
    Admin,
}

/// Numeric columns are nullable in the table; a `null` counts as zero.
fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// A billable rental job, one row of the `work_entries` table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub rental_person_name: String,
    pub driver_name: String,
    pub machine_type: MachineType,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub hours_driven: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub amount_received: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub advance_amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl WorkEntry {
    /// Amount still owed for this entry.
    pub fn balance(&self) -> f64 {
        self.total_amount - self.amount_received - self.advance_amount
    }
}

/// Dashboard tab selecting entries by who submitted them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryTab {
    #[default]
    All,
    Driver,
    Admin,
}

/// Client-side filter applied to the fetched entries. Unset fields match
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub tab: EntryTab,
    /// Inclusive lower bound on the entry date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the entry date.
    pub date_to: Option<NaiveDate>,
    pub machine_type: Option<MachineType>,
    /// Case-insensitive substring of the driver name.
    pub driver: Option<String>,
    /// Case-insensitive substring of the client or the driver name.
    pub search: Option<String>,
}

/// Sums over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntryTotals {
    pub total_amount: f64,
    pub total_received: f64,
    pub total_advance: f64,
    pub total_hours: f64,
    pub total_balance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_amounts_count_as_zero() {
        let entry: WorkEntry = serde_json::from_str(
            r#"{
                "id": "7",
                "rental_person_name": "Mr. Rao",
                "driver_name": "Vignesh",
                "machine_type": "JCB",
                "hours_driven": null,
                "total_amount": 4500,
                "amount_received": null,
                "date": "2024-05-03",
                "time": null,
                "entry_type": "admin"
            }"#,
        )
        .unwrap();

        assert_eq!(entry.hours_driven, 0.0);
        assert_eq!(entry.amount_received, 0.0);
        assert_eq!(entry.advance_amount, 0.0);
        assert_eq!(entry.balance(), 4500.0);
        assert_eq!(entry.entry_type, EntryType::Admin);
    }
}
