//! Phoenix channel messages spoken by the realtime socket.
//!
//! Every frame is a JSON object `{topic, event, payload, ref, join_ref}`.
//! Channels are joined with `phx_join`, left with `phx_leave`, and the socket
//! is kept alive with `heartbeat` on the `phoenix` topic. Row changes arrive
//! as `postgres_changes` events on the channel topic.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::SupabaseError;
use crate::change::{ChangeEvent, ChangeFilter, RowChange, RowSnapshot};

pub const PHOENIX_TOPIC: &str = "phoenix";
pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";
pub const EVENT_SYSTEM: &str = "system";

/// A single frame on the realtime socket.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

/// Topic name for a logical channel.
pub fn channel_topic(channel: &str) -> String {
    format!("realtime:{channel}")
}

/// Builds the join frame asking for the row changes selected by `filter`.
pub fn join_message(
    topic: &str,
    filter: &ChangeFilter,
    access_token: &str,
    reference: &str,
) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_JOIN.to_string(),
        payload: json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": filter.event.to_string(),
                    "schema": filter.schema,
                    "table": filter.table,
                }],
            },
            "access_token": access_token,
        }),
        reference: Some(reference.to_string()),
        join_ref: Some(reference.to_string()),
    }
}

pub fn leave_message(topic: &str, reference: &str) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_LEAVE.to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
        join_ref: None,
    }
}

pub fn heartbeat_message(reference: &str) -> PhoenixMessage {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_string(),
        event: EVENT_HEARTBEAT.to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
        join_ref: None,
    }
}

/// Returns the `status` of a `phx_reply` payload (`ok` or `error`).
pub fn reply_status(payload: &Value) -> Option<&str> {
    payload.get("status").and_then(Value::as_str)
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    event: ChangeEvent,
    #[serde(default)]
    table: String,
    #[serde(default)]
    record: Option<RowSnapshot>,
    #[serde(default)]
    old_record: Option<RowSnapshot>,
}

/// Decodes the payload of a `postgres_changes` frame.
pub fn decode_change(payload: &Value) -> Result<RowChange, SupabaseError> {
    let data = payload
        .get("data")
        .ok_or_else(|| SupabaseError::Protocol("change payload has no `data`".to_string()))?;
    let data = ChangeData::deserialize(data)?;

    Ok(RowChange {
        event: data.event,
        table: data.table,
        new: data.record.unwrap_or_default(),
        old: data.old_record.filter(|old| !old.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_message_carries_postgres_changes_config() {
        let filter = ChangeFilter::new(ChangeEvent::Update, "public", "work_entries");
        let message = join_message("realtime:work_entries_update", &filter, "anon", "3");
        let encoded = serde_json::to_value(&message).unwrap();

        assert_eq!(encoded["event"], "phx_join");
        assert_eq!(encoded["ref"], "3");
        assert_eq!(encoded["join_ref"], "3");
        let change = &encoded["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "UPDATE");
        assert_eq!(change["schema"], "public");
        assert_eq!(change["table"], "work_entries");
        assert_eq!(encoded["payload"]["access_token"], "anon");
    }

    #[test]
    fn decodes_update_with_old_record() {
        let frame: PhoenixMessage = serde_json::from_str(
            r#"{
                "topic": "realtime:work_entries_update",
                "event": "postgres_changes",
                "payload": {
                    "ids": [12],
                    "data": {
                        "type": "UPDATE",
                        "schema": "public",
                        "table": "work_entries",
                        "commit_timestamp": "2024-05-01T10:30:00Z",
                        "record": {"id": "a1", "total_amount": 6000},
                        "old_record": {"id": "a1", "total_amount": 5000}
                    }
                },
                "ref": null
            }"#,
        )
        .unwrap();

        let change = decode_change(&frame.payload).unwrap();
        assert_eq!(change.event, ChangeEvent::Update);
        assert_eq!(change.table, "work_entries");
        assert_eq!(change.new["total_amount"], 6000);
        assert_eq!(change.old.unwrap()["total_amount"], 5000);
        assert_eq!(frame.reference, None);
    }

    #[test]
    fn decodes_delete_without_record() {
        let payload = json!({
            "data": {
                "type": "DELETE",
                "table": "work_entries",
                "old_record": {"id": "a1", "rental_person_name": "Mr. Rao"}
            }
        });

        let change = decode_change(&payload).unwrap();
        assert_eq!(change.event, ChangeEvent::Delete);
        assert!(change.new.is_empty());
        assert_eq!(change.old.unwrap()["rental_person_name"], "Mr. Rao");
    }

    #[test]
    fn rejects_payload_without_data() {
        let error = decode_change(&json!({"ids": []})).unwrap_err();
        assert!(matches!(error, SupabaseError::Protocol(_)));
    }
}
