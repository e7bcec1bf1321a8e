// Stored record shapes: what actually lands in the backend
//
// Records carry their own keys plus the attributes the secondary indexes are
// declared over. Timestamps are epoch milliseconds; optional attributes are
// omitted entirely when absent, so "null" and "missing" never diverge.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use flowstate_core::{RunStatus, StepStatus, StoreError};

use crate::driver::Item;
use crate::keys::EntityKind;

/// Current wall-clock time in epoch milliseconds
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Serialize a record into a backend item
pub(crate) fn to_item<T: Serialize>(record: &T) -> Result<Item, StoreError> {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::serialization(
            "record did not serialize to an object",
        )),
        Err(err) => Err(StoreError::serialization(err.to_string())),
    }
}

/// Serialize one attribute value for a patch
pub(crate) fn attr<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|err| StoreError::serialization(err.to_string()))
}

/// Deserialize a backend item into a record
pub(crate) fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::Object(item))
        .map_err(|err| StoreError::serialization(err.to_string()))
}

/// Stored shape of a run's metadata record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub group_key: String,
    pub discriminator_key: String,
    pub entity_type: EntityKind,
    pub run_id: String,
    pub workflow_name: String,
    pub input: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub execution_context: Option<serde_json::Value>,
    pub deployment_id: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_code: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_at_ms: Option<i64>,
}

/// Stored shape of a step record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub group_key: String,
    pub discriminator_key: String,
    pub entity_type: EntityKind,
    pub step_id: String,
    pub run_id: String,
    pub step_name: String,
    pub input: serde_json::Value,
    pub status: StepStatus,
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_code: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_at_ms: Option<i64>,
}

/// Stored shape of a hook record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookRecord {
    pub group_key: String,
    pub discriminator_key: String,
    pub entity_type: EntityKind,
    pub hook_id: String,
    pub run_id: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub environment_id: Option<String>,
    pub created_at_ms: i64,
}

/// Stored shape of an event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub group_key: String,
    pub discriminator_key: String,
    pub entity_type: EntityKind,
    pub event_id: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<serde_json::Value>,
    pub created_at_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    #[test]
    fn absent_optionals_are_omitted_from_items() {
        let record = EventRecord {
            group_key: keys::run_group_key("run_1"),
            discriminator_key: keys::event_key("evt_1"),
            entity_type: EntityKind::Event,
            event_id: "evt_1".to_string(),
            run_id: "run_1".to_string(),
            correlation_id: None,
            event_type: "step.started".to_string(),
            payload: None,
            created_at_ms: 1_733_000_000_000,
        };
        let item = to_item(&record).unwrap();
        assert!(!item.contains_key("correlation_id"));
        assert!(!item.contains_key("payload"));
        assert_eq!(
            item.get("entity_type"),
            Some(&serde_json::Value::String("event".to_string()))
        );
    }

    #[test]
    fn item_round_trip() {
        let record = HookRecord {
            group_key: keys::run_group_key("run_1"),
            discriminator_key: keys::hook_key("h1"),
            entity_type: EntityKind::Hook,
            hook_id: "h1".to_string(),
            run_id: "run_1".to_string(),
            token: "t1".to_string(),
            owner_id: None,
            project_id: None,
            environment_id: None,
            created_at_ms: 1_733_000_000_000,
        };
        let item = to_item(&record).unwrap();
        let back: HookRecord = from_item(item).unwrap();
        assert_eq!(back.hook_id, "h1");
        assert_eq!(back.token, "t1");
        assert!(back.owner_id.is_none());
    }
}
