// Event entity: append-only log entries under a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for appending an event
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub event_type: String,
    pub payload: Option<serde_json::Value>,
    pub correlation_id: Option<String>,
}

/// An immutable event appended under a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
