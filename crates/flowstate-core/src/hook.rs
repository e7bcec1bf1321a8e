// Hook entity: a registered callback addressable by id or bearer token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A callback hook registered under a run.
///
/// Hooks are immutable once created; the only mutation is disposal.
/// Owner/project/environment metadata is carried for callers that populate
/// it but is not set by this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub hook_id: String,
    pub run_id: String,
    /// Opaque bearer token; unique, used for reverse lookup
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub environment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
