// Workflow run entity and its lifecycle statuses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run created but not started
    Pending,

    /// Run is executing
    Running,

    /// Run is paused awaiting resume
    Paused,

    /// Run completed successfully
    Completed,

    /// Run failed
    Failed,

    /// Run was cancelled
    Cancelled,
}

impl RunStatus {
    /// Whether this status ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a run
#[derive(Debug, Clone)]
pub struct CreateRun {
    pub workflow_name: String,
    pub input: serde_json::Value,
    pub execution_context: Option<serde_json::Value>,
    pub deployment_id: String,
}

/// Partial update for a run; only present fields are merged
#[derive(Debug, Clone, Default)]
pub struct UpdateRun {
    pub status: Option<RunStatus>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub deployment_id: Option<String>,
    pub execution_context: Option<serde_json::Value>,
}

/// Filter for listing runs; workflow name takes priority over status
#[derive(Debug, Clone, Default)]
pub struct ListRunsFilter {
    pub workflow_name: Option<String>,
    pub status: Option<RunStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_snake_case() {
        let status: RunStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, RunStatus::Cancelled);
        assert_eq!(serde_json::to_string(&RunStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(RunStatus::Paused.to_string(), "paused");
    }

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Paused.is_terminal());
    }
}
