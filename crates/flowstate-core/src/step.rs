// Step entity: one unit of work within a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Step lifecycle status.
///
/// Steps have no cancellation status; a cancelled run simply stops
/// dispatching its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    /// Whether this status ends the step
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A step within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a step
#[derive(Debug, Clone)]
pub struct CreateStep {
    pub step_name: String,
    pub input: serde_json::Value,
    /// Caller-supplied id; generated when absent
    pub step_id: Option<String>,
}

/// Partial update for a step; only present fields are merged
#[derive(Debug, Clone, Default)]
pub struct UpdateStep {
    pub status: Option<StepStatus>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub attempt: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_status_round_trips() {
        let status: StepStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(status, StepStatus::Running);
        assert!(StepStatus::Failed.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
    }
}
