// Result projection: stored records to public entities
//
// Epoch-millisecond fields become DateTime<Utc> instants; optional fields
// that were never stored stay absent. One explicit function per entity so
// the optional-vs-absent contract is type-checked.

use chrono::{DateTime, Utc};

use flowstate_core::{Event, Hook, Run, Step, StoreError};

use crate::records::{EventRecord, HookRecord, RunRecord, StepRecord};

fn instant(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::serialization(format!("invalid timestamp: {ms}")))
}

fn optional_instant(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, StoreError> {
    ms.map(instant).transpose()
}

/// Project a stored run record into a public run
pub fn run(record: RunRecord) -> Result<Run, StoreError> {
    Ok(Run {
        run_id: record.run_id,
        workflow_name: record.workflow_name,
        input: record.input,
        execution_context: record.execution_context,
        deployment_id: record.deployment_id,
        status: record.status,
        output: record.output,
        error: record.error,
        error_code: record.error_code,
        created_at: instant(record.created_at_ms)?,
        updated_at: instant(record.updated_at_ms)?,
        started_at: optional_instant(record.started_at_ms)?,
        completed_at: optional_instant(record.completed_at_ms)?,
    })
}

/// Project a stored step record into a public step
pub fn step(record: StepRecord) -> Result<Step, StoreError> {
    Ok(Step {
        step_id: record.step_id,
        run_id: record.run_id,
        step_name: record.step_name,
        input: record.input,
        status: record.status,
        attempt: record.attempt,
        output: record.output,
        error: record.error,
        error_code: record.error_code,
        created_at: instant(record.created_at_ms)?,
        updated_at: instant(record.updated_at_ms)?,
        started_at: optional_instant(record.started_at_ms)?,
        completed_at: optional_instant(record.completed_at_ms)?,
    })
}

/// Project a stored hook record into a public hook
pub fn hook(record: HookRecord) -> Result<Hook, StoreError> {
    Ok(Hook {
        hook_id: record.hook_id,
        run_id: record.run_id,
        token: record.token,
        owner_id: record.owner_id,
        project_id: record.project_id,
        environment_id: record.environment_id,
        created_at: instant(record.created_at_ms)?,
    })
}

/// Project a stored event record into a public event
pub fn event(record: EventRecord) -> Result<Event, StoreError> {
    Ok(Event {
        event_id: record.event_id,
        run_id: record.run_id,
        correlation_id: record.correlation_id,
        event_type: record.event_type,
        payload: record.payload,
        created_at: instant(record.created_at_ms)?,
    })
}
