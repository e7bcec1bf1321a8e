// PostgreSQL driver integration tests
//
// Requires a running PostgreSQL instance; set TEST_DATABASE_URL and run
// with `cargo test -- --ignored`.

use flowstate_core::{CreateRun, ListRunsFilter, Pagination, RunStatus, StoreError, UpdateRun};
use flowstate_storage::WorkflowStorage;
use serde_json::json;

fn database_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a PostgreSQL instance")
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn run_round_trip_against_postgres() {
    let storage = WorkflowStorage::postgres(&database_url()).await.unwrap();

    let run = storage
        .runs
        .create(CreateRun {
            workflow_name: "pg-smoke".to_string(),
            input: json!({"n": 1}),
            execution_context: None,
            deployment_id: "dep_1".to_string(),
        })
        .await
        .unwrap();

    let fetched = storage.runs.get(&run.run_id).await.unwrap();
    assert_eq!(fetched, run);

    let listed = storage
        .runs
        .list(
            ListRunsFilter {
                workflow_name: Some("pg-smoke".to_string()),
                status: None,
            },
            Pagination::with_limit(1),
        )
        .await
        .unwrap();
    assert_eq!(listed.items[0].run_id, run.run_id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn conditional_transitions_against_postgres() {
    let storage = WorkflowStorage::postgres(&database_url()).await.unwrap();

    let run = storage
        .runs
        .create(CreateRun {
            workflow_name: "pg-transitions".to_string(),
            input: json!({}),
            execution_context: None,
            deployment_id: "dep_1".to_string(),
        })
        .await
        .unwrap();

    // resume on a pending run hits the conditional-update path
    let err = storage.runs.resume(&run.run_id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    storage.runs.pause(&run.run_id).await.unwrap();
    let resumed = storage.runs.resume(&run.run_id).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Running);
    assert!(resumed.started_at.is_none(), "resume does not backfill startedAt");

    // set-once semantics go through the JSONB merge
    let first = storage
        .runs
        .update(
            &run.run_id,
            UpdateRun {
                status: Some(RunStatus::Running),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let second = storage
        .runs
        .update(
            &run.run_id,
            UpdateRun {
                status: Some(RunStatus::Running),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.started_at, first.started_at);
}
