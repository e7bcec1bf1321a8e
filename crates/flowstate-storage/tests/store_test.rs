// End-to-end store behavior over the in-memory driver

use std::time::Duration;

use flowstate_core::{
    CreateEvent, CreateRun, CreateStep, Cursor, ListRunsFilter, Pagination, RunStatus, SortOrder,
    StepStatus, StoreError, UpdateRun, UpdateStep,
};
use flowstate_storage::WorkflowStorage;
use serde_json::json;

fn create_run_input(workflow_name: &str) -> CreateRun {
    CreateRun {
        workflow_name: workflow_name.to_string(),
        input: json!({"n": 1}),
        execution_context: None,
        deployment_id: "dep_1".to_string(),
    }
}

fn create_step_input(step_name: &str, step_id: Option<&str>) -> CreateStep {
    CreateStep {
        step_name: step_name.to_string(),
        input: json!({}),
        step_id: step_id.map(str::to_string),
    }
}

#[test_log::test(tokio::test)]
async fn create_then_get_returns_equal_run() {
    let storage = WorkflowStorage::in_memory();

    let run = storage.runs.create(create_run_input("demo")).await.unwrap();
    assert!(run.run_id.starts_with("run_"));
    assert_eq!(run.status, RunStatus::Pending);
    assert!(run.started_at.is_none());
    assert!(run.completed_at.is_none());

    let fetched = storage.runs.get(&run.run_id).await.unwrap();
    assert_eq!(fetched, run);
}

#[test_log::test(tokio::test)]
async fn get_missing_run_fails_not_found() {
    let storage = WorkflowStorage::in_memory();
    let err = storage.runs.get("run_missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn duplicate_step_id_conflicts_and_keeps_first_record() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    let first = storage
        .steps
        .create(&run.run_id, create_step_input("fetch", Some("s1")))
        .await
        .unwrap();

    let err = storage
        .steps
        .create(&run.run_id, create_step_input("other", Some("s1")))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let kept = storage.steps.get(&run.run_id, "s1").await.unwrap();
    assert_eq!(kept, first);
    assert_eq!(kept.step_name, "fetch");
}

#[test_log::test(tokio::test)]
async fn duplicate_hook_id_conflicts() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    storage.hooks.create(&run.run_id, "h1", "t1").await.unwrap();
    let err = storage
        .hooks
        .create(&run.run_id, "h1", "t2")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

// Preserved source behavior: a run that exists but is not paused reports
// "paused run not found" rather than an invalid-transition error.
#[test_log::test(tokio::test)]
async fn resume_fails_unless_paused() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    // pending run: resume fails, status unchanged
    let err = storage.runs.resume(&run.run_id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(
        storage.runs.get(&run.run_id).await.unwrap().status,
        RunStatus::Pending
    );

    // running run: still fails
    storage
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
    let err = storage.runs.resume(&run.run_id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(
        storage.runs.get(&run.run_id).await.unwrap().status,
        RunStatus::Running
    );

    // paused run: resume succeeds
    let paused = storage.runs.pause(&run.run_id).await.unwrap();
    assert_eq!(paused.status, RunStatus::Paused);
    let resumed = storage.runs.resume(&run.run_id).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Running);

    // missing run: same not-found shape
    let err = storage.runs.resume("run_missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn started_at_is_set_only_once() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

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
    let started_at = first.started_at.expect("startedAt set on first running");

    tokio::time::sleep(Duration::from_millis(5)).await;

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
    assert_eq!(second.started_at, Some(started_at));
    assert!(second.updated_at > first.updated_at);
}

#[test_log::test(tokio::test)]
async fn terminal_statuses_set_completed_at() {
    let storage = WorkflowStorage::in_memory();

    let run = storage.runs.create(create_run_input("demo")).await.unwrap();
    let cancelled = storage.runs.cancel(&run.run_id).await.unwrap();
    assert_eq!(cancelled.status, RunStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    let run = storage.runs.create(create_run_input("demo")).await.unwrap();
    let failed = storage
        .runs
        .update(
            &run.run_id,
            UpdateRun {
                status: Some(RunStatus::Failed),
                error: Some("boom".to_string()),
                error_code: Some("E_BOOM".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(failed.completed_at.is_some());
    assert_eq!(failed.error.as_deref(), Some("boom"));
}

#[test_log::test(tokio::test)]
async fn step_completed_at_follows_terminal_statuses() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();
    let step = storage
        .steps
        .create(&run.run_id, create_step_input("fetch", None))
        .await
        .unwrap();
    assert_eq!(step.attempt, 1);
    assert!(step.step_id.starts_with("step_"));

    let running = storage
        .steps
        .update(
            &run.run_id,
            &step.step_id,
            UpdateStep {
                status: Some(StepStatus::Running),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(running.started_at.is_some());
    assert!(running.completed_at.is_none());

    let completed = storage
        .steps
        .update(
            &run.run_id,
            &step.step_id,
            UpdateStep {
                status: Some(StepStatus::Completed),
                output: Some(json!({"ok": true})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.output, Some(json!({"ok": true})));
}

#[test_log::test(tokio::test)]
async fn noop_update_returns_current_record_unchanged() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;

    let unchanged = storage
        .runs
        .update(&run.run_id, UpdateRun::default())
        .await
        .unwrap();
    assert_eq!(unchanged, run);
}

#[test_log::test(tokio::test)]
async fn step_get_with_empty_run_id_fails_not_found() {
    let storage = WorkflowStorage::in_memory();
    let err = storage.steps.get("", "s1").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn step_pages_walk_without_overlap_or_gap() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    for index in 0..5 {
        storage
            .steps
            .create(
                &run.run_id,
                create_step_input(&format!("step-{index}"), None),
            )
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor = None;
    let mut pages = 0;
    loop {
        let page = storage
            .steps
            .list(
                &run.run_id,
                Pagination {
                    limit: Some(2),
                    cursor,
                },
            )
            .await
            .unwrap();
        pages += 1;
        seen.extend(page.items.iter().map(|step| step.step_id.clone()));
        if !page.has_more {
            assert_eq!(
                page.cursor,
                page.items.last().map(|step| Cursor::Id(step.step_id.clone()))
            );
            break;
        }
        assert_eq!(page.items.len(), 2);
        cursor = page.cursor;
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 5);
    let unique: std::collections::HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 5, "pages overlapped");

    // newest-first: generated step ids sort by creation time
    let mut expected = seen.clone();
    expected.sort_by(|a, b| b.cmp(a));
    assert_eq!(seen, expected);
}

#[test_log::test(tokio::test)]
async fn empty_step_listing_has_null_cursor() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    let page = storage
        .steps
        .list(&run.run_id, Pagination::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);
    assert_eq!(page.cursor, None);
}

#[test_log::test(tokio::test)]
async fn list_runs_by_workflow_name_returns_created_at_cursor() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();
    storage.runs.create(create_run_input("other")).await.unwrap();

    let page = storage
        .runs
        .list(
            ListRunsFilter {
                workflow_name: Some("demo".to_string()),
                status: None,
            },
            Pagination::with_limit(1),
        )
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].run_id, run.run_id);
    assert!(!page.has_more);
    assert_eq!(
        page.cursor,
        Some(Cursor::Instant(run.created_at.timestamp_millis()))
    );
}

#[test_log::test(tokio::test)]
async fn list_runs_selects_status_path_and_all_runs_path() {
    let storage = WorkflowStorage::in_memory();
    let first = storage.runs.create(create_run_input("a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = storage.runs.create(create_run_input("b")).await.unwrap();
    storage.runs.cancel(&second.run_id).await.unwrap();

    let pending = storage
        .runs
        .list(
            ListRunsFilter {
                workflow_name: None,
                status: Some(RunStatus::Pending),
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].run_id, first.run_id);

    // no filter: all runs, newest first
    let all = storage
        .runs
        .list(ListRunsFilter::default(), Pagination::default())
        .await
        .unwrap();
    let ids: Vec<_> = all.items.iter().map(|run| run.run_id.clone()).collect();
    assert_eq!(ids, vec![second.run_id.clone(), first.run_id.clone()]);
}

#[test_log::test(tokio::test)]
async fn run_pages_walk_newest_first() {
    let storage = WorkflowStorage::in_memory();
    let mut created = Vec::new();
    for index in 0..3 {
        created.push(
            storage
                .runs
                .create(create_run_input(&format!("wf-{index}")))
                .await
                .unwrap(),
        );
        // distinct creation instants so the numeric cursor resumes cleanly
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let first_page = storage
        .runs
        .list(ListRunsFilter::default(), Pagination::with_limit(2))
        .await
        .unwrap();
    assert_eq!(first_page.items.len(), 2);
    assert!(first_page.has_more);
    assert_eq!(first_page.items[0].run_id, created[2].run_id);
    assert_eq!(first_page.items[1].run_id, created[1].run_id);

    let second_page = storage
        .runs
        .list(
            ListRunsFilter::default(),
            Pagination {
                limit: Some(2),
                cursor: first_page.cursor,
            },
        )
        .await
        .unwrap();
    assert_eq!(second_page.items.len(), 1);
    assert!(!second_page.has_more);
    assert_eq!(second_page.items[0].run_id, created[0].run_id);
}

#[test_log::test(tokio::test)]
async fn hook_token_lookup_and_dispose() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    let hook = storage.hooks.create(&run.run_id, "h1", "t1").await.unwrap();
    assert!(hook.owner_id.is_none());

    let by_token = storage.hooks.get_by_token("t1").await.unwrap();
    assert_eq!(by_token, hook);

    let disposed = storage.hooks.dispose("h1").await.unwrap();
    assert_eq!(disposed.hook_id, "h1");

    let err = storage.hooks.get("h1").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    let err = storage.hooks.get_by_token("t1").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    let err = storage.hooks.dispose("h1").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn hook_listing_scoped_and_global() {
    let storage = WorkflowStorage::in_memory();
    let run_a = storage.runs.create(create_run_input("a")).await.unwrap();
    let run_b = storage.runs.create(create_run_input("b")).await.unwrap();

    storage.hooks.create(&run_a.run_id, "h1", "t1").await.unwrap();
    storage.hooks.create(&run_a.run_id, "h2", "t2").await.unwrap();
    storage.hooks.create(&run_b.run_id, "h3", "t3").await.unwrap();

    let scoped = storage
        .hooks
        .list(Some(&run_a.run_id), Pagination::default())
        .await
        .unwrap();
    let ids: Vec<_> = scoped.items.iter().map(|hook| hook.hook_id.clone()).collect();
    assert_eq!(ids, vec!["h2", "h1"]);
    assert_eq!(scoped.cursor, Some(Cursor::Id("h1".to_string())));

    let global = storage.hooks.list(None, Pagination::default()).await.unwrap();
    assert_eq!(global.items.len(), 3);
    assert!(matches!(global.cursor, Some(Cursor::Instant(_))));
}

#[test_log::test(tokio::test)]
async fn events_list_in_both_orders() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    let first = storage
        .events
        .create(
            &run.run_id,
            CreateEvent {
                event_type: "step.started".to_string(),
                payload: Some(json!({"step": "s1"})),
                correlation_id: None,
            },
        )
        .await
        .unwrap();
    let second = storage
        .events
        .create(
            &run.run_id,
            CreateEvent {
                event_type: "step.completed".to_string(),
                payload: None,
                correlation_id: None,
            },
        )
        .await
        .unwrap();
    assert!(second.event_id > first.event_id);

    let newest_first = storage
        .events
        .list(&run.run_id, Pagination::default(), SortOrder::Desc)
        .await
        .unwrap();
    let ids: Vec<_> = newest_first
        .items
        .iter()
        .map(|event| event.event_id.clone())
        .collect();
    assert_eq!(ids, vec![second.event_id.clone(), first.event_id.clone()]);

    let oldest_first = storage
        .events
        .list(&run.run_id, Pagination::default(), SortOrder::Asc)
        .await
        .unwrap();
    let ids: Vec<_> = oldest_first
        .items
        .iter()
        .map(|event| event.event_id.clone())
        .collect();
    assert_eq!(ids, vec![first.event_id, second.event_id]);
}

#[test_log::test(tokio::test)]
async fn event_pages_resume_from_id_cursor() {
    let storage = WorkflowStorage::in_memory();
    let run = storage.runs.create(create_run_input("demo")).await.unwrap();

    let mut created = Vec::new();
    for index in 0..4 {
        created.push(
            storage
                .events
                .create(
                    &run.run_id,
                    CreateEvent {
                        event_type: format!("tick.{index}"),
                        payload: None,
                        correlation_id: None,
                    },
                )
                .await
                .unwrap(),
        );
    }

    let first_page = storage
        .events
        .list(&run.run_id, Pagination::with_limit(3), SortOrder::Asc)
        .await
        .unwrap();
    assert_eq!(first_page.items.len(), 3);
    assert!(first_page.has_more);

    let second_page = storage
        .events
        .list(
            &run.run_id,
            Pagination {
                limit: Some(3),
                cursor: first_page.cursor,
            },
            SortOrder::Asc,
        )
        .await
        .unwrap();
    assert_eq!(second_page.items.len(), 1);
    assert!(!second_page.has_more);
    assert_eq!(second_page.items[0].event_id, created[3].event_id);
}

#[test_log::test(tokio::test)]
async fn events_listed_by_correlation_id_across_runs() {
    let storage = WorkflowStorage::in_memory();
    let run_a = storage.runs.create(create_run_input("a")).await.unwrap();
    let run_b = storage.runs.create(create_run_input("b")).await.unwrap();

    for (run_id, event_type) in [
        (&run_a.run_id, "created"),
        (&run_b.run_id, "received"),
    ] {
        storage
            .events
            .create(
                run_id,
                CreateEvent {
                    event_type: event_type.to_string(),
                    payload: None,
                    correlation_id: Some("corr_1".to_string()),
                },
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    storage
        .events
        .create(
            &run_a.run_id,
            CreateEvent {
                event_type: "unrelated".to_string(),
                payload: None,
                correlation_id: None,
            },
        )
        .await
        .unwrap();

    let page = storage
        .events
        .list_by_correlation_id("corr_1", Pagination::default(), SortOrder::Desc)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].event_type, "received");
    assert_eq!(page.items[1].event_type, "created");
    assert!(matches!(page.cursor, Some(Cursor::Instant(_))));

    // numeric cursor resumes past the first page, flipped for descending
    let rest = storage
        .events
        .list_by_correlation_id(
            "corr_1",
            Pagination {
                limit: Some(1),
                cursor: Some(Cursor::Instant(
                    page.items[0].created_at.timestamp_millis(),
                )),
            },
            SortOrder::Desc,
        )
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].event_type, "created");
}

#[test_log::test(tokio::test)]
async fn logged_facade_delegates_results_and_errors() {
    let storage = WorkflowStorage::in_memory();
    let logged = storage.logged();

    let run = logged.runs.create(create_run_input("demo")).await.unwrap();
    let fetched = logged.runs.get(&run.run_id).await.unwrap();
    assert_eq!(fetched, run);

    let err = logged.runs.get("run_missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    let hook = logged.hooks.create(&run.run_id, "h1", "t1").await.unwrap();
    assert_eq!(logged.hooks.get_by_token("t1").await.unwrap(), hook);
}
