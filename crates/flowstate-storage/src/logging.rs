// Call logging as explicit middleware: one decorator per store with
// concrete method signatures, no runtime proxying. Each method logs the
// call at debug, warns on error, and delegates unchanged.

use flowstate_core::{
    CreateEvent, CreateRun, CreateStep, Event, Hook, ListRunsFilter, Page, Pagination, Run,
    SortOrder, Step, StoreResult, UpdateRun, UpdateStep,
};
use tracing::{debug, warn};

use crate::event_store::EventStore;
use crate::hook_store::HookStore;
use crate::run_store::RunStore;
use crate::step_store::StepStore;

fn observe<T>(operation: &'static str, result: StoreResult<T>) -> StoreResult<T> {
    if let Err(err) = &result {
        warn!(%err, operation, "store call failed");
    }
    result
}

/// Logging decorator around `RunStore`
#[derive(Clone)]
pub struct LoggedRunStore {
    inner: RunStore,
}

impl LoggedRunStore {
    pub fn new(inner: RunStore) -> Self {
        Self { inner }
    }

    pub async fn create(&self, input: CreateRun) -> StoreResult<Run> {
        debug!(workflow_name = %input.workflow_name, "runs.create");
        observe("runs.create", self.inner.create(input).await)
    }

    pub async fn get(&self, run_id: &str) -> StoreResult<Run> {
        debug!(run_id, "runs.get");
        observe("runs.get", self.inner.get(run_id).await)
    }

    pub async fn cancel(&self, run_id: &str) -> StoreResult<Run> {
        debug!(run_id, "runs.cancel");
        observe("runs.cancel", self.inner.cancel(run_id).await)
    }

    pub async fn pause(&self, run_id: &str) -> StoreResult<Run> {
        debug!(run_id, "runs.pause");
        observe("runs.pause", self.inner.pause(run_id).await)
    }

    pub async fn resume(&self, run_id: &str) -> StoreResult<Run> {
        debug!(run_id, "runs.resume");
        observe("runs.resume", self.inner.resume(run_id).await)
    }

    pub async fn update(&self, run_id: &str, input: UpdateRun) -> StoreResult<Run> {
        debug!(run_id, status = ?input.status, "runs.update");
        observe("runs.update", self.inner.update(run_id, input).await)
    }

    pub async fn list(
        &self,
        filter: ListRunsFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Run>> {
        debug!(
            workflow_name = ?filter.workflow_name,
            status = ?filter.status,
            "runs.list"
        );
        observe("runs.list", self.inner.list(filter, pagination).await)
    }
}

/// Logging decorator around `StepStore`
#[derive(Clone)]
pub struct LoggedStepStore {
    inner: StepStore,
}

impl LoggedStepStore {
    pub fn new(inner: StepStore) -> Self {
        Self { inner }
    }

    pub async fn create(&self, run_id: &str, input: CreateStep) -> StoreResult<Step> {
        debug!(run_id, step_name = %input.step_name, "steps.create");
        observe("steps.create", self.inner.create(run_id, input).await)
    }

    pub async fn get(&self, run_id: &str, step_id: &str) -> StoreResult<Step> {
        debug!(run_id, step_id, "steps.get");
        observe("steps.get", self.inner.get(run_id, step_id).await)
    }

    pub async fn update(
        &self,
        run_id: &str,
        step_id: &str,
        input: UpdateStep,
    ) -> StoreResult<Step> {
        debug!(run_id, step_id, status = ?input.status, "steps.update");
        observe("steps.update", self.inner.update(run_id, step_id, input).await)
    }

    pub async fn list(&self, run_id: &str, pagination: Pagination) -> StoreResult<Page<Step>> {
        debug!(run_id, "steps.list");
        observe("steps.list", self.inner.list(run_id, pagination).await)
    }
}

/// Logging decorator around `HookStore`
#[derive(Clone)]
pub struct LoggedHookStore {
    inner: HookStore,
}

impl LoggedHookStore {
    pub fn new(inner: HookStore) -> Self {
        Self { inner }
    }

    pub async fn create(&self, run_id: &str, hook_id: &str, token: &str) -> StoreResult<Hook> {
        debug!(run_id, hook_id, "hooks.create");
        observe("hooks.create", self.inner.create(run_id, hook_id, token).await)
    }

    pub async fn get(&self, hook_id: &str) -> StoreResult<Hook> {
        debug!(hook_id, "hooks.get");
        observe("hooks.get", self.inner.get(hook_id).await)
    }

    // the token itself is a bearer credential and never logged
    pub async fn get_by_token(&self, token: &str) -> StoreResult<Hook> {
        debug!("hooks.get_by_token");
        observe("hooks.get_by_token", self.inner.get_by_token(token).await)
    }

    pub async fn dispose(&self, hook_id: &str) -> StoreResult<Hook> {
        debug!(hook_id, "hooks.dispose");
        observe("hooks.dispose", self.inner.dispose(hook_id).await)
    }

    pub async fn list(
        &self,
        run_id: Option<&str>,
        pagination: Pagination,
    ) -> StoreResult<Page<Hook>> {
        debug!(run_id = ?run_id, "hooks.list");
        observe("hooks.list", self.inner.list(run_id, pagination).await)
    }
}

/// Logging decorator around `EventStore`
#[derive(Clone)]
pub struct LoggedEventStore {
    inner: EventStore,
}

impl LoggedEventStore {
    pub fn new(inner: EventStore) -> Self {
        Self { inner }
    }

    pub async fn create(&self, run_id: &str, input: CreateEvent) -> StoreResult<Event> {
        debug!(run_id, event_type = %input.event_type, "events.create");
        observe("events.create", self.inner.create(run_id, input).await)
    }

    pub async fn list(
        &self,
        run_id: &str,
        pagination: Pagination,
        order: SortOrder,
    ) -> StoreResult<Page<Event>> {
        debug!(run_id, ?order, "events.list");
        observe("events.list", self.inner.list(run_id, pagination, order).await)
    }

    pub async fn list_by_correlation_id(
        &self,
        correlation_id: &str,
        pagination: Pagination,
        order: SortOrder,
    ) -> StoreResult<Page<Event>> {
        debug!(correlation_id, ?order, "events.list_by_correlation_id");
        observe(
            "events.list_by_correlation_id",
            self.inner
                .list_by_correlation_id(correlation_id, pagination, order)
                .await,
        )
    }
}
