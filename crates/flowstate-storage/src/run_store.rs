// Run store: create, lifecycle transitions, partial updates, and listing
// by workflow name, status, or across all runs.

use std::sync::Arc;

use flowstate_core::{
    CreateRun, Cursor, ListRunsFilter, Page, Pagination, Run, RunStatus, SortOrder, StoreError,
    StoreResult, UpdateRun,
};

use crate::driver::{
    AttributeEquals, DriverError, IndexQuery, Item, Patch, PutCondition, SecondaryIndex,
    StorageDriver,
};
use crate::ids::IdGenerator;
use crate::keys::{self, EntityKind};
use crate::project;
use crate::records::{self, RunRecord};

/// Default page size for run listings
pub const DEFAULT_RUN_PAGE_LIMIT: u32 = 20;

/// Store for run metadata records
#[derive(Clone)]
pub struct RunStore {
    driver: Arc<dyn StorageDriver>,
    ids: Arc<IdGenerator>,
}

impl RunStore {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            driver,
            ids: Arc::new(IdGenerator::runs()),
        }
    }

    /// Create a new run in `pending` status.
    ///
    /// The write is guarded on key absence, so an id collision fails
    /// Conflict instead of silently overwriting.
    pub async fn create(&self, input: CreateRun) -> StoreResult<Run> {
        let run_id = self.ids.generate();
        let now = records::now_ms();
        let record = RunRecord {
            group_key: keys::run_group_key(&run_id),
            discriminator_key: keys::RUN_METADATA_KEY.to_string(),
            entity_type: EntityKind::Run,
            run_id,
            workflow_name: input.workflow_name,
            input: input.input,
            execution_context: input.execution_context,
            deployment_id: input.deployment_id,
            status: RunStatus::Pending,
            output: None,
            error: None,
            error_code: None,
            created_at_ms: now,
            updated_at_ms: now,
            started_at_ms: None,
            completed_at_ms: None,
        };

        let item = records::to_item(&record)?;
        match self.driver.put(item, PutCondition::KeyAbsent).await {
            Ok(()) => project::run(record),
            Err(DriverError::ConditionFailed) => Err(StoreError::conflict(format!(
                "run already exists: {}",
                record.run_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a run by id
    pub async fn get(&self, run_id: &str) -> StoreResult<Run> {
        let item = self
            .driver
            .get(&keys::run_group_key(run_id), keys::RUN_METADATA_KEY)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| StoreError::not_found(format!("run not found: {run_id}")))?;
        project::run(records::from_item(item)?)
    }

    /// Cancel a run unconditionally.
    ///
    /// No guard against cancelling an already-terminal run; that policy
    /// belongs to callers.
    pub async fn cancel(&self, run_id: &str) -> StoreResult<Run> {
        let now = records::now_ms();
        let mut set = Item::new();
        set.insert("status".to_string(), records::attr(&RunStatus::Cancelled)?);
        set.insert("completed_at_ms".to_string(), records::attr(&now)?);
        set.insert("updated_at_ms".to_string(), records::attr(&now)?);

        self.apply_patch(run_id, Patch { set, set_if_absent: Item::new() })
            .await
    }

    /// Pause a run unconditionally
    pub async fn pause(&self, run_id: &str) -> StoreResult<Run> {
        let now = records::now_ms();
        let mut set = Item::new();
        set.insert("status".to_string(), records::attr(&RunStatus::Paused)?);
        set.insert("updated_at_ms".to_string(), records::attr(&now)?);

        self.apply_patch(run_id, Patch { set, set_if_absent: Item::new() })
            .await
    }

    /// Resume a paused run.
    ///
    /// The transition is conditional on the stored status being exactly
    /// `paused`; any other outcome (run absent, or present in a different
    /// status) reports the paused run as not found.
    pub async fn resume(&self, run_id: &str) -> StoreResult<Run> {
        let now = records::now_ms();
        let mut set = Item::new();
        set.insert("status".to_string(), records::attr(&RunStatus::Running)?);
        set.insert("updated_at_ms".to_string(), records::attr(&now)?);
        let condition = AttributeEquals {
            attribute: "status",
            expected: records::attr(&RunStatus::Paused)?,
        };

        match self
            .driver
            .update(
                &keys::run_group_key(run_id),
                keys::RUN_METADATA_KEY,
                Patch { set, set_if_absent: Item::new() },
                Some(condition),
            )
            .await
        {
            Ok(item) => project::run(records::from_item(item)?),
            Err(DriverError::ConditionFailed) | Err(DriverError::NotFound) => Err(
                StoreError::not_found(format!("paused run not found: {run_id}")),
            ),
            Err(err) => Err(err.into()),
        }
    }

    /// Merge a partial update into a run.
    ///
    /// `started_at` is set only on the first transition into `running`;
    /// `completed_at` is set when the new status is terminal. An update with
    /// no recognized fields returns the current record without writing.
    pub async fn update(&self, run_id: &str, input: UpdateRun) -> StoreResult<Run> {
        let now = records::now_ms();
        let mut patch = Patch::default();

        if let Some(status) = input.status {
            patch
                .set
                .insert("status".to_string(), records::attr(&status)?);
            if status == RunStatus::Running {
                patch
                    .set_if_absent
                    .insert("started_at_ms".to_string(), records::attr(&now)?);
            }
            if status.is_terminal() {
                patch
                    .set
                    .insert("completed_at_ms".to_string(), records::attr(&now)?);
            }
        }
        if let Some(output) = input.output {
            patch.set.insert("output".to_string(), output);
        }
        if let Some(error) = input.error {
            patch.set.insert("error".to_string(), records::attr(&error)?);
        }
        if let Some(error_code) = input.error_code {
            patch
                .set
                .insert("error_code".to_string(), records::attr(&error_code)?);
        }
        if let Some(deployment_id) = input.deployment_id {
            patch
                .set
                .insert("deployment_id".to_string(), records::attr(&deployment_id)?);
        }
        if let Some(execution_context) = input.execution_context {
            patch
                .set
                .insert("execution_context".to_string(), execution_context);
        }

        if patch.is_empty() {
            return self.get(run_id).await;
        }
        patch
            .set
            .insert("updated_at_ms".to_string(), records::attr(&now)?);

        self.apply_patch(run_id, patch).await
    }

    /// List runs newest-first: by workflow name when given, else by status
    /// when given, else across all runs. The page cursor is the last
    /// record's creation instant in epoch milliseconds.
    pub async fn list(
        &self,
        filter: ListRunsFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Run>> {
        let limit = pagination.limit.unwrap_or(DEFAULT_RUN_PAGE_LIMIT);
        let exclusive_start = match pagination.cursor {
            Some(Cursor::Instant(ms)) => Some(ms),
            // id cursors belong to discriminator-ordered paths
            _ => None,
        };

        let (index, value) = if let Some(workflow_name) = filter.workflow_name {
            (SecondaryIndex::WorkflowName, workflow_name)
        } else if let Some(status) = filter.status {
            (SecondaryIndex::Status, status.to_string())
        } else {
            (SecondaryIndex::EntityType, EntityKind::Run.as_str().to_string())
        };

        let items = self
            .driver
            .query_index(IndexQuery {
                index,
                value,
                exclusive_start,
                entity: Some(EntityKind::Run),
                order: SortOrder::Desc,
                limit: limit + 1,
            })
            .await
            .map_err(StoreError::from)?;

        let has_more = items.len() > limit as usize;
        let page_records: Vec<RunRecord> = items
            .into_iter()
            .take(limit as usize)
            .map(records::from_item)
            .collect::<Result<_, _>>()?;
        let cursor = page_records
            .last()
            .map(|record| Cursor::Instant(record.created_at_ms));
        let items = page_records
            .into_iter()
            .map(project::run)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            has_more,
            cursor,
        })
    }

    async fn apply_patch(&self, run_id: &str, patch: Patch) -> StoreResult<Run> {
        match self
            .driver
            .update(
                &keys::run_group_key(run_id),
                keys::RUN_METADATA_KEY,
                patch,
                None,
            )
            .await
        {
            Ok(item) => project::run(records::from_item(item)?),
            Err(DriverError::NotFound) => {
                Err(StoreError::not_found(format!("run not found: {run_id}")))
            }
            Err(err) => Err(err.into()),
        }
    }
}
