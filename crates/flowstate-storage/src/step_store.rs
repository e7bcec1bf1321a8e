// Step store: steps live under their parent run's group key

use std::sync::Arc;

use flowstate_core::{
    CreateStep, Cursor, Page, Pagination, SortOrder, Step, StepStatus, StoreError, StoreResult,
    UpdateStep,
};

use crate::driver::{DriverError, GroupQuery, Patch, PutCondition, StorageDriver};
use crate::ids::IdGenerator;
use crate::keys::{self, EntityKind};
use crate::project;
use crate::records::{self, StepRecord};

/// Default page size for step listings
pub const DEFAULT_STEP_PAGE_LIMIT: u32 = 20;

/// Store for step records
#[derive(Clone)]
pub struct StepStore {
    driver: Arc<dyn StorageDriver>,
    ids: Arc<IdGenerator>,
}

impl StepStore {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            driver,
            ids: Arc::new(IdGenerator::steps()),
        }
    }

    /// Create a step in `pending` status with attempt 1.
    ///
    /// The (run id, step id) pair is unique at creation; a duplicate fails
    /// Conflict and leaves the first record unchanged.
    pub async fn create(&self, run_id: &str, input: CreateStep) -> StoreResult<Step> {
        let step_id = input.step_id.unwrap_or_else(|| self.ids.generate());
        let now = records::now_ms();
        let record = StepRecord {
            group_key: keys::run_group_key(run_id),
            discriminator_key: keys::step_key(&step_id),
            entity_type: EntityKind::Step,
            step_id,
            run_id: run_id.to_string(),
            step_name: input.step_name,
            input: input.input,
            status: StepStatus::Pending,
            attempt: 1,
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
            Ok(()) => project::step(record),
            Err(DriverError::ConditionFailed) => Err(StoreError::conflict(format!(
                "step already exists: {run_id}/{}",
                record.step_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a step; an empty run id is reported as not found
    pub async fn get(&self, run_id: &str, step_id: &str) -> StoreResult<Step> {
        if run_id.is_empty() {
            return Err(StoreError::not_found(format!(
                "step not found: {run_id}/{step_id}"
            )));
        }
        let item = self
            .driver
            .get(&keys::run_group_key(run_id), &keys::step_key(step_id))
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| {
                StoreError::not_found(format!("step not found: {run_id}/{step_id}"))
            })?;
        project::step(records::from_item(item)?)
    }

    /// Merge a partial update into a step.
    ///
    /// `started_at` is set only on the first transition into `running`;
    /// `completed_at` on `completed` or `failed`.
    pub async fn update(
        &self,
        run_id: &str,
        step_id: &str,
        input: UpdateStep,
    ) -> StoreResult<Step> {
        let now = records::now_ms();
        let mut patch = Patch::default();

        if let Some(status) = input.status {
            patch
                .set
                .insert("status".to_string(), records::attr(&status)?);
            if status == StepStatus::Running {
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
        if let Some(attempt) = input.attempt {
            patch
                .set
                .insert("attempt".to_string(), records::attr(&attempt)?);
        }

        if patch.is_empty() {
            return self.get(run_id, step_id).await;
        }
        patch
            .set
            .insert("updated_at_ms".to_string(), records::attr(&now)?);

        match self
            .driver
            .update(
                &keys::run_group_key(run_id),
                &keys::step_key(step_id),
                patch,
                None,
            )
            .await
        {
            Ok(item) => project::step(records::from_item(item)?),
            Err(DriverError::NotFound) => Err(StoreError::not_found(format!(
                "step not found: {run_id}/{step_id}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// List a run's steps newest-first by discriminator key.
    /// The page cursor is the last returned step's id.
    pub async fn list(&self, run_id: &str, pagination: Pagination) -> StoreResult<Page<Step>> {
        let limit = pagination.limit.unwrap_or(DEFAULT_STEP_PAGE_LIMIT);
        let exclusive_start = match pagination.cursor {
            Some(Cursor::Id(step_id)) => Some(keys::step_key(&step_id)),
            // instant cursors belong to index-ordered paths
            _ => None,
        };

        let items = self
            .driver
            .query_group(GroupQuery {
                group_key: keys::run_group_key(run_id),
                key_prefix: Some(keys::STEP_KEY_PREFIX),
                exclusive_start,
                order: SortOrder::Desc,
                limit: limit + 1,
            })
            .await
            .map_err(StoreError::from)?;

        let has_more = items.len() > limit as usize;
        let page_records: Vec<StepRecord> = items
            .into_iter()
            .take(limit as usize)
            .map(records::from_item)
            .collect::<Result<_, _>>()?;
        let cursor = page_records
            .last()
            .map(|record| Cursor::Id(record.step_id.clone()));
        let items = page_records
            .into_iter()
            .map(project::step)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            has_more,
            cursor,
        })
    }
}
