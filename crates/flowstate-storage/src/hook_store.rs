// Hook store: records live under their run's group key, with global point
// lookups by hook id and by bearer token served from secondary indexes.

use std::sync::Arc;

use flowstate_core::{Cursor, Hook, Page, Pagination, SortOrder, StoreError, StoreResult};

use crate::driver::{
    DriverError, GroupQuery, IndexQuery, PutCondition, SecondaryIndex, StorageDriver,
};
use crate::keys::{self, EntityKind};
use crate::project;
use crate::records::{self, HookRecord};

/// Default page size for hook listings
pub const DEFAULT_HOOK_PAGE_LIMIT: u32 = 100;

/// Store for hook records
#[derive(Clone)]
pub struct HookStore {
    driver: Arc<dyn StorageDriver>,
}

impl HookStore {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self { driver }
    }

    /// Register a hook under a run.
    ///
    /// Hook ids are caller-supplied; a duplicate (run id, hook id) pair
    /// fails Conflict. Global hook-id uniqueness is the caller's discipline.
    pub async fn create(&self, run_id: &str, hook_id: &str, token: &str) -> StoreResult<Hook> {
        let record = HookRecord {
            group_key: keys::run_group_key(run_id),
            discriminator_key: keys::hook_key(hook_id),
            entity_type: EntityKind::Hook,
            hook_id: hook_id.to_string(),
            run_id: run_id.to_string(),
            token: token.to_string(),
            owner_id: None,
            project_id: None,
            environment_id: None,
            created_at_ms: records::now_ms(),
        };

        let item = records::to_item(&record)?;
        match self.driver.put(item, PutCondition::KeyAbsent).await {
            Ok(()) => project::hook(record),
            Err(DriverError::ConditionFailed) => Err(StoreError::conflict(format!(
                "hook already exists: {hook_id}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Global lookup by hook id
    pub async fn get(&self, hook_id: &str) -> StoreResult<Hook> {
        let record = self
            .find_by_index(SecondaryIndex::HookId, hook_id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("hook not found: {hook_id}")))?;
        project::hook(record)
    }

    /// Global reverse lookup by bearer token.
    ///
    /// Only an empty index result is not-found; a failing backend call
    /// propagates as a backend error.
    pub async fn get_by_token(&self, token: &str) -> StoreResult<Hook> {
        let record = self
            .find_by_index(SecondaryIndex::Token, token)
            .await?
            .ok_or_else(|| StoreError::not_found("hook not found for token".to_string()))?;
        project::hook(record)
    }

    /// Delete a hook and return the deleted value
    pub async fn dispose(&self, hook_id: &str) -> StoreResult<Hook> {
        let record = self
            .find_by_index(SecondaryIndex::HookId, hook_id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("hook not found: {hook_id}")))?;

        match self
            .driver
            .delete(&record.group_key, &record.discriminator_key)
            .await
        {
            Ok(item) => project::hook(records::from_item(item)?),
            Err(DriverError::NotFound) => {
                Err(StoreError::not_found(format!("hook not found: {hook_id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List hooks newest-first: under one run when a run id is given
    /// (cursor is the last hook's id), otherwise across all hooks via the
    /// entity-type index (cursor is the creation instant in epoch ms).
    pub async fn list(
        &self,
        run_id: Option<&str>,
        pagination: Pagination,
    ) -> StoreResult<Page<Hook>> {
        let limit = pagination.limit.unwrap_or(DEFAULT_HOOK_PAGE_LIMIT);

        let items = match run_id {
            Some(run_id) => {
                let exclusive_start = match pagination.cursor {
                    Some(Cursor::Id(hook_id)) => Some(keys::hook_key(&hook_id)),
                    _ => None,
                };
                self.driver
                    .query_group(GroupQuery {
                        group_key: keys::run_group_key(run_id),
                        key_prefix: Some(keys::HOOK_KEY_PREFIX),
                        exclusive_start,
                        order: SortOrder::Desc,
                        limit: limit + 1,
                    })
                    .await
            }
            None => {
                let exclusive_start = match pagination.cursor {
                    Some(Cursor::Instant(ms)) => Some(ms),
                    _ => None,
                };
                self.driver
                    .query_index(IndexQuery {
                        index: SecondaryIndex::EntityType,
                        value: EntityKind::Hook.as_str().to_string(),
                        exclusive_start,
                        entity: None,
                        order: SortOrder::Desc,
                        limit: limit + 1,
                    })
                    .await
            }
        }
        .map_err(StoreError::from)?;

        let has_more = items.len() > limit as usize;
        let page_records: Vec<HookRecord> = items
            .into_iter()
            .take(limit as usize)
            .map(records::from_item)
            .collect::<Result<_, _>>()?;
        let cursor = page_records.last().map(|record| match run_id {
            Some(_) => Cursor::Id(record.hook_id.clone()),
            None => Cursor::Instant(record.created_at_ms),
        });
        let items = page_records
            .into_iter()
            .map(project::hook)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            has_more,
            cursor,
        })
    }

    async fn find_by_index(
        &self,
        index: SecondaryIndex,
        value: &str,
    ) -> StoreResult<Option<HookRecord>> {
        let items = self
            .driver
            .query_index(IndexQuery {
                index,
                value: value.to_string(),
                exclusive_start: None,
                entity: None,
                order: SortOrder::Desc,
                limit: 1,
            })
            .await
            .map_err(StoreError::from)?;

        items.into_iter().next().map(records::from_item).transpose()
    }
}
