// Event store: append-only log entries under a run, with a secondary query
// path by correlation id.

use std::sync::Arc;

use flowstate_core::{
    CreateEvent, Cursor, Event, Page, Pagination, SortOrder, StoreError, StoreResult,
};

use crate::driver::{
    DriverError, GroupQuery, IndexQuery, PutCondition, SecondaryIndex, StorageDriver,
};
use crate::ids::IdGenerator;
use crate::keys::{self, EntityKind};
use crate::project;
use crate::records::{self, EventRecord};

/// Default page size for event listings
pub const DEFAULT_EVENT_PAGE_LIMIT: u32 = 100;

/// Store for event records
#[derive(Clone)]
pub struct EventStore {
    driver: Arc<dyn StorageDriver>,
    ids: Arc<IdGenerator>,
}

impl EventStore {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            driver,
            ids: Arc::new(IdGenerator::events()),
        }
    }

    /// Append an event under a run.
    ///
    /// Event ids are generated and monotonic, so the discriminator key
    /// orders events by creation. Conflict is only possible on an id
    /// collision.
    pub async fn create(&self, run_id: &str, input: CreateEvent) -> StoreResult<Event> {
        let event_id = self.ids.generate();
        let record = EventRecord {
            group_key: keys::run_group_key(run_id),
            discriminator_key: keys::event_key(&event_id),
            entity_type: EntityKind::Event,
            event_id,
            run_id: run_id.to_string(),
            correlation_id: input.correlation_id,
            event_type: input.event_type,
            payload: input.payload,
            created_at_ms: records::now_ms(),
        };

        let item = records::to_item(&record)?;
        match self.driver.put(item, PutCondition::KeyAbsent).await {
            Ok(()) => project::event(record),
            Err(DriverError::ConditionFailed) => Err(StoreError::conflict(format!(
                "event already exists: {}",
                record.event_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// List a run's events in the requested order by discriminator key.
    /// The page cursor is the last returned event's id.
    pub async fn list(
        &self,
        run_id: &str,
        pagination: Pagination,
        order: SortOrder,
    ) -> StoreResult<Page<Event>> {
        let limit = pagination.limit.unwrap_or(DEFAULT_EVENT_PAGE_LIMIT);
        let exclusive_start = match pagination.cursor {
            Some(Cursor::Id(event_id)) => Some(keys::event_key(&event_id)),
            // instant cursors belong to the correlation-id path
            _ => None,
        };

        let items = self
            .driver
            .query_group(GroupQuery {
                group_key: keys::run_group_key(run_id),
                key_prefix: Some(keys::EVENT_KEY_PREFIX),
                exclusive_start,
                order,
                limit: limit + 1,
            })
            .await
            .map_err(StoreError::from)?;

        let has_more = items.len() > limit as usize;
        let page_records: Vec<EventRecord> = items
            .into_iter()
            .take(limit as usize)
            .map(records::from_item)
            .collect::<Result<_, _>>()?;
        let cursor = page_records
            .last()
            .map(|record| Cursor::Id(record.event_id.clone()));
        let items = page_records
            .into_iter()
            .map(project::event)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            has_more,
            cursor,
        })
    }

    /// List events sharing a correlation id, across runs, ordered by
    /// creation instant. The page cursor is the last event's creation
    /// instant in epoch ms; its comparison flips with the sort order.
    pub async fn list_by_correlation_id(
        &self,
        correlation_id: &str,
        pagination: Pagination,
        order: SortOrder,
    ) -> StoreResult<Page<Event>> {
        let limit = pagination.limit.unwrap_or(DEFAULT_EVENT_PAGE_LIMIT);
        let exclusive_start = match pagination.cursor {
            Some(Cursor::Instant(ms)) => Some(ms),
            _ => None,
        };

        let items = self
            .driver
            .query_index(IndexQuery {
                index: SecondaryIndex::CorrelationId,
                value: correlation_id.to_string(),
                exclusive_start,
                entity: None,
                order,
                limit: limit + 1,
            })
            .await
            .map_err(StoreError::from)?;

        let has_more = items.len() > limit as usize;
        let page_records: Vec<EventRecord> = items
            .into_iter()
            .take(limit as usize)
            .map(records::from_item)
            .collect::<Result<_, _>>()?;
        let cursor = page_records
            .last()
            .map(|record| Cursor::Instant(record.created_at_ms));
        let items = page_records
            .into_iter()
            .map(project::event)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            has_more,
            cursor,
        })
    }
}
