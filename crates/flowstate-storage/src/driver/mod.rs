//! Backend driver abstraction
//!
//! The stores talk to an ordered keyed backend through this trait: point
//! operations addressed by (group key, discriminator key), conditional
//! writes, range queries within a group ordered by discriminator key, and
//! secondary-index range queries ordered by creation instant.
//! Implementations must be thread-safe and support concurrent access.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use flowstate_core::{SortOrder, StoreError};

use crate::keys::EntityKind;

pub use memory::MemoryDriver;
pub use postgres::PostgresDriver;

/// A stored record as the backend sees it: a flat attribute map that
/// includes its own `group_key` and `discriminator_key`.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Error type for driver operations
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// No record at the addressed key
    #[error("record not found")]
    NotFound,

    /// A write precondition did not hold.
    ///
    /// When a precondition is attached, "record absent" and "condition
    /// false" are deliberately indistinguishable: neither backend can tell
    /// them apart from an unconditional zero-row result, and callers map
    /// the collapsed outcome themselves.
    #[error("condition failed")]
    ConditionFailed,

    /// The backend call itself failed
    #[error("backend error: {0}")]
    Backend(String),

    /// An item failed to encode or decode
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<DriverError> for StoreError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotFound => StoreError::not_found("record not found"),
            DriverError::ConditionFailed => StoreError::conflict("write condition failed"),
            DriverError::Backend(msg) => StoreError::Backend(msg),
            DriverError::Serialization(msg) => StoreError::Serialization(msg),
        }
    }
}

/// Precondition for `put`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutCondition {
    /// Unconditional write (upsert)
    None,
    /// Fail with `ConditionFailed` if the key already exists
    KeyAbsent,
}

/// Attribute-equality precondition for `update`
#[derive(Debug, Clone)]
pub struct AttributeEquals {
    pub attribute: &'static str,
    pub expected: serde_json::Value,
}

/// Structured patch applied by `update`.
///
/// `set` overwrites attributes unconditionally; `set_if_absent` only writes
/// attributes the record does not already carry (used for set-once
/// timestamps like `started_at_ms`).
#[derive(Debug, Clone, Default)]
pub struct Patch {
    pub set: Item,
    pub set_if_absent: Item,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.set_if_absent.is_empty()
    }
}

/// Secondary indexes the backend maintains over record attributes,
/// each ordered by `created_at_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryIndex {
    WorkflowName,
    Status,
    EntityType,
    HookId,
    Token,
    CorrelationId,
}

impl SecondaryIndex {
    /// The record attribute the index is keyed on
    pub fn attribute(&self) -> &'static str {
        match self {
            Self::WorkflowName => "workflow_name",
            Self::Status => "status",
            Self::EntityType => "entity_type",
            Self::HookId => "hook_id",
            Self::Token => "token",
            Self::CorrelationId => "correlation_id",
        }
    }
}

/// Range query within one group, ordered by discriminator key
#[derive(Debug, Clone)]
pub struct GroupQuery {
    pub group_key: String,
    /// Restrict to discriminator keys with this prefix (entity-type filter)
    pub key_prefix: Option<&'static str>,
    /// Exclusive resume bound: ascending queries return keys strictly after
    /// it, descending queries keys strictly before it
    pub exclusive_start: Option<String>,
    pub order: SortOrder,
    /// Maximum records to return
    pub limit: u32,
}

/// Range query over a secondary index, ordered by creation instant
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub index: SecondaryIndex,
    /// Indexed attribute value to match
    pub value: String,
    /// Exclusive resume bound on `created_at_ms`; the comparison flips with
    /// the sort order
    pub exclusive_start: Option<i64>,
    /// Additional entity-type filter (the status index spans entity types)
    pub entity: Option<EntityKind>,
    pub order: SortOrder,
    pub limit: u32,
}

/// Ordered keyed backend the entity stores are built over
#[async_trait]
pub trait StorageDriver: Send + Sync + 'static {
    /// Point read; `None` when no record exists at the key
    async fn get(
        &self,
        group_key: &str,
        discriminator_key: &str,
    ) -> Result<Option<Item>, DriverError>;

    /// Write a full item, optionally guarded on key absence
    async fn put(&self, item: Item, condition: PutCondition) -> Result<(), DriverError>;

    /// Merge a patch into an existing record and return the updated item.
    ///
    /// With no precondition, a missing record fails `NotFound`. With a
    /// precondition, any zero-row outcome fails `ConditionFailed`.
    async fn update(
        &self,
        group_key: &str,
        discriminator_key: &str,
        patch: Patch,
        condition: Option<AttributeEquals>,
    ) -> Result<Item, DriverError>;

    /// Delete a record and return the deleted item; `NotFound` when absent
    async fn delete(&self, group_key: &str, discriminator_key: &str)
        -> Result<Item, DriverError>;

    /// Range query within a group, ordered by discriminator key
    async fn query_group(&self, query: GroupQuery) -> Result<Vec<Item>, DriverError>;

    /// Range query over a secondary index, ordered by creation instant
    /// (ties broken by discriminator key)
    async fn query_index(&self, query: IndexQuery) -> Result<Vec<Item>, DriverError>;
}
