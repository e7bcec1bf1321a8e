//! # Flowstate storage layer
//!
//! Persists the state of a workflow orchestration engine: runs, the steps
//! within a run, registered callback hooks, and an append-only event log per
//! run. All four entity types share one keyed table; identity and
//! state-transition invariants are enforced through backend conditional
//! writes, and every list operation paginates with cursors derived from the
//! record's natural sort attribute.
//!
//! ## Architecture
//!
//! ```text
//! WorkflowStorage
//!   ├── RunStore    ─┐
//!   ├── StepStore    ├── keys + ids + records + projection
//!   ├── HookStore    │
//!   └── EventStore  ─┘
//!            │
//!            ▼
//!   StorageDriver (trait)
//!   ├── MemoryDriver    (tests / dev mode)
//!   └── PostgresDriver  (production)
//! ```
//!
//! Stores never call each other; composition happens only here, in the
//! facade that assembles all four over one shared driver.
//!
//! ## Example
//!
//! ```
//! use flowstate_core::CreateRun;
//! use flowstate_storage::WorkflowStorage;
//!
//! # async fn demo() -> flowstate_core::StoreResult<()> {
//! let storage = WorkflowStorage::in_memory();
//! let run = storage
//!     .runs
//!     .create(CreateRun {
//!         workflow_name: "demo".to_string(),
//!         input: serde_json::json!({"n": 1}),
//!         execution_context: None,
//!         deployment_id: "dep_1".to_string(),
//!     })
//!     .await?;
//! let fetched = storage.runs.get(&run.run_id).await?;
//! assert_eq!(fetched, run);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod event_store;
pub mod hook_store;
pub mod ids;
pub mod keys;
pub mod logging;
pub mod project;
pub mod records;
pub mod run_store;
pub mod step_store;

use std::sync::Arc;

use flowstate_core::StoreResult;

use driver::{MemoryDriver, PostgresDriver, StorageDriver};

pub use config::StorageConfig;
pub use event_store::{EventStore, DEFAULT_EVENT_PAGE_LIMIT};
pub use hook_store::{HookStore, DEFAULT_HOOK_PAGE_LIMIT};
pub use logging::{LoggedEventStore, LoggedHookStore, LoggedRunStore, LoggedStepStore};
pub use run_store::{RunStore, DEFAULT_RUN_PAGE_LIMIT};
pub use step_store::{StepStore, DEFAULT_STEP_PAGE_LIMIT};

/// All four entity stores over one shared backend driver
#[derive(Clone)]
pub struct WorkflowStorage {
    pub runs: RunStore,
    pub steps: StepStore,
    pub hooks: HookStore,
    pub events: EventStore,
}

impl WorkflowStorage {
    /// Assemble the stores over an existing driver
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            runs: RunStore::new(driver.clone()),
            steps: StepStore::new(driver.clone()),
            hooks: HookStore::new(driver.clone()),
            events: EventStore::new(driver),
        }
    }

    /// In-memory storage for tests and dev mode
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryDriver::new()))
    }

    /// PostgreSQL-backed storage; connects and ensures the schema
    pub async fn postgres(database_url: &str) -> StoreResult<Self> {
        let driver = PostgresDriver::connect(database_url).await?;
        Ok(Self::new(Arc::new(driver)))
    }

    /// Wrap every store in its logging decorator
    pub fn logged(&self) -> LoggedWorkflowStorage {
        LoggedWorkflowStorage {
            runs: LoggedRunStore::new(self.runs.clone()),
            steps: LoggedStepStore::new(self.steps.clone()),
            hooks: LoggedHookStore::new(self.hooks.clone()),
            events: LoggedEventStore::new(self.events.clone()),
        }
    }
}

/// The storage facade with call logging around every store method
#[derive(Clone)]
pub struct LoggedWorkflowStorage {
    pub runs: LoggedRunStore,
    pub steps: LoggedStepStore,
    pub hooks: LoggedHookStore,
    pub events: LoggedEventStore,
}
