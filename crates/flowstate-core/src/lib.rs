//! Core types for the flowstate storage layer.
//!
//! Entities (runs, steps, hooks, events), their status enums, the
//! cursor-based pagination contract, and the `StoreError` taxonomy shared by
//! every store. This crate is pure types; the data-access layer lives in
//! `flowstate-storage`.

pub mod error;
pub mod event;
pub mod hook;
pub mod page;
pub mod run;
pub mod step;

pub use error::{StoreError, StoreResult};
pub use event::{CreateEvent, Event};
pub use hook::Hook;
pub use page::{Cursor, Page, Pagination, SortOrder};
pub use run::{CreateRun, ListRunsFilter, Run, RunStatus, UpdateRun};
pub use step::{CreateStep, Step, StepStatus, UpdateStep};
