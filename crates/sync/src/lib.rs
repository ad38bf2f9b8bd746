//! Synchronization between the grid and its table store.
//!
//! - `store`: the `TableStore` collaborator and `MemoryStore` for tests
//! - `diff`: pure snapshot-vs-table change detection
//! - `worker`: executes plans and promotes placeholder rows
//! - `grid`: the shared `Grid` handle that wakes the worker on change

pub mod diff;
pub mod events;
pub mod grid;
pub mod memory;
pub mod snapshot;
pub mod store;
pub mod worker;

pub use diff::{diff, SyncOp, SyncPlan};
pub use events::GridEvent;
pub use grid::Grid;
pub use memory::{CallKind, MemoryStore, StoreCall};
pub use snapshot::Snapshot;
pub use store::{StoreError, TableStore};
pub use worker::{SyncReport, SyncWorker};
