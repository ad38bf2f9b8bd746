// Notifications from the sync worker to whoever holds a `Grid`.

use gridcrm_core::RowId;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// A placeholder row was created in the store and now carries its
    /// durable id everywhere.
    RowPromoted { from: RowId, to: RowId },
    /// A store call failed. Local state keeps the optimistic value and the
    /// next pass will detect the change again.
    SyncFailed { op: &'static str, row: Option<RowId>, error: StoreError },
    /// A pass with at least one store call finished.
    SyncCompleted { applied: usize, failed: usize },
}
