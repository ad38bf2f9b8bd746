//! The sync worker: owns the snapshot and pushes local changes to the store.
//!
//! One worker per grid. Passes run one at a time (`&mut self`), so the
//! snapshot has a single writer. The grid lock is taken only to clone the
//! table and to promote rows; it is never held across a store call.

use std::sync::Arc;

use gridcrm_core::RowId;
use gridcrm_engine::{GridState, Row, Table};
use parking_lot::Mutex;
use smol::channel::{Receiver, Sender, TrySendError};

use crate::diff::{diff, SyncOp};
use crate::events::GridEvent;
use crate::snapshot::Snapshot;
use crate::store::{StoreError, TableStore};

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub applied: usize,
    pub failed: usize,
    pub adopted: usize,
    /// (placeholder id, durable id) for every create that succeeded
    pub promoted: Vec<(RowId, RowId)>,
}

pub struct SyncWorker {
    state: Arc<Mutex<GridState>>,
    store: Arc<dyn TableStore>,
    snapshot: Snapshot,
    wake: Receiver<()>,
    events: Sender<GridEvent>,
}

impl SyncWorker {
    pub(crate) fn new(
        state: Arc<Mutex<GridState>>,
        store: Arc<dyn TableStore>,
        snapshot: Snapshot,
        wake: Receiver<()>,
        events: Sender<GridEvent>,
    ) -> Self {
        Self { state, store, snapshot, wake, events }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[cfg(test)]
    pub(crate) fn pending_wakes(&self) -> usize {
        self.wake.len()
    }

    /// Run passes until every `Grid` handle is dropped. Wake-ups that
    /// arrive while a pass is running collapse into one follow-up pass.
    pub async fn run(mut self) {
        while self.wake.recv().await.is_ok() {
            self.sync_once().await;
        }
        log::debug!("sync worker stopped: no grid handles left");
    }

    /// Diff the current table against the snapshot and execute the plan.
    pub async fn sync_once(&mut self) -> SyncReport {
        let current = self.state.lock().table().clone();
        let plan = diff(&self.snapshot, &current);

        let mut report = SyncReport::default();
        for row in plan.adopted {
            log::debug!("adopting row {} into snapshot", row.id);
            self.snapshot.put_row(row);
            report.adopted += 1;
        }

        if plan.ops.is_empty() {
            return report;
        }

        for op in &plan.ops {
            match self.execute(&current, op, &mut report).await {
                Ok(()) => {
                    log::debug!("sync {} ok{}", op.name(), describe_row(op));
                    report.applied += 1;
                }
                Err(error) => {
                    log::warn!("sync {} failed{}: {}", op.name(), describe_row(op), error);
                    report.failed += 1;
                    self.emit(GridEvent::SyncFailed { op: op.name(), row: op.row().cloned(), error });
                }
            }
        }

        self.emit(GridEvent::SyncCompleted { applied: report.applied, failed: report.failed });
        report
    }

    async fn execute(&mut self, current: &Table, op: &SyncOp, report: &mut SyncReport) -> Result<(), StoreError> {
        let table_id = &current.id;
        match op {
            SyncOp::ReplaceColumns(columns) => {
                self.store.update_table(table_id, columns.clone()).await?;
                self.snapshot.set_columns(columns.clone());
            }
            SyncOp::DeleteRow(row) => {
                self.store.delete_row(table_id, row).await?;
                self.snapshot.remove_row(row);
            }
            SyncOp::CreateRow { local_id, values } => {
                let created = self.store.create_row(table_id, values.clone()).await?;
                let durable = created.id;

                // Row list, selection, progress, editors and aliases switch in one lock hold
                let promoted = self.state.lock().promote_row(local_id, &durable);
                if promoted {
                    report.promoted.push((local_id.clone(), durable.clone()));
                    self.emit(GridEvent::RowPromoted { from: local_id.clone(), to: durable.clone() });
                } else {
                    // The snapshot keeps the durable row, so the next pass deletes it remotely
                    log::debug!("row {} removed while its create was in flight", local_id);
                }

                let sent = current.row(local_id).map_or_else(|| values.clone(), |r| r.values.clone());
                self.snapshot.remove_row(local_id);
                self.snapshot.put_row(Row::durable(durable, sent));
            }
            SyncOp::UpdateRow { row, values } => {
                self.store.update_row(table_id, row, values.clone()).await?;
                self.snapshot.merge_values(row, values.clone());
            }
        }
        Ok(())
    }

    fn emit(&self, event: GridEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => log::debug!("event buffer full, dropping {:?}", event),
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

fn describe_row(op: &SyncOp) -> String {
    op.row().map(|r| format!(" for row {}", r)).unwrap_or_default()
}
