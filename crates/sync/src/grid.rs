//! `Grid`: the shared handle to grid state.
//!
//! Every mutation goes through the handle so the sync worker is woken
//! afterwards. The wake channel holds a single token: mutations that land
//! while a wake is already pending are covered by that pass.

use std::sync::Arc;

use gridcrm_core::TableId;
use gridcrm_engine::{GridState, Table, TableUpdate};
use parking_lot::Mutex;
use smol::channel::{self, Receiver, Sender, TrySendError};

use crate::events::GridEvent;
use crate::snapshot::Snapshot;
use crate::store::{StoreError, TableStore};
use crate::worker::SyncWorker;

const EVENT_BUFFER: usize = 256;

#[derive(Clone)]
pub struct Grid {
    state: Arc<Mutex<GridState>>,
    wake: Sender<()>,
    events: Receiver<GridEvent>,
}

impl Grid {
    /// Wrap `table` and create its worker. The snapshot starts as a copy of
    /// `table`, so nothing is sent until the first local change.
    pub fn new(table: Table, store: Arc<dyn TableStore>) -> (Self, SyncWorker) {
        let snapshot = Snapshot::of(&table);
        let state = Arc::new(Mutex::new(GridState::new(table)));
        let (wake_tx, wake_rx) = channel::bounded(1);
        let (event_tx, event_rx) = channel::bounded(EVENT_BUFFER);
        let worker = SyncWorker::new(state.clone(), store, snapshot, wake_rx, event_tx);
        (Self { state, wake: wake_tx, events: event_rx }, worker)
    }

    /// Fetch a table from the store and pad it with `placeholder_rows`
    /// empty rows.
    pub async fn load(
        store: Arc<dyn TableStore>,
        table_id: &TableId,
        placeholder_rows: usize,
    ) -> Result<(Self, SyncWorker), StoreError> {
        let mut table = store.get_table(table_id).await?;
        let min_rows = table.rows().len() + placeholder_rows;
        table.pad_placeholders(min_rows);
        log::info!("loaded table {} ({} rows, {} columns)", table.id, table.rows().len(), table.columns().len());
        Ok(Self::new(table, store))
    }

    pub fn update(&self, update: TableUpdate) -> u64 {
        let revision = self.state.lock().apply_update(update);
        self.wake();
        revision
    }

    /// In-place table mutation.
    pub fn update_with<R>(&self, f: impl FnOnce(&mut Table) -> R) -> R {
        let out = self.state.lock().update_with(f);
        self.wake();
        out
    }

    pub fn read<R>(&self, f: impl FnOnce(&Table) -> R) -> R {
        f(self.state.lock().table())
    }

    /// Full access to the grid state (selection, editors, progress).
    /// The worker is woken only if the table changed.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut GridState) -> R) -> R {
        let (out, changed) = {
            let mut state = self.state.lock();
            let before = state.revision();
            let out = f(&mut *state);
            (out, state.revision() != before)
        };
        if changed {
            self.wake();
        }
        out
    }

    pub fn table(&self) -> Table {
        self.read(Table::clone)
    }

    pub fn events(&self) -> Receiver<GridEvent> {
        self.events.clone()
    }

    fn wake(&self) {
        match self.wake.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => log::debug!("sync worker gone, change stays local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use gridcrm_core::CellKey;
    use gridcrm_engine::{Column, ColumnType};

    fn grid() -> (Grid, SyncWorker) {
        let mut t = Table::new("t1", "Leads");
        t.add_column(Column::new("name", "Name", ColumnType::Text)).unwrap();
        t.push_placeholder();
        let store = Arc::new(MemoryStore::with_table(t.clone()));
        Grid::new(t, store)
    }

    #[test]
    fn selection_changes_do_not_wake_the_worker() {
        let (g, worker) = grid();
        let row = g.read(|t| t.rows()[0].id.clone());
        g.with_state(|s| s.select_cell(CellKey::new(row, "name"))).unwrap();
        assert_eq!(worker.pending_wakes(), 0);
    }

    #[test]
    fn wakes_are_coalesced() {
        let (g, worker) = grid();
        let row = g.read(|t| t.rows()[0].id.clone());
        g.update_with(|t| t.set_raw(&row, &"name".into(), "Acme")).unwrap();
        g.update_with(|t| t.set_raw(&row, &"name".into(), "Acme Corp")).unwrap();
        g.update(TableUpdate::apply(|t| t));
        assert_eq!(worker.pending_wakes(), 1);
    }

    #[test]
    fn load_pads_with_placeholders() {
        let mut t = Table::new("t1", "Leads");
        t.add_column(Column::new("name", "Name", ColumnType::Text)).unwrap();
        let store = Arc::new(MemoryStore::with_table(t));
        let (g, _worker) = smol::block_on(Grid::load(store, &"t1".into(), 3)).unwrap();
        assert_eq!(g.read(|t| t.rows().len()), 3);
        assert!(g.read(|t| t.rows().iter().all(|r| r.is_placeholder())));
    }
}
