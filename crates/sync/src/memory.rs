//! In-process `TableStore` with failure injection and a call log.
//!
//! Used by tests and demos. Row ids are assigned as `rec0001`, `rec0002`, ...

use std::collections::HashMap;

use async_trait::async_trait;
use gridcrm_core::{ColumnId, RowId, TableId};
use gridcrm_engine::{Column, Row, RowValues, Table};
use parking_lot::Mutex;
use smol::channel::{self, Receiver, Sender};

use crate::store::{StoreError, TableStore};

/// One recorded store request, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    CreateRow(RowValues),
    UpdateRow(RowId, RowValues),
    DeleteRow(RowId),
    UpdateTable(Vec<ColumnId>),
    GetTable(TableId),
}

impl StoreCall {
    pub fn kind(&self) -> CallKind {
        match self {
            StoreCall::CreateRow(_) => CallKind::CreateRow,
            StoreCall::UpdateRow(..) => CallKind::UpdateRow,
            StoreCall::DeleteRow(_) => CallKind::DeleteRow,
            StoreCall::UpdateTable(_) => CallKind::UpdateTable,
            StoreCall::GetTable(_) => CallKind::GetTable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    CreateRow,
    UpdateRow,
    DeleteRow,
    UpdateTable,
    GetTable,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<TableId, Table>,
    calls: Vec<StoreCall>,
    failures: Vec<(CallKind, StoreError)>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    create_gate: Mutex<Option<Receiver<()>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: Table) -> Self {
        let store = Self::new();
        store.insert_table(table);
        store
    }

    /// Store a table, keeping only its durable rows.
    pub fn insert_table(&self, table: Table) {
        let rows: Vec<Row> = table.rows().iter().filter(|r| !r.is_placeholder()).cloned().collect();
        let mut stored = Table::from_parts(table.id.clone(), table.name.clone(), table.columns().to_vec(), rows);
        stored.description = table.description;
        self.inner.lock().tables.insert(stored.id.clone(), stored);
    }

    /// Make the next call of `kind` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, kind: CallKind, error: StoreError) {
        self.inner.lock().failures.push((kind, error));
    }

    /// Hold every `create_row` until a message arrives on the returned
    /// sender. Dropping the sender releases all pending and future creates.
    pub fn gate_creates(&self) -> Sender<()> {
        let (tx, rx) = channel::unbounded();
        *self.create_gate.lock() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<StoreCall> {
        self.inner.lock().calls.iter().filter(|c| c.kind() == kind).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Current stored copy of a table.
    pub fn table(&self, id: &TableId) -> Option<Table> {
        self.inner.lock().tables.get(id).cloned()
    }

    /// Log the call and pop an injected failure for it, if any.
    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let kind = call.kind();
        inner.calls.push(call);
        match inner.failures.iter().position(|(k, _)| *k == kind) {
            Some(pos) => Err(inner.failures.remove(pos).1),
            None => Ok(()),
        }
    }
}

fn not_found(table: &TableId) -> StoreError {
    StoreError::NotFound(format!("table {}", table))
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn create_row(&self, table: &TableId, values: RowValues) -> Result<Row, StoreError> {
        let gate = self.create_gate.lock().clone();
        if let Some(gate) = gate {
            // A closed gate lets everything through
            let _ = gate.recv().await;
        }

        self.record(StoreCall::CreateRow(values.clone()))?;
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let row = Row::durable(format!("rec{:04}", inner.next_id), values);
        let stored = inner.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        stored.push_row(row.clone()).map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(row)
    }

    async fn update_row(&self, table: &TableId, row: &RowId, values: RowValues) -> Result<(), StoreError> {
        self.record(StoreCall::UpdateRow(row.clone(), values.clone()))?;
        let mut inner = self.inner.lock();
        let stored = inner.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        if stored.row(row).is_none() {
            return Err(StoreError::NotFound(format!("row {}", row)));
        }
        for (col, value) in values {
            stored.set_value(row, &col, value).map_err(|e| StoreError::Rejected(e.to_string()))?;
        }
        Ok(())
    }

    async fn delete_row(&self, table: &TableId, row: &RowId) -> Result<(), StoreError> {
        self.record(StoreCall::DeleteRow(row.clone()))?;
        let mut inner = self.inner.lock();
        let stored = inner.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        stored
            .remove_row(row)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("row {}", row)))
    }

    async fn update_table(&self, table: &TableId, columns: Vec<Column>) -> Result<(), StoreError> {
        self.record(StoreCall::UpdateTable(columns.iter().map(|c| c.id.clone()).collect()))?;
        let mut inner = self.inner.lock();
        let stored = inner.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        let mut next = Table::from_parts(stored.id.clone(), stored.name.clone(), columns, stored.rows().to_vec());
        next.description = std::mem::take(&mut stored.description);
        *stored = next;
        Ok(())
    }

    async fn get_table(&self, table: &TableId) -> Result<Table, StoreError> {
        self.record(StoreCall::GetTable(table.clone()))?;
        self.inner.lock().tables.get(table).cloned().ok_or_else(|| not_found(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcrm_engine::{CellValue, ColumnType};

    fn table() -> Table {
        let mut t = Table::new("t1", "Leads");
        t.add_column(Column::new("name", "Name", ColumnType::Text)).unwrap();
        t.push_placeholder();
        t
    }

    fn values(name: &str) -> RowValues {
        RowValues::from([(ColumnId::from("name"), CellValue::text(name))])
    }

    #[test]
    fn placeholders_are_not_stored() {
        let store = MemoryStore::with_table(table());
        assert!(store.table(&"t1".into()).unwrap().rows().is_empty());
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let store = MemoryStore::with_table(table());
        let t = TableId::from("t1");
        smol::block_on(async {
            let a = store.create_row(&t, values("Acme")).await.unwrap();
            let b = store.create_row(&t, values("Globex")).await.unwrap();
            assert_eq!(a.id.as_str(), "rec0001");
            assert_eq!(b.id.as_str(), "rec0002");
            assert!(!a.is_placeholder());
        });
        assert_eq!(store.table(&t).unwrap().rows().len(), 2);
    }

    #[test]
    fn injected_failure_is_consumed_once() {
        let store = MemoryStore::with_table(table());
        let t = TableId::from("t1");
        store.fail_next(CallKind::CreateRow, StoreError::Network("offline".into()));
        smol::block_on(async {
            assert_eq!(
                store.create_row(&t, values("Acme")).await.unwrap_err(),
                StoreError::Network("offline".into())
            );
            assert!(store.create_row(&t, values("Acme")).await.is_ok());
        });
        assert_eq!(store.calls_of(CallKind::CreateRow).len(), 2);
    }

    #[test]
    fn unknown_rows_and_tables() {
        let store = MemoryStore::with_table(table());
        smol::block_on(async {
            assert!(matches!(
                store.delete_row(&"t1".into(), &"nope".into()).await,
                Err(StoreError::NotFound(_))
            ));
            assert!(matches!(store.get_table(&"t2".into()).await, Err(StoreError::NotFound(_))));
        });
    }

    #[test]
    fn values_outside_the_schema_are_rejected() {
        let store = MemoryStore::with_table(table());
        let bad = RowValues::from([(ColumnId::from("ghost"), CellValue::text("x"))]);
        smol::block_on(async {
            assert!(matches!(store.create_row(&"t1".into(), bad).await, Err(StoreError::Rejected(_))));
        });
    }
}
