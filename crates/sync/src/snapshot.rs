// Last-synchronized copy of a table, used only as the diff baseline.

use gridcrm_core::RowId;
use gridcrm_engine::{Column, Row, RowValues, Table};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Snapshot {
    pub fn of(table: &Table) -> Self {
        Self { columns: table.columns().to_vec(), rows: table.rows().to_vec() }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: &RowId) -> Option<&Row> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    /// Insert or replace a row by id.
    pub fn put_row(&mut self, row: Row) {
        match self.rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
    }

    pub fn remove_row(&mut self, id: &RowId) -> Option<Row> {
        let index = self.rows.iter().position(|r| &r.id == id)?;
        Some(self.rows.remove(index))
    }

    /// Record a partial update that the store accepted.
    pub fn merge_values(&mut self, id: &RowId, values: RowValues) {
        if let Some(row) = self.rows.iter_mut().find(|r| &r.id == id) {
            row.values.extend(values);
        }
    }
}
