//! The table: ordered columns plus ordered rows.
//!
//! Invariants kept here:
//! - column ids are unique
//! - `Column::order` equals the column's index (dense, 0..n)
//! - every stored value fits its column's type

use gridcrm_core::{ColumnId, RowId, TableId};
use serde::{Deserialize, Serialize};

use crate::column::{Column, ValueError};
use crate::row::{Row, RowOrigin};
use crate::value::CellValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(id: impl Into<TableId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a table from store data. Columns are sorted by their stored
    /// order and renumbered; duplicate column ids keep the first occurrence.
    pub fn from_parts(
        id: impl Into<TableId>,
        name: impl Into<String>,
        mut columns: Vec<Column>,
        rows: Vec<Row>,
    ) -> Self {
        columns.sort_by_key(|c| c.order);
        let mut table = Self::new(id, name);
        for col in columns {
            if table.column(&col.id).is_none() {
                table.columns.push(col);
            }
        }
        table.renumber_columns();
        table.rows = rows;
        table
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// First column with this title (exact match).
    pub fn column_by_title(&self, title: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.title == title)
    }

    /// First column whose title matches ignoring ASCII case and surrounding
    /// whitespace. Used where titles come from outside (AI responses, file
    /// headers).
    pub fn column_by_title_loose(&self, title: &str) -> Option<&Column> {
        let wanted = title.trim();
        self.columns.iter().find(|c| c.title.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    pub fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id.clone()).collect()
    }

    /// Append a column at the end.
    pub fn add_column(&mut self, column: Column) -> Result<(), TableError> {
        let at = self.columns.len();
        self.insert_column_at(at, column)
    }

    pub fn insert_column_at(&mut self, index: usize, column: Column) -> Result<(), TableError> {
        if self.column(&column.id).is_some() {
            return Err(TableError::DuplicateColumn(column.id));
        }
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
        self.renumber_columns();
        Ok(())
    }

    /// Remove a column and every value stored under it.
    pub fn remove_column(&mut self, id: &ColumnId) -> Option<Column> {
        let index = self.column_index(id)?;
        let removed = self.columns.remove(index);
        for row in &mut self.rows {
            row.values.remove(id);
        }
        self.renumber_columns();
        Some(removed)
    }

    pub fn move_column(&mut self, id: &ColumnId, to: usize) -> bool {
        let Some(from) = self.column_index(id) else {
            return false;
        };
        let column = self.columns.remove(from);
        let to = to.min(self.columns.len());
        self.columns.insert(to, column);
        self.renumber_columns();
        true
    }

    /// Edit a column's metadata in place. The id and order are restored
    /// afterwards; they are not the caller's to change.
    pub fn update_column(&mut self, id: &ColumnId, f: impl FnOnce(&mut Column)) -> bool {
        let Some(index) = self.column_index(id) else {
            return false;
        };
        let column = &mut self.columns[index];
        f(column);
        column.id = id.clone();
        column.order = index;
        true
    }

    fn renumber_columns(&mut self) {
        for (i, col) in self.columns.iter_mut().enumerate() {
            col.order = i;
        }
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: &RowId) -> Option<&Row> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn row_index(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|r| &r.id == id)
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.id.clone()).collect()
    }

    pub fn value(&self, row: &RowId, col: &ColumnId) -> Option<&CellValue> {
        self.row(row).and_then(|r| r.get(col))
    }

    /// Append a row after checking its values against the columns.
    /// Values for unknown columns are rejected.
    pub fn push_row(&mut self, row: Row) -> Result<(), TableError> {
        let at = self.rows.len();
        self.insert_row_at(at, row)
    }

    pub fn insert_row_at(&mut self, index: usize, row: Row) -> Result<(), TableError> {
        if self.row(&row.id).is_some() {
            return Err(TableError::DuplicateRow(row.id));
        }
        for (col_id, value) in &row.values {
            let column = self.column(col_id).ok_or_else(|| TableError::UnknownColumn(col_id.clone()))?;
            column.check(value).map_err(TableError::Value)?;
        }
        let index = index.min(self.rows.len());
        self.rows.insert(index, row);
        Ok(())
    }

    /// Append an empty placeholder row and return its id.
    pub fn push_placeholder(&mut self) -> RowId {
        let row = Row::placeholder();
        let id = row.id.clone();
        self.rows.push(row);
        id
    }

    pub fn remove_row(&mut self, id: &RowId) -> Option<Row> {
        let index = self.row_index(id)?;
        Some(self.rows.remove(index))
    }

    /// Pad with empty placeholder rows until the table has `min_rows` rows.
    pub fn pad_placeholders(&mut self, min_rows: usize) -> usize {
        let mut added = 0;
        while self.rows.len() < min_rows {
            self.push_placeholder();
            added += 1;
        }
        added
    }

    /// Write a typed value. Returns whether the stored value changed.
    pub fn set_value(&mut self, row: &RowId, col: &ColumnId, value: CellValue) -> Result<bool, TableError> {
        let column = self.column(col).ok_or_else(|| TableError::UnknownColumn(col.clone()))?;
        column.check(&value).map_err(TableError::Value)?;
        let row = self
            .rows
            .iter_mut()
            .find(|r| &r.id == row)
            .ok_or_else(|| TableError::UnknownRow(row.clone()))?;

        if row.values.get(col) == Some(&value) {
            return Ok(false);
        }
        row.values.insert(col.clone(), value);
        Ok(true)
    }

    /// Write raw text, converting it through the column's type.
    pub fn set_raw(&mut self, row: &RowId, col: &ColumnId, raw: &str) -> Result<bool, TableError> {
        let column = self.column(col).ok_or_else(|| TableError::UnknownColumn(col.clone()))?;
        let value = column.coerce(raw).map_err(TableError::Value)?;
        self.set_value(row, col, value)
    }

    /// Give a row its store-assigned identity. Returns false if the row is gone.
    pub fn promote_row(&mut self, from: &RowId, to: &RowId) -> bool {
        match self.rows.iter_mut().find(|r| &r.id == from) {
            Some(row) => {
                row.id = to.clone();
                row.origin = RowOrigin::Durable;
                true
            }
            None => false,
        }
    }

    /// Placeholder rows with no data in any of `cols`, in table order.
    pub fn reusable_placeholders(&self, cols: &[ColumnId]) -> Vec<RowId> {
        self.rows
            .iter()
            .filter(|r| r.is_placeholder() && r.is_blank_in(cols))
            .map(|r| r.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    UnknownRow(RowId),
    UnknownColumn(ColumnId),
    DuplicateRow(RowId),
    DuplicateColumn(ColumnId),
    Value(ValueError),
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::UnknownRow(id) => write!(f, "unknown row: {id}"),
            TableError::UnknownColumn(id) => write!(f, "unknown column: {id}"),
            TableError::DuplicateRow(id) => write!(f, "duplicate row id: {id}"),
            TableError::DuplicateColumn(id) => write!(f, "duplicate column id: {id}"),
            TableError::Value(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TableError {}
