//! Rows and their lifecycle.

use std::collections::HashMap;

use gridcrm_core::{ColumnId, RowId};
use serde::{Deserialize, Serialize};

use crate::value::CellValue;

/// Sparse value bag of a row.
pub type RowValues = HashMap<ColumnId, CellValue>;

/// Where a row's identity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrigin {
    /// Local only: padding, freshly inserted, or imported but not yet created
    /// in the store. Never sent as a delete.
    #[default]
    Placeholder,
    /// Created in the store; the id is store-assigned.
    Durable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    #[serde(default)]
    pub origin: RowOrigin,
    #[serde(default)]
    pub values: RowValues,
}

impl Row {
    pub fn placeholder() -> Self {
        Self { id: RowId::local(), origin: RowOrigin::Placeholder, values: HashMap::new() }
    }

    pub fn durable(id: impl Into<RowId>, values: RowValues) -> Self {
        Self { id: id.into(), origin: RowOrigin::Durable, values }
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == RowOrigin::Placeholder
    }

    pub fn get(&self, col: &ColumnId) -> Option<&CellValue> {
        self.values.get(col)
    }

    /// True if any value carries user data.
    pub fn has_data(&self) -> bool {
        self.values.values().any(|v| !v.is_empty())
    }

    /// True if none of `cols` holds data.
    pub fn is_blank_in<'a>(&self, cols: impl IntoIterator<Item = &'a ColumnId>) -> bool {
        cols.into_iter().all(|c| self.get(c).map_or(true, CellValue::is_empty))
    }

    /// Values worth sending to the store when the row is created.
    pub fn non_empty_values(&self) -> RowValues {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_no_data_until_written() {
        let mut row = Row::placeholder();
        assert!(row.is_placeholder());
        assert!(!row.has_data());

        row.values.insert("name".into(), CellValue::text(""));
        assert!(!row.has_data());

        row.values.insert("name".into(), CellValue::text("Acme"));
        assert!(row.has_data());
        assert_eq!(row.non_empty_values().len(), 1);
    }

    #[test]
    fn blank_in_subset() {
        let mut values = RowValues::new();
        values.insert("a".into(), CellValue::text("x"));
        let row = Row::durable("r1", values);
        assert!(row.is_blank_in([&ColumnId::new("b")]));
        assert!(!row.is_blank_in([&ColumnId::new("a"), &ColumnId::new("b")]));
    }
}
