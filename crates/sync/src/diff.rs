//! Pure change detection between the snapshot and the current table.
//!
//! Operations come out in a fixed order: column replacement, deletes,
//! creates, updates. Comparison is empty-normalized (absent, `Empty` and
//! blank text are equal) with one exception: a column absent from the
//! snapshot row that is now present with any value, empty included, counts
//! as changed.

use std::collections::HashSet;

use gridcrm_core::RowId;
use gridcrm_engine::value::values_equivalent;
use gridcrm_engine::{CellValue, Column, Row, RowValues, Table};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    ReplaceColumns(Vec<Column>),
    DeleteRow(RowId),
    /// Create a placeholder row remotely; `values` are its non-empty values.
    CreateRow { local_id: RowId, values: RowValues },
    /// Partial update of a durable row: only the differing columns.
    UpdateRow { row: RowId, values: RowValues },
}

impl SyncOp {
    pub fn name(&self) -> &'static str {
        match self {
            SyncOp::ReplaceColumns(_) => "update_table",
            SyncOp::DeleteRow(_) => "delete_row",
            SyncOp::CreateRow { .. } => "create_row",
            SyncOp::UpdateRow { .. } => "update_row",
        }
    }

    pub fn row(&self) -> Option<&RowId> {
        match self {
            SyncOp::ReplaceColumns(_) => None,
            SyncOp::DeleteRow(row) | SyncOp::UpdateRow { row, .. } => Some(row),
            SyncOp::CreateRow { local_id, .. } => Some(local_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub ops: Vec<SyncOp>,
    /// Durable rows the snapshot has never seen. They join the snapshot
    /// as-is without a store call.
    pub adopted: Vec<Row>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.adopted.is_empty()
    }
}

pub fn diff(snapshot: &Snapshot, current: &Table) -> SyncPlan {
    let mut plan = SyncPlan::default();

    if snapshot.columns() != current.columns() {
        plan.ops.push(SyncOp::ReplaceColumns(current.columns().to_vec()));
    }

    let live: HashSet<&RowId> = current.rows().iter().map(|r| &r.id).collect();
    for old in snapshot.rows() {
        if !live.contains(&old.id) && !old.is_placeholder() {
            plan.ops.push(SyncOp::DeleteRow(old.id.clone()));
        }
    }

    let mut updates = Vec::new();
    for row in current.rows() {
        let old = snapshot.row(&row.id);
        if row.is_placeholder() {
            if !row.has_data() {
                continue;
            }
            let changed = old.map_or(true, |old| !changed_values(old, row, current.columns()).is_empty());
            if changed {
                plan.ops.push(SyncOp::CreateRow { local_id: row.id.clone(), values: row.non_empty_values() });
            }
            continue;
        }

        match old {
            Some(old) => {
                let values = changed_values(old, row, current.columns());
                if !values.is_empty() {
                    updates.push(SyncOp::UpdateRow { row: row.id.clone(), values });
                }
            }
            None => plan.adopted.push(row.clone()),
        }
    }
    plan.ops.extend(updates);

    plan
}

/// Columns of `new` that differ from `old`, with their new values.
pub fn changed_values(old: &Row, new: &Row, columns: &[Column]) -> RowValues {
    columns
        .iter()
        .filter_map(|col| {
            let before = old.get(&col.id);
            let after = new.get(&col.id);
            cell_changed(before, after).then(|| (col.id.clone(), after.cloned().unwrap_or(CellValue::Empty)))
        })
        .collect()
}

fn cell_changed(before: Option<&CellValue>, after: Option<&CellValue>) -> bool {
    match (before, after) {
        (None, Some(_)) => true,
        _ => !values_equivalent(before, after),
    }
}
