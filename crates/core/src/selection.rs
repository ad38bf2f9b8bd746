//! Selection model: selected rows, selected cells, and the anchor used to
//! resolve range extension.
//!
//! Positions are never stored. Every range operation takes the *current*
//! row and column order, so a selection survives sorting and reordering and
//! a range is always computed against what the user currently sees.

use std::collections::HashSet;

use crate::ids::{CellKey, ColumnId, RowId};

/// Inclusive rectangle of positions in the current row/column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl Bounds {
    /// Create bounds, normalizing so start <= end.
    pub fn new(r1: usize, c1: usize, r2: usize, c2: usize) -> Self {
        Self {
            start_row: r1.min(r2),
            start_col: c1.min(c2),
            end_row: r1.max(r2),
            end_col: c1.max(c2),
        }
    }

    pub fn single(row: usize, col: usize) -> Self {
        Self { start_row: row, start_col: col, end_row: row, end_col: col }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    pub fn cell_count(&self) -> usize {
        (self.end_row - self.start_row + 1) * (self.end_col - self.start_col + 1)
    }

    /// All positions in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let (start_col, end_col) = (self.start_col, self.end_col);
        (self.start_row..=self.end_row).flat_map(move |r| (start_col..=end_col).map(move |c| (r, c)))
    }
}

/// Row and cell selection over a table.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    rows: HashSet<RowId>,
    cells: HashSet<CellKey>,
    anchor: Option<CellKey>,
    /// Last row acted on by `toggle_row`, separate from the cell anchor.
    last_row: Option<RowId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self) -> Option<&CellKey> {
        self.anchor.as_ref()
    }

    pub fn last_row(&self) -> Option<&RowId> {
        self.last_row.as_ref()
    }

    pub fn selected_rows(&self) -> &HashSet<RowId> {
        &self.rows
    }

    pub fn selected_cells(&self) -> &HashSet<CellKey> {
        &self.cells
    }

    pub fn is_row_selected(&self, row: &RowId) -> bool {
        self.rows.contains(row)
    }

    pub fn is_cell_selected(&self, cell: &CellKey) -> bool {
        self.cells.contains(cell)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_single_cell(&self) -> bool {
        self.cells.len() == 1
    }

    /// The only selected cell, if exactly one is selected.
    pub fn single_cell(&self) -> Option<&CellKey> {
        if self.cells.len() == 1 {
            self.cells.iter().next()
        } else {
            None
        }
    }

    /// Plain click: select exactly this cell and move the anchor to it.
    pub fn select_cell(&mut self, row: RowId, col: ColumnId) {
        let cell = CellKey { row, col };
        self.cells.clear();
        self.cells.insert(cell.clone());
        self.anchor = Some(cell);
    }

    /// Ctrl+click: toggle one cell in or out of a free-form selection.
    /// The clicked cell becomes the anchor either way.
    pub fn add_cell(&mut self, row: RowId, col: ColumnId) {
        let cell = CellKey { row, col };
        if !self.cells.remove(&cell) {
            self.cells.insert(cell.clone());
        }
        self.anchor = Some(cell);
    }

    /// Shift+click/drag: replace the cell selection with the rectangle between
    /// the anchor and the target, in the given display order.
    ///
    /// Returns false (and leaves the selection untouched) when there is no
    /// anchor or when the anchor or target can't be located, e.g. because the
    /// row was deleted while the pointer was down.
    pub fn extend_to(&mut self, row: &RowId, col: &ColumnId, rows: &[RowId], cols: &[ColumnId]) -> bool {
        let Some(anchor) = &self.anchor else {
            return false;
        };
        let located = (
            position(rows, &anchor.row),
            position(cols, &anchor.col),
            position(rows, row),
            position(cols, col),
        );
        let (Some(ar), Some(ac), Some(tr), Some(tc)) = located else {
            return false;
        };

        let bounds = Bounds::new(ar, ac, tr, tc);
        self.cells = bounds
            .cells()
            .map(|(r, c)| CellKey { row: rows[r].clone(), col: cols[c].clone() })
            .collect();
        true
    }

    /// Toggle a row's checkbox. With `extend`, every row between the last
    /// toggled row and this one (inclusive, table order) takes this row's new
    /// state. Falls back to a single toggle if the last row is gone.
    pub fn toggle_row(&mut self, id: &RowId, extend: bool, rows: &[RowId]) {
        let select = !self.rows.contains(id);

        let span = if extend {
            self.last_row
                .as_ref()
                .and_then(|last| position(rows, last))
                .zip(position(rows, id))
        } else {
            None
        };

        match span {
            Some((from, to)) => {
                for row in &rows[from.min(to)..=from.max(to)] {
                    if select {
                        self.rows.insert(row.clone());
                    } else {
                        self.rows.remove(row);
                    }
                }
            }
            None => {
                if select {
                    self.rows.insert(id.clone());
                } else {
                    self.rows.remove(id);
                }
            }
        }

        self.last_row = Some(id.clone());
    }

    pub fn select_all_rows(&mut self, rows: &[RowId]) {
        self.rows = rows.iter().cloned().collect();
    }

    pub fn clear_rows(&mut self) {
        self.rows.clear();
        self.last_row = None;
    }

    pub fn clear_cells(&mut self) {
        self.cells.clear();
        self.anchor = None;
    }

    pub fn clear(&mut self) {
        self.clear_rows();
        self.clear_cells();
    }

    /// Bounding box of the locatable selected cells.
    pub fn bounds(&self, rows: &[RowId], cols: &[ColumnId]) -> Option<Bounds> {
        let mut positions = self.located_cells(rows, cols);
        let (r0, c0) = positions.next()?;
        let mut b = Bounds::single(r0, c0);
        for (r, c) in positions {
            b = Bounds::new(b.start_row.min(r), b.start_col.min(c), b.end_row.max(r), b.end_col.max(c));
        }
        Some(b)
    }

    /// True when the selected cells fill their bounding box exactly.
    pub fn is_rectangular(&self, rows: &[RowId], cols: &[ColumnId]) -> bool {
        match self.bounds(rows, cols) {
            Some(b) => b.cell_count() == self.located_cells(rows, cols).count(),
            None => false,
        }
    }

    /// Positionally first selected cell: lowest row index, then lowest column index.
    pub fn first_cell(&self, rows: &[RowId], cols: &[ColumnId]) -> Option<CellKey> {
        self.located_cells(rows, cols)
            .min()
            .map(|(r, c)| CellKey { row: rows[r].clone(), col: cols[c].clone() })
    }

    /// Drop ids that no longer exist in the table.
    pub fn retain_existing(&mut self, rows: &[RowId], cols: &[ColumnId]) {
        let row_set: HashSet<&RowId> = rows.iter().collect();
        let col_set: HashSet<&ColumnId> = cols.iter().collect();

        self.rows.retain(|r| row_set.contains(r));
        self.cells.retain(|c| row_set.contains(&c.row) && col_set.contains(&c.col));
        if matches!(&self.anchor, Some(a) if !row_set.contains(&a.row) || !col_set.contains(&a.col)) {
            self.anchor = None;
        }
        if matches!(&self.last_row, Some(r) if !row_set.contains(r)) {
            self.last_row = None;
        }
    }

    /// Replace every reference to `from` with `to` (placeholder promotion).
    pub fn rewrite_row_id(&mut self, from: &RowId, to: &RowId) {
        if self.rows.remove(from) {
            self.rows.insert(to.clone());
        }

        let moved: Vec<CellKey> = self.cells.iter().filter(|c| &c.row == from).cloned().collect();
        for cell in moved {
            self.cells.remove(&cell);
            self.cells.insert(CellKey { row: to.clone(), col: cell.col });
        }

        if let Some(anchor) = &mut self.anchor {
            if &anchor.row == from {
                anchor.row = to.clone();
            }
        }
        if self.last_row.as_ref() == Some(from) {
            self.last_row = Some(to.clone());
        }
    }

    /// True if `id` appears anywhere in the selection state.
    pub fn references_row(&self, id: &RowId) -> bool {
        self.rows.contains(id)
            || self.cells.iter().any(|c| &c.row == id)
            || self.anchor.as_ref().is_some_and(|a| &a.row == id)
            || self.last_row.as_ref() == Some(id)
    }

    fn located_cells<'a>(
        &'a self,
        rows: &'a [RowId],
        cols: &'a [ColumnId],
    ) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.cells
            .iter()
            .filter_map(move |c| Some((position(rows, &c.row)?, position(cols, &c.col)?)))
    }
}

fn position<T: PartialEq>(items: &[T], item: &T) -> Option<usize> {
    items.iter().position(|x| x == item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rows(n: usize) -> Vec<RowId> {
        (0..n).map(|i| RowId::new(format!("r{i}"))).collect()
    }

    fn cols(n: usize) -> Vec<ColumnId> {
        (0..n).map(|i| ColumnId::new(format!("c{i}"))).collect()
    }

    fn key(r: &str, c: &str) -> CellKey {
        CellKey::new(r, c)
    }

    #[test]
    fn select_cell_resets_anchor() {
        let mut sel = Selection::new();
        sel.select_cell("r1".into(), "c1".into());
        sel.select_cell("r2".into(), "c0".into());
        assert_eq!(sel.anchor(), Some(&key("r2", "c0")));
        assert_eq!(sel.cell_count(), 1);
    }

    #[test]
    fn extend_builds_rectangle_and_keeps_anchor() {
        let rows = rows(5);
        let cols = cols(4);
        let mut sel = Selection::new();
        sel.select_cell("r3".into(), "c2".into());

        assert!(sel.extend_to(&"r1".into(), &"c0".into(), &rows, &cols));

        assert_eq!(sel.cell_count(), 9);
        assert!(sel.is_cell_selected(&key("r1", "c0")));
        assert!(sel.is_cell_selected(&key("r3", "c2")));
        assert!(!sel.is_cell_selected(&key("r4", "c2")));
        assert_eq!(sel.anchor(), Some(&key("r3", "c2")));

        // Shrinking again from the same anchor
        assert!(sel.extend_to(&"r3".into(), &"c2".into(), &rows, &cols));
        assert_eq!(sel.cell_count(), 1);
    }

    #[test]
    fn extend_uses_display_order_not_id_order() {
        // Rows displayed in reverse id order
        let rows: Vec<RowId> = vec!["r9".into(), "r1".into(), "r5".into()];
        let cols = cols(1);
        let mut sel = Selection::new();
        sel.select_cell("r9".into(), "c0".into());
        sel.extend_to(&"r1".into(), &"c0".into(), &rows, &cols);

        assert!(sel.is_cell_selected(&key("r9", "c0")));
        assert!(sel.is_cell_selected(&key("r1", "c0")));
        assert!(!sel.is_cell_selected(&key("r5", "c0")));
    }

    #[test]
    fn extend_without_anchor_is_noop() {
        let mut sel = Selection::new();
        assert!(!sel.extend_to(&"r0".into(), &"c0".into(), &rows(2), &cols(2)));
        assert_eq!(sel.cell_count(), 0);
    }

    #[test]
    fn extend_to_deleted_row_is_noop() {
        let mut sel = Selection::new();
        sel.select_cell("r0".into(), "c0".into());
        let before = sel.selected_cells().clone();
        assert!(!sel.extend_to(&"gone".into(), &"c1".into(), &rows(3), &cols(3)));
        assert_eq!(sel.selected_cells(), &before);
    }

    #[test]
    fn extend_from_deleted_anchor_is_noop() {
        let mut sel = Selection::new();
        sel.select_cell("gone".into(), "c0".into());
        assert!(!sel.extend_to(&"r1".into(), &"c1".into(), &rows(3), &cols(3)));
        assert_eq!(sel.cell_count(), 1);
    }

    #[test]
    fn add_cell_builds_free_form_selection() {
        let rows = rows(3);
        let cols = cols(3);
        let mut sel = Selection::new();
        sel.select_cell("r0".into(), "c0".into());
        sel.add_cell("r2".into(), "c2".into());

        assert_eq!(sel.cell_count(), 2);
        assert!(!sel.is_rectangular(&rows, &cols));
        assert_eq!(sel.anchor(), Some(&key("r2", "c2")));

        // Second ctrl+click toggles it back out
        sel.add_cell("r2".into(), "c2".into());
        assert_eq!(sel.cell_count(), 1);
    }

    #[test]
    fn first_cell_is_positional() {
        let rows: Vec<RowId> = vec!["b".into(), "a".into()];
        let cols: Vec<ColumnId> = vec!["y".into(), "x".into()];
        let mut sel = Selection::new();
        sel.select_cell("a".into(), "x".into());
        sel.add_cell("b".into(), "x".into());
        sel.add_cell("a".into(), "y".into());

        assert_eq!(sel.first_cell(&rows, &cols), Some(key("b", "x")));
    }

    #[test]
    fn toggle_row_range_uses_last_row() {
        let rows = rows(6);
        let mut sel = Selection::new();
        sel.toggle_row(&"r1".into(), false, &rows);
        sel.toggle_row(&"r4".into(), true, &rows);

        for i in 1..=4 {
            assert!(sel.is_row_selected(&RowId::new(format!("r{i}"))));
        }
        assert!(!sel.is_row_selected(&"r0".into()));
        assert!(!sel.is_row_selected(&"r5".into()));
        assert_eq!(sel.last_row(), Some(&"r4".into()));

        // Extending upward from r4 to r2 deselects because r2 is selected
        sel.toggle_row(&"r2".into(), true, &rows);
        assert!(!sel.is_row_selected(&"r2".into()));
        assert!(!sel.is_row_selected(&"r3".into()));
        assert!(!sel.is_row_selected(&"r4".into()));
        assert!(sel.is_row_selected(&"r1".into()));
    }

    #[test]
    fn toggle_row_does_not_touch_cell_anchor() {
        let rows = rows(3);
        let mut sel = Selection::new();
        sel.select_cell("r0".into(), "c0".into());
        sel.toggle_row(&"r2".into(), false, &rows);
        assert_eq!(sel.anchor(), Some(&key("r0", "c0")));
    }

    #[test]
    fn select_all_and_clear() {
        let rows = rows(4);
        let mut sel = Selection::new();
        sel.select_all_rows(&rows);
        assert_eq!(sel.selected_rows().len(), 4);
        sel.select_cell("r0".into(), "c0".into());
        sel.clear();
        assert!(sel.selected_rows().is_empty());
        assert_eq!(sel.cell_count(), 0);
        assert!(sel.anchor().is_none());
    }

    #[test]
    fn rewrite_row_id_moves_every_reference() {
        let rows: Vec<RowId> = vec!["local-1".into(), "r2".into()];
        let cols = cols(2);
        let mut sel = Selection::new();
        sel.select_cell("local-1".into(), "c0".into());
        sel.extend_to(&"local-1".into(), &"c1".into(), &rows, &cols);
        sel.toggle_row(&"local-1".into(), false, &rows);

        sel.rewrite_row_id(&"local-1".into(), &"row_77".into());

        assert!(!sel.references_row(&"local-1".into()));
        assert!(sel.is_row_selected(&"row_77".into()));
        assert!(sel.is_cell_selected(&key("row_77", "c0")));
        assert!(sel.is_cell_selected(&key("row_77", "c1")));
        assert_eq!(sel.anchor(), Some(&key("row_77", "c0")));
        assert_eq!(sel.last_row(), Some(&"row_77".into()));
    }

    #[test]
    fn retain_existing_drops_deleted_rows() {
        let mut sel = Selection::new();
        sel.select_cell("r0".into(), "c0".into());
        sel.add_cell("r1".into(), "c0".into());
        sel.toggle_row(&"r1".into(), false, &rows(2));

        sel.retain_existing(&["r0".into()], &cols(1));

        assert_eq!(sel.cell_count(), 1);
        assert!(sel.selected_rows().is_empty());
        assert!(sel.anchor().is_none());
        assert!(sel.last_row().is_none());
    }

    proptest! {
        #[test]
        fn extend_yields_exact_rectangle(
            row_order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle(),
            col_order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle(),
            ar in 0..8usize, ac in 0..5usize, tr in 0..8usize, tc in 0..5usize,
        ) {
            let rows: Vec<RowId> = row_order.iter().map(|i| RowId::new(format!("r{i}"))).collect();
            let cols: Vec<ColumnId> = col_order.iter().map(|i| ColumnId::new(format!("c{i}"))).collect();

            let mut sel = Selection::new();
            sel.select_cell(rows[ar].clone(), cols[ac].clone());
            prop_assert!(sel.extend_to(&rows[tr], &cols[tc], &rows, &cols));

            let expected: HashSet<CellKey> = Bounds::new(ar, ac, tr, tc)
                .cells()
                .map(|(r, c)| CellKey { row: rows[r].clone(), col: cols[c].clone() })
                .collect();
            prop_assert_eq!(sel.selected_cells(), &expected);
            prop_assert!(sel.is_rectangular(&rows, &cols));
        }
    }
}
