//! Copy and paste of selected cells as tab-separated text.
//!
//! Copy groups the selected cells by row (table order), then by column
//! (table order). Values travel as their raw text, so formulas are copied
//! as formulas. Paste writes the block starting at the positionally first
//! selected cell and never grows the table.

use std::collections::BTreeMap;

use gridcrm_core::{CellKey, Selection};

use crate::column::ValueError;
use crate::table::{Table, TableError};

/// Serialize the selected cells. `None` when no selected cell is in the table.
pub fn copy_selection(table: &Table, selection: &Selection) -> Option<String> {
    let mut by_row: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();

    for cell in selection.selected_cells() {
        let (Some(r), Some(c)) = (table.row_index(&cell.row), table.column_index(&cell.col)) else {
            continue;
        };
        let raw = table.value(&cell.row, &cell.col).map(|v| v.raw()).unwrap_or_default();
        by_row.entry(r).or_default().insert(c, raw);
    }

    if by_row.is_empty() {
        return None;
    }

    let lines: Vec<String> = by_row
        .into_values()
        .map(|cols| cols.into_values().collect::<Vec<_>>().join("\t"))
        .collect();
    Some(lines.join("\n"))
}

/// Split clipboard text into a grid. Accepts `\r\n`; one trailing line
/// terminator does not produce an extra empty row.
pub fn parse_clipboard(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

/// Result of a paste. Skipped cells are not errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasteReport {
    /// Cells whose stored value changed
    pub written: usize,
    /// Cells that already held the pasted value
    pub unchanged: usize,
    /// Source cells that would land outside the table
    pub out_of_bounds: usize,
    /// Source cells whose text does not fit the destination column
    pub rejected: Vec<(CellKey, ValueError)>,
}

/// Paste `text` with its top-left cell at `anchor`.
pub fn paste(table: &mut Table, anchor: &CellKey, text: &str) -> PasteReport {
    let mut report = PasteReport::default();
    let (Some(anchor_row), Some(anchor_col)) = (table.row_index(&anchor.row), table.column_index(&anchor.col)) else {
        log::debug!("paste anchor {} is no longer in the table", anchor);
        return report;
    };

    let row_ids = table.row_ids();
    let col_ids = table.column_ids();

    for (dr, line) in parse_clipboard(text).into_iter().enumerate() {
        for (dc, raw) in line.into_iter().enumerate() {
            let (Some(row), Some(col)) = (row_ids.get(anchor_row + dr), col_ids.get(anchor_col + dc)) else {
                report.out_of_bounds += 1;
                continue;
            };
            match table.set_raw(row, col, &raw) {
                Ok(true) => report.written += 1,
                Ok(false) => report.unchanged += 1,
                Err(TableError::Value(e)) => report.rejected.push((CellKey::new(row.clone(), col.clone()), e)),
                Err(e) => log::debug!("paste skipped {}:{}: {}", row, col, e),
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, ColumnType};
    use crate::row::{Row, RowValues};
    use crate::value::CellValue;
    use gridcrm_core::{ColumnId, RowId};

    fn table() -> Table {
        let mut t = Table::new("t1", "Leads");
        t.add_column(Column::new("c-name", "Name", ColumnType::Text)).unwrap();
        t.add_column(Column::new("c-rev", "Revenue", ColumnType::Number)).unwrap();
        t.add_column(Column::new("c-stage", "Stage", ColumnType::Tag)).unwrap();

        let mut v = RowValues::new();
        v.insert("c-name".into(), CellValue::text("Acme"));
        v.insert("c-rev".into(), CellValue::Number(1200.0));
        v.insert("c-stage".into(), CellValue::Tags(vec!["Lead".into(), "Hot".into()]));
        t.push_row(Row::durable("r1", v)).unwrap();

        let mut v = RowValues::new();
        v.insert("c-name".into(), CellValue::text("=[Revenue] * 2"));
        t.push_row(Row::durable("r2", v)).unwrap();

        t.push_placeholder();
        t.push_placeholder();
        t
    }

    fn select_block(t: &Table, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Selection {
        let row_ids = t.row_ids();
        let col_ids = t.column_ids();
        let mut sel = Selection::new();
        sel.select_cell(row_ids[rows.start].clone(), col_ids[cols.start].clone());
        sel.extend_to(&row_ids[rows.end - 1], &col_ids[cols.end - 1], &row_ids, &col_ids);
        sel
    }

    #[test]
    fn copy_is_row_major_in_table_order() {
        let t = table();
        let sel = select_block(&t, 0..2, 0..3);
        assert_eq!(
            copy_selection(&t, &sel).unwrap(),
            "Acme\t1200\tLead, Hot\n=[Revenue] * 2\t\t"
        );
    }

    #[test]
    fn copy_of_nothing() {
        assert!(copy_selection(&table(), &Selection::new()).is_none());
    }

    #[test]
    fn round_trip_into_empty_rows() {
        let mut t = table();
        let copied = copy_selection(&t, &select_block(&t, 0..2, 0..3)).unwrap();

        let target_row = t.row_ids()[2].clone();
        let report = paste(&mut t, &CellKey::new(target_row, "c-name"), &copied);
        assert_eq!(report.out_of_bounds, 0);
        assert!(report.rejected.is_empty());

        let again = copy_selection(&t, &select_block(&t, 2..4, 0..3)).unwrap();
        assert_eq!(again, copied);
    }

    #[test]
    fn paste_clips_at_table_edges() {
        let mut t = table();
        let last_row = t.row_ids()[3].clone();
        let report = paste(&mut t, &CellKey::new(last_row.clone(), "c-stage"), "a\tb\nc\td\n");
        assert_eq!(report.written, 1);
        assert_eq!(report.out_of_bounds, 3);
        assert_eq!(
            t.value(&last_row, &ColumnId::new("c-stage")),
            Some(&CellValue::Tags(vec!["a".into()]))
        );
    }

    #[test]
    fn paste_skips_values_that_do_not_fit() {
        let mut t = table();
        let r1 = RowId::new("r1");
        let report = paste(&mut t, &CellKey::new(r1.clone(), "c-name"), "Globex\tlots\r\n");
        assert_eq!(report.written, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(t.value(&r1, &ColumnId::new("c-rev")), Some(&CellValue::Number(1200.0)));
    }

    #[test]
    fn trailing_terminator_is_not_a_row() {
        assert_eq!(parse_clipboard("a\tb\r\nc\td\r\n"), vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(parse_clipboard("a\n\n"), vec![vec!["a".to_string()], vec![String::new()]]);
        assert!(parse_clipboard("").is_empty());
    }
}
