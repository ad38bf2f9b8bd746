//! Grid state: the table plus everything that points into it.
//!
//! All table mutations go through `apply_update` (or its in-place form
//! `update_with`), which bumps the revision and drops selection, progress and
//! editor state that refers to rows or columns that no longer exist.
//! Row promotion (`promote_row`) rewrites a row id everywhere in one call, so
//! holding the state lock around it makes the rewrite atomic.

use std::collections::HashMap;

use gridcrm_core::{CellKey, ColumnId, RowId, Selection};

use crate::clipboard::{self, PasteReport};
use crate::editing::{CellEditor, EditKey, EditOutcome};
use crate::formula::evaluate_with_rows;
use crate::progress::ProgressTracker;
use crate::table::{Table, TableError};
use crate::tag_editor::{TagCommit, TagEditor};
use crate::value::CellValue;

/// A table mutation.
pub enum TableUpdate {
    /// Swap in a whole new table (e.g. after reloading from the store)
    Replace(Table),
    /// Derive the next table from the current one
    Apply(Box<dyn FnOnce(Table) -> Table + Send>),
}

impl TableUpdate {
    pub fn apply(f: impl FnOnce(Table) -> Table + Send + 'static) -> Self {
        TableUpdate::Apply(Box::new(f))
    }
}

impl std::fmt::Debug for TableUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableUpdate::Replace(t) => f.debug_tuple("Replace").field(&t.id).finish(),
            TableUpdate::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

#[derive(Debug)]
pub struct GridState {
    table: Table,
    pub selection: Selection,
    pub progress: ProgressTracker,
    pub editor: CellEditor,
    pub tag_editor: TagEditor,
    /// Placeholder id -> durable id, for work still holding the old id
    aliases: HashMap<RowId, RowId>,
    revision: u64,
}

impl GridState {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            selection: Selection::new(),
            progress: ProgressTracker::new(),
            editor: CellEditor::new(),
            tag_editor: TagEditor::new(),
            aliases: HashMap::new(),
            revision: 0,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Incremented on every table mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ------------------------------------------------------------------
    // Mutation entry point
    // ------------------------------------------------------------------

    pub fn apply_update(&mut self, update: TableUpdate) -> u64 {
        let next = match update {
            TableUpdate::Replace(table) => table,
            TableUpdate::Apply(f) => {
                let placeholder = Table::new(self.table.id.clone(), self.table.name.clone());
                f(std::mem::replace(&mut self.table, placeholder))
            }
        };
        self.table = next;
        self.after_mutation()
    }

    /// In-place form of `apply_update`.
    pub fn update_with<R>(&mut self, f: impl FnOnce(&mut Table) -> R) -> R {
        let out = f(&mut self.table);
        self.after_mutation();
        out
    }

    fn after_mutation(&mut self) -> u64 {
        self.revision += 1;

        let row_ids = self.table.row_ids();
        let col_ids = self.table.column_ids();
        self.selection.retain_existing(&row_ids, &col_ids);

        let vanished: Vec<RowId> = self
            .progress
            .entries()
            .map(|(k, _)| &k.row)
            .chain(self.editor.cell().map(|c| &c.row))
            .chain(self.tag_editor.cell().map(|c| &c.row))
            .filter(|r| self.table.row(r).is_none())
            .cloned()
            .collect();
        for row in &vanished {
            self.progress.remove_row(row);
            self.editor.discard_if_row(row);
            self.tag_editor.discard_if_row(row);
        }

        self.revision
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Give a placeholder row its durable id: row list, selection, progress,
    /// editors and the alias map all switch over together.
    pub fn promote_row(&mut self, from: &RowId, to: &RowId) -> bool {
        if !self.table.promote_row(from, to) {
            log::debug!("promotion of {} skipped, row is gone", from);
            return false;
        }
        self.selection.rewrite_row_id(from, to);
        self.progress.rewrite_row_id(from, to);
        self.editor.rewrite_row_id(from, to);
        self.tag_editor.rewrite_row_id(from, to);

        for target in self.aliases.values_mut() {
            if target == from {
                *target = to.clone();
            }
        }
        self.aliases.insert(from.clone(), to.clone());
        true
    }

    /// Current id of a row that may have been promoted since `id` was taken.
    /// `None` if the row no longer exists.
    pub fn resolve_row(&self, id: &RowId) -> Option<RowId> {
        let current = self.aliases.get(id).unwrap_or(id);
        self.table.row(current).map(|r| r.id.clone())
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Write raw text into a cell through the column's type. Returns whether
    /// anything changed; an unchanged value is not a mutation.
    pub fn commit_text(&mut self, cell: &CellKey, raw: &str) -> Result<bool, TableError> {
        let row = self.resolve_row(&cell.row).ok_or_else(|| TableError::UnknownRow(cell.row.clone()))?;
        let column = self
            .table
            .column(&cell.col)
            .ok_or_else(|| TableError::UnknownColumn(cell.col.clone()))?;
        let value = column.coerce(raw).map_err(TableError::Value)?;

        if self.table.value(&row, &cell.col) == Some(&value) {
            return Ok(false);
        }
        self.update_with(|t| t.set_value(&row, &cell.col, value))
    }

    /// Apply what the text editor produced. Cancelled sessions write nothing,
    /// and a commit whose row or column no longer exists is dropped.
    pub fn apply_edit(&mut self, outcome: EditOutcome) -> Result<bool, TableError> {
        match outcome {
            EditOutcome::Committed { cell, value, .. } => match self.commit_text(&cell, &value) {
                Err(TableError::UnknownRow(_) | TableError::UnknownColumn(_)) => {
                    log::debug!("edit of {} dropped, cell no longer exists", cell);
                    Ok(false)
                }
                other => other,
            },
            EditOutcome::Cancelled { .. } => Ok(false),
        }
    }

    /// Run one editor transition and apply its outcome. When the column
    /// rejects the committed text, the session that was live before the
    /// transition is put back with its draft and the error is returned.
    fn drive_editor(&mut self, step: impl FnOnce(&mut CellEditor) -> Option<EditOutcome>) -> Result<(), TableError> {
        let live = self.editor.session().cloned();
        let Some(outcome) = step(&mut self.editor) else {
            return Ok(());
        };
        match self.apply_edit(outcome) {
            Ok(_) => Ok(()),
            Err(e) => {
                if let Some(session) = live {
                    self.editor.restore(session);
                }
                Err(e)
            }
        }
    }

    /// Same as `commit_tags`, but a cell that vanished is not an error.
    fn apply_tag_commit(&mut self, commit: TagCommit) -> Result<(), TableError> {
        let cell = commit.cell.clone();
        match self.commit_tags(commit) {
            Err(TableError::UnknownRow(_) | TableError::UnknownColumn(_)) => {
                log::debug!("tag edit of {} dropped, cell no longer exists", cell);
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    /// Apply a tag editor commit, registering a newly created option first.
    pub fn commit_tags(&mut self, commit: TagCommit) -> Result<bool, TableError> {
        let row = self
            .resolve_row(&commit.cell.row)
            .ok_or_else(|| TableError::UnknownRow(commit.cell.row.clone()))?;
        if self.table.column(&commit.cell.col).is_none() {
            return Err(TableError::UnknownColumn(commit.cell.col.clone()));
        }

        let value = CellValue::Tags(commit.tags);
        let option = commit.new_option;
        let col = commit.cell.col;
        let unchanged = option.is_none() && self.table.value(&row, &col) == Some(&value);
        if unchanged {
            return Ok(false);
        }

        self.update_with(|t| {
            if let Some(option) = option {
                t.update_column(&col, |c| {
                    if c.option_by_label(&option.label).is_none() {
                        c.options.push(option);
                    }
                });
            }
            t.set_value(&row, &col, value)
        })
    }

    /// Plain click on a cell: commits an edit in progress elsewhere, closes a
    /// tag editor on another cell, then selects.
    ///
    /// If the pending edit does not fit its column, the click is refused:
    /// the editor stays open on its cell with the draft and the selection
    /// does not move.
    pub fn select_cell(&mut self, cell: CellKey) -> Result<(), TableError> {
        self.drive_editor(|editor| editor.select_other(&cell))?;
        if self.tag_editor.cell().is_some_and(|c| c != &cell) {
            if let Some(commit) = self.tag_editor.close() {
                self.apply_tag_commit(commit)?;
            }
        }
        self.selection.select_cell(cell.row, cell.col);
        Ok(())
    }

    /// Route a key to the text editor, applying any outcome it produces.
    pub fn handle_key(&mut self, key: EditKey) -> Result<(), TableError> {
        let selected = self.selection.single_cell().cloned();
        let current = selected
            .as_ref()
            .and_then(|c| self.table.value(&c.row, &c.col))
            .map(CellValue::raw)
            .unwrap_or_default();
        self.drive_editor(|editor| editor.handle_key(selected.as_ref(), key, &current))
    }

    /// Double activation of a cell.
    pub fn begin_edit(&mut self, cell: CellKey) -> Result<(), TableError> {
        let current = self.table.value(&cell.row, &cell.col).map(CellValue::raw).unwrap_or_default();
        self.drive_editor(|editor| editor.begin(cell, &current))
    }

    /// Open the tag editor on a tag cell, committing a tag session on another cell.
    pub fn open_tag_editor(&mut self, cell: CellKey) -> Result<(), TableError> {
        let column = self
            .table
            .column(&cell.col)
            .ok_or_else(|| TableError::UnknownColumn(cell.col.clone()))?;
        let options = column.options.clone();
        let current: Vec<String> = self
            .table
            .value(&cell.row, &cell.col)
            .and_then(CellValue::as_tags)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        match self.tag_editor.open(cell, &current, &options) {
            Some(commit) => self.apply_tag_commit(commit),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    pub fn copy(&self) -> Option<String> {
        clipboard::copy_selection(&self.table, &self.selection)
    }

    /// Paste at the first selected cell. `None` if nothing is selected.
    pub fn paste(&mut self, text: &str) -> Option<PasteReport> {
        let anchor = self.selection.first_cell(&self.table.row_ids(), &self.table.column_ids())?;
        let report = self.update_with(|t| clipboard::paste(t, &anchor, text));
        Some(report)
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Text the grid shows for a cell; formulas are evaluated against the row.
    pub fn display(&self, row: &RowId, col: &ColumnId) -> String {
        let (Some(r), Some(value)) = (self.table.row(row), self.table.value(row, col)) else {
            return String::new();
        };
        if value.is_formula() {
            evaluate_with_rows(&value.raw(), r, self.table.columns(), self.table.rows()).to_display()
        } else {
            value.raw()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, ColumnType, TagOption};
    use crate::row::{Row, RowValues};

    fn state() -> GridState {
        let mut t = Table::new("t1", "Leads");
        t.add_column(Column::new("c-name", "Name", ColumnType::Text)).unwrap();
        t.add_column(Column::new("c-rev", "Revenue", ColumnType::Number)).unwrap();
        t.add_column(Column::new("c-stage", "Stage", ColumnType::Tag)).unwrap();
        let mut v = RowValues::new();
        v.insert("c-name".into(), CellValue::text("Acme"));
        t.push_row(Row::durable("r1", v)).unwrap();
        t.pad_placeholders(3);
        GridState::new(t)
    }

    #[test]
    fn unchanged_commit_is_not_a_mutation() {
        let mut s = state();
        let cell = CellKey::new("r1", "c-name");
        assert!(!s.commit_text(&cell, "Acme").unwrap());
        assert_eq!(s.revision(), 0);
        assert!(s.commit_text(&cell, "Globex").unwrap());
        assert_eq!(s.revision(), 1);
    }

    #[test]
    fn invalid_commit_leaves_table_alone() {
        let mut s = state();
        let err = s.commit_text(&CellKey::new("r1", "c-rev"), "a lot").unwrap_err();
        assert!(matches!(err, TableError::Value(_)));
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn typing_on_a_selected_cell_commits_on_enter() {
        let mut s = state();
        let cell = CellKey::new("r1", "c-rev");
        s.select_cell(cell.clone()).unwrap();
        for c in "42".chars() {
            s.handle_key(EditKey::Char(c)).unwrap();
        }
        s.handle_key(EditKey::Enter).unwrap();
        assert_eq!(s.table().value(&cell.row, &cell.col), Some(&CellValue::Number(42.0)));
    }

    #[test]
    fn clicking_elsewhere_commits_edit() {
        let mut s = state();
        let cell = CellKey::new("r1", "c-name");
        s.begin_edit(cell.clone()).unwrap();
        s.editor.set_value("Initech");
        s.select_cell(CellKey::new("r1", "c-rev")).unwrap();
        assert_eq!(s.table().value(&cell.row, &cell.col), Some(&CellValue::text("Initech")));
    }

    #[test]
    fn rejected_enter_keeps_the_draft_open() {
        let mut s = state();
        let cell = CellKey::new("r1", "c-rev");
        s.select_cell(cell.clone()).unwrap();
        for c in "abc".chars() {
            s.handle_key(EditKey::Char(c)).unwrap();
        }
        let session = s.editor.session_id();

        assert!(matches!(s.handle_key(EditKey::Enter), Err(TableError::Value(_))));
        assert_eq!(s.editor.session_id(), session);
        assert_eq!(s.editor.value(), Some("abc"));
        assert_eq!(s.table().value(&cell.row, &cell.col), None);

        // Fix the draft and commit again
        for _ in 0..3 {
            s.handle_key(EditKey::Backspace).unwrap();
        }
        s.handle_key(EditKey::Char('7')).unwrap();
        s.handle_key(EditKey::Enter).unwrap();
        assert!(!s.editor.is_editing());
        assert_eq!(s.table().value(&cell.row, &cell.col), Some(&CellValue::Number(7.0)));
    }

    #[test]
    fn rejected_click_away_keeps_editor_and_selection() {
        let mut s = state();
        let a = CellKey::new("r1", "c-rev");
        let b = CellKey::new("r1", "c-name");
        s.select_cell(a.clone()).unwrap();
        for c in "abc".chars() {
            s.handle_key(EditKey::Char(c)).unwrap();
        }

        assert!(matches!(s.select_cell(b.clone()), Err(TableError::Value(_))));
        assert_eq!(s.editor.cell(), Some(&a));
        assert_eq!(s.editor.value(), Some("abc"));
        assert!(s.selection.is_cell_selected(&a));
        assert!(!s.selection.is_cell_selected(&b));

        // Escape drops the draft, after which the click goes through
        s.handle_key(EditKey::Escape).unwrap();
        s.select_cell(b.clone()).unwrap();
        assert!(s.selection.is_cell_selected(&b));
        assert_eq!(s.table().value(&a.row, &a.col), None);
    }

    #[test]
    fn rejected_commit_while_opening_another_cell_restores_first_session() {
        let mut s = state();
        let a = CellKey::new("r1", "c-rev");
        s.begin_edit(a.clone()).unwrap();
        s.editor.set_value("lots");

        assert!(s.begin_edit(CellKey::new("r1", "c-name")).is_err());
        assert_eq!(s.editor.cell(), Some(&a));
        assert_eq!(s.editor.value(), Some("lots"));
    }

    #[test]
    fn commit_for_a_vanished_row_is_dropped() {
        let mut s = state();
        let outcome = EditOutcome::Committed {
            session: 9,
            cell: CellKey::new("gone", "c-name"),
            value: "Acme".into(),
        };
        assert_eq!(s.apply_edit(outcome), Ok(false));
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn tag_commit_registers_new_option() {
        let mut s = state();
        let cell = CellKey::new("r1", "c-stage");
        s.open_tag_editor(cell.clone()).unwrap();
        s.tag_editor.set_filter("Prospect");
        let commit = s.tag_editor.create_from_filter().unwrap();
        assert!(s.commit_tags(commit).unwrap());

        let col = s.table().column(&ColumnId::new("c-stage")).unwrap();
        assert_eq!(col.options.len(), 1);
        assert_eq!(col.options[0].label, "Prospect");
        assert_eq!(
            s.table().value(&cell.row, &cell.col),
            Some(&CellValue::Tags(vec!["Prospect".into()]))
        );

        // Closing commits the same list again, which changes nothing
        let close = s.tag_editor.close().unwrap();
        assert!(!s.commit_tags(close).unwrap());
    }

    #[test]
    fn existing_option_is_not_duplicated() {
        let mut s = state();
        s.update_with(|t| {
            t.update_column(&ColumnId::new("c-stage"), |c| {
                c.options.push(TagOption { id: "o1".into(), label: "Lead".into(), color: "#000".into() });
            })
        });
        let commit = TagCommit {
            cell: CellKey::new("r1", "c-stage"),
            tags: vec!["Lead".into()],
            new_option: Some(TagOption { id: "o2".into(), label: "lead".into(), color: "#111".into() }),
        };
        s.commit_tags(commit).unwrap();
        assert_eq!(s.table().column(&ColumnId::new("c-stage")).unwrap().options.len(), 1);
    }

    #[test]
    fn promotion_rewrites_every_reference() {
        let mut s = state();
        let local = s.table().row_ids()[1].clone();
        let cell = CellKey::new(local.clone(), "c-name");
        s.select_cell(cell.clone()).unwrap();
        let rows = s.table().row_ids();
        s.selection.toggle_row(&local, false, &rows);
        s.progress.set_phase(&local, &[ColumnId::new("c-rev")], crate::progress::Phase::Discovery);
        s.begin_edit(cell).unwrap();

        let durable = RowId::new("rec_1");
        assert!(s.promote_row(&local, &durable));

        assert!(s.table().row(&local).is_none());
        assert!(!s.table().row(&durable).unwrap().is_placeholder());
        assert!(!s.selection.references_row(&local));
        assert!(s.selection.is_row_selected(&durable));
        assert!(s.progress.get(&durable, &ColumnId::new("c-rev")).is_some());
        assert_eq!(s.editor.cell().unwrap().row, durable);
        assert_eq!(s.resolve_row(&local), Some(durable));
    }

    #[test]
    fn removing_a_row_drops_dependent_state() {
        let mut s = state();
        let local = s.table().row_ids()[2].clone();
        s.select_cell(CellKey::new(local.clone(), "c-name")).unwrap();
        s.progress.set_phase(&local, &[ColumnId::new("c-rev")], crate::progress::Phase::Discovery);
        let rev = s.revision();

        let gone = local.clone();
        s.apply_update(TableUpdate::apply(move |mut t| {
            t.remove_row(&gone);
            t
        }));
        assert_eq!(s.revision(), rev + 1);
        assert!(!s.selection.references_row(&local));
        assert!(s.progress.is_empty());
        assert_eq!(s.resolve_row(&local), None);
    }

    #[test]
    fn paste_uses_first_selected_cell() {
        let mut s = state();
        let rows = s.table().row_ids();
        let cols = s.table().column_ids();
        s.selection.select_cell(rows[1].clone(), cols[0].clone());
        s.selection.extend_to(&rows[2], &cols[1], &rows, &cols);
        let report = s.paste("Initech\t900").unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(s.display(&rows[1], &cols[1]), "900");
    }

    #[test]
    fn display_evaluates_formulas() {
        let mut s = state();
        let cell = CellKey::new("r1", "c-rev");
        s.commit_text(&cell, "1000").unwrap();
        s.commit_text(&CellKey::new("r1", "c-name"), "=[Revenue] / 4").unwrap();
        assert_eq!(s.display(&RowId::new("r1"), &ColumnId::new("c-name")), "250");
        s.commit_text(&CellKey::new("r1", "c-name"), "=SUM([Revenue])").unwrap();
        assert_eq!(s.display(&RowId::new("r1"), &ColumnId::new("c-name")), "1000");
    }
}
