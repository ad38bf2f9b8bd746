//! Multi-select tag editor for one cell.
//!
//! Unlike the text editor there is no cancel: every structural change is
//! committed as it happens, and closing commits the final list once more.
//! Opening the editor on a different cell closes the current one first.

use gridcrm_core::{CellKey, RowId};

use crate::column::TagOption;
use crate::palette::next_color;

/// Tag list to write into `cell`, plus the option created by this change, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCommit {
    pub cell: CellKey,
    pub tags: Vec<String>,
    pub new_option: Option<TagOption>,
}

#[derive(Debug, Clone)]
struct TagSession {
    cell: CellKey,
    tags: Vec<String>,
    /// Column options at open time plus any created since
    options: Vec<TagOption>,
    filter: String,
}

#[derive(Debug, Default)]
pub struct TagEditor {
    open: Option<TagSession>,
}

impl TagEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn cell(&self) -> Option<&CellKey> {
        self.open.as_ref().map(|s| &s.cell)
    }

    pub fn tags(&self) -> &[String] {
        self.open.as_ref().map_or(&[], |s| s.tags.as_slice())
    }

    pub fn filter(&self) -> &str {
        self.open.as_ref().map_or("", |s| s.filter.as_str())
    }

    /// Open on `cell`. Returns the closing commit of a session on another cell.
    pub fn open(&mut self, cell: CellKey, current: &[String], options: &[TagOption]) -> Option<TagCommit> {
        if self.cell() == Some(&cell) {
            return None;
        }
        let previous = self.close();
        self.open = Some(TagSession {
            cell,
            tags: current.to_vec(),
            options: options.to_vec(),
            filter: String::new(),
        });
        previous
    }

    /// Options matching the filter (case-insensitive substring), in column order.
    pub fn filtered_options(&self) -> Vec<&TagOption> {
        let Some(session) = &self.open else {
            return Vec::new();
        };
        let needle = session.filter.to_lowercase();
        session
            .options
            .iter()
            .filter(|o| needle.is_empty() || o.label.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn set_filter(&mut self, text: &str) {
        if let Some(session) = &mut self.open {
            session.filter = text.to_string();
        }
    }

    /// Add `label` if absent, remove it if present.
    pub fn toggle(&mut self, label: &str) -> Option<TagCommit> {
        let present = self.open.as_ref()?.position(label).is_some();
        if present {
            self.remove(label)
        } else {
            self.add(label)
        }
    }

    /// Add `label`. Labels matching an existing option (case-insensitive) use
    /// the option's spelling; unknown labels create a new option.
    pub fn add(&mut self, label: &str) -> Option<TagCommit> {
        let session = self.open.as_mut()?;
        let label = label.trim();
        if label.is_empty() || session.position(label).is_some() {
            return None;
        }

        let new_option = match session.options.iter().find(|o| o.label.eq_ignore_ascii_case(label)) {
            Some(existing) => {
                session.tags.push(existing.label.clone());
                None
            }
            None => {
                let option = TagOption {
                    id: format!("opt-{}", uuid::Uuid::new_v4().simple()),
                    label: label.to_string(),
                    color: next_color(&session.options).to_string(),
                };
                session.options.push(option.clone());
                session.tags.push(option.label.clone());
                Some(option)
            }
        };
        Some(session.commit(new_option))
    }

    pub fn remove(&mut self, label: &str) -> Option<TagCommit> {
        let session = self.open.as_mut()?;
        let idx = session.position(label)?;
        session.tags.remove(idx);
        Some(session.commit(None))
    }

    /// Add the current filter text as a tag, creating the option if needed.
    /// Clears the filter.
    pub fn create_from_filter(&mut self) -> Option<TagCommit> {
        let filter = std::mem::take(&mut self.open.as_mut()?.filter);
        self.add(&filter)
    }

    /// Close the editor, committing the final tag list.
    pub fn close(&mut self) -> Option<TagCommit> {
        self.open.take().map(|s| s.commit(None))
    }

    pub fn rewrite_row_id(&mut self, from: &RowId, to: &RowId) {
        if let Some(session) = &mut self.open {
            if &session.cell.row == from {
                session.cell.row = to.clone();
            }
        }
    }

    /// Drop a session whose row vanished. Nothing is committed.
    pub fn discard_if_row(&mut self, row: &RowId) {
        if self.cell().is_some_and(|c| &c.row == row) {
            self.open = None;
        }
    }
}

impl TagSession {
    fn position(&self, label: &str) -> Option<usize> {
        self.tags.iter().position(|t| t.eq_ignore_ascii_case(label.trim()))
    }

    fn commit(&self, new_option: Option<TagOption>) -> TagCommit {
        TagCommit { cell: self.cell.clone(), tags: self.tags.clone(), new_option }
    }
}
