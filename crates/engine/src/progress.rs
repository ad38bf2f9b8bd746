//! Per-cell enrichment progress.
//!
//! Entries are keyed by cell and move forward through the phases only:
//!
//! ```text
//! discovery -> extraction -> financial -> complete
//!     |            |             |
//!     +------------+-------------+------> error
//! ```
//!
//! (`discovery` may also jump straight to `financial` or `complete`.)
//! Progress is display state: it is never persisted, and it is cleared a
//! short while after a batch ends unless a newer batch started meanwhile.

use std::collections::HashMap;

use gridcrm_core::{CellKey, ColumnId, RowId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Discovery,
    Extraction,
    Financial,
    Complete,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }

    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Discovery, Extraction | Financial | Complete | Error)
                | (Extraction, Financial | Complete | Error)
                | (Financial, Complete | Error)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// What enrichment found for one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentResult {
    pub field: String,
    pub value: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellProgress {
    pub phase: Phase,
    pub result: Option<EnrichmentResult>,
    pub error: Option<String>,
}

impl CellProgress {
    fn new(phase: Phase) -> Self {
        Self { phase, result: None, error: None }
    }
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    cells: HashMap<CellKey, CellProgress>,
    generation: u64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, row: &RowId, col: &ColumnId) -> Option<&CellProgress> {
        self.cells.get(&CellKey::new(row.clone(), col.clone()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CellKey, &CellProgress)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True while any entry is still moving.
    pub fn is_active(&self) -> bool {
        self.cells.values().any(|p| !p.phase.is_terminal())
    }

    /// Start a batch over `cells`: stale entries for them are dropped and the
    /// generation advances. The returned generation guards the delayed clear.
    pub fn begin_batch(&mut self, cells: impl IntoIterator<Item = CellKey>) -> u64 {
        for cell in cells {
            self.cells.remove(&cell);
        }
        self.generation += 1;
        self.generation
    }

    /// Move `cols` of `row` to `phase`. Cells without an entry start there;
    /// backwards or out-of-terminal moves are ignored.
    pub fn set_phase(&mut self, row: &RowId, cols: &[ColumnId], phase: Phase) {
        for col in cols {
            self.advance(CellKey::new(row.clone(), col.clone()), phase);
        }
    }

    pub fn complete(&mut self, row: &RowId, col: &ColumnId, result: Option<EnrichmentResult>) {
        let key = CellKey::new(row.clone(), col.clone());
        if let Some(entry) = self.advance(key, Phase::Complete) {
            entry.result = result;
        }
    }

    pub fn fail(&mut self, row: &RowId, cols: &[ColumnId], message: &str) {
        for col in cols {
            if let Some(entry) = self.advance(CellKey::new(row.clone(), col.clone()), Phase::Error) {
                entry.error = Some(message.to_string());
            }
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Clear everything unless a batch newer than `generation` has started.
    pub fn clear_if_current(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            log::debug!("progress clear for batch {} skipped, batch {} is newer", generation, self.generation);
            return false;
        }
        self.cells.clear();
        true
    }

    pub fn rewrite_row_id(&mut self, from: &RowId, to: &RowId) {
        let moved: Vec<CellKey> = self.cells.keys().filter(|k| &k.row == from).cloned().collect();
        for key in moved {
            if let Some(entry) = self.cells.remove(&key) {
                self.cells.insert(CellKey::new(to.clone(), key.col), entry);
            }
        }
    }

    pub fn remove_row(&mut self, row: &RowId) {
        self.cells.retain(|k, _| &k.row != row);
    }

    fn advance(&mut self, key: CellKey, next: Phase) -> Option<&mut CellProgress> {
        let entry = self.cells.entry(key).or_insert_with(|| CellProgress::new(next));
        if entry.phase == next && entry.result.is_none() && entry.error.is_none() {
            // Fresh entry, or a repeated non-terminal phase
            return Some(entry);
        }
        if !entry.phase.can_advance_to(next) {
            log::warn!("ignoring progress transition {:?} -> {:?}", entry.phase, next);
            return None;
        }
        entry.phase = next;
        Some(entry)
    }
}
