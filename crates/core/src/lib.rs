//! `gridcrm-core`: identity and selection types shared by every grid crate.
//!
//! No IO, no async. Everything here is addressed by id, never by position,
//! so it stays valid while rows and columns are reordered underneath it.

pub mod ids;
pub mod selection;

pub use ids::{CellKey, ColumnId, RowId, TableId};
pub use selection::Selection;
