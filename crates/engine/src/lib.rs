//! Grid engine: the table model and the state machines that edit it.
//!
//! - `value`, `column`, `row`, `table`: typed cells, schema and rows
//! - `formula`: the `=` expression language shown in cells
//! - `editing`, `tag_editor`: in-place editors
//! - `clipboard`: TSV copy and paste
//! - `progress`: per-cell enrichment progress
//! - `grid`: the aggregate state and its single mutation entry point

pub mod clipboard;
pub mod column;
pub mod editing;
pub mod formula;
pub mod grid;
pub mod palette;
pub mod progress;
pub mod row;
pub mod table;
pub mod tag_editor;
pub mod value;

pub use column::{Column, ColumnType, TagOption, ValueError};
pub use grid::{GridState, TableUpdate};
pub use row::{Row, RowOrigin, RowValues};
pub use table::{Table, TableError};
pub use value::CellValue;
