// File import: CSV/TSV and spreadsheet sources, merged into tables

pub mod csv;
pub mod import;
pub mod source;
pub mod xlsx;

pub use import::{
    import_into, reconcile, suggest_mappings, ColumnAction, ImportError, ImportSummary, ImportWarning,
};
pub use source::{load, ImportSource};
