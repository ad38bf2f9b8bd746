//! Merge imported rows into a table.
//!
//! Imported rows first fill placeholder rows that are blank in every column
//! the table had before the import (in table order), and only then append new
//! placeholder rows. Only mapped columns are written, empty source cells are
//! skipped, and nothing is ever deleted. All validation happens before the
//! first mutation.

use gridcrm_core::ColumnId;
use gridcrm_engine::column::{Column, ColumnType};
use gridcrm_engine::grid::GridState;
use gridcrm_engine::table::{Table, TableError};
use gridcrm_engine::value::{parse_date, parse_number};

use crate::source::ImportSource;

/// What to do with one source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnAction {
    /// Write into an existing column
    Existing(ColumnId),
    /// Create a column (appended after the existing ones)
    New { title: String, column_type: ColumnType },
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// 1-based row in the source body (header excluded)
    pub source_row: usize,
    pub column: String,
    pub message: String,
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}, {}: {}", self.source_row, self.column, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_reused: usize,
    pub rows_appended: usize,
    pub cells_written: usize,
    pub columns_created: Vec<ColumnId>,
    pub warnings: Vec<ImportWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    FileTooLarge { bytes: u64, limit: u64 },
    UnsupportedExtension(String),
    /// The file could not be read or parsed
    Read(String),
    EmptySheet,
    NoDataRows,
    TooManyRows { rows: usize, limit: usize },
    NoMappings,
    MappingCountMismatch { headers: usize, mappings: usize },
    UnknownColumn(ColumnId),
    BlankNewColumnTitle { source_column: usize },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::FileTooLarge { bytes, limit } => {
                write!(f, "File is too large ({} bytes, limit is {} bytes)", bytes, limit)
            }
            ImportError::UnsupportedExtension(ext) if ext.is_empty() => {
                write!(f, "File has no extension; expected CSV, TSV or a spreadsheet")
            }
            ImportError::UnsupportedExtension(ext) => write!(f, "Unsupported file type: .{}", ext),
            ImportError::Read(e) => write!(f, "Could not read file: {}", e),
            ImportError::EmptySheet => write!(f, "The file is empty"),
            ImportError::NoDataRows => write!(f, "The file has a header row but no data rows"),
            ImportError::TooManyRows { rows, limit } => {
                write!(f, "The file has {} rows; at most {} can be imported at once", rows, limit)
            }
            ImportError::NoMappings => write!(f, "Map at least one column to import"),
            ImportError::MappingCountMismatch { headers, mappings } => {
                write!(f, "{} mappings given for {} source columns", mappings, headers)
            }
            ImportError::UnknownColumn(id) => write!(f, "Column {} does not exist", id),
            ImportError::BlankNewColumnTitle { source_column } => {
                write!(f, "New column for source column {} needs a title", source_column + 1)
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// Propose a mapping per header: same title (case-insensitive) as an
/// existing column maps to it, blank headers are ignored, anything else
/// becomes a new column typed from its values.
pub fn suggest_mappings(headers: &[String], body_rows: &[Vec<String>], columns: &[Column]) -> Vec<ColumnAction> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let title = header.trim();
            if title.is_empty() {
                return ColumnAction::Ignore;
            }
            if let Some(col) = columns.iter().find(|c| c.title.trim().eq_ignore_ascii_case(title)) {
                return ColumnAction::Existing(col.id.clone());
            }
            let values = body_rows.iter().filter_map(|r| r.get(idx)).map(String::as_str);
            ColumnAction::New { title: title.to_string(), column_type: infer_type(values) }
        })
        .collect()
}

/// Narrowest type every non-empty value fits; text when there are none.
pub fn infer_type<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnType {
    let values: Vec<&str> = values.into_iter().map(str::trim).filter(|v| !v.is_empty()).collect();
    if values.is_empty() {
        return ColumnType::Text;
    }

    let all = |pred: fn(&str) -> bool| values.iter().all(|v| pred(v));
    if all(|v| parse_number(v).is_some()) {
        ColumnType::Number
    } else if all(looks_like_email) {
        ColumnType::Email
    } else if all(looks_like_url) {
        ColumnType::Url
    } else if all(|v| parse_date(v).is_some()) {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

fn looks_like_email(v: &str) -> bool {
    !v.contains(char::is_whitespace)
        && matches!(v.split_once('@'), Some((user, domain)) if !user.is_empty() && domain.contains('.'))
}

fn looks_like_url(v: &str) -> bool {
    let lower = v.to_ascii_lowercase();
    !v.contains(char::is_whitespace)
        && (lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www."))
}

/// Check a source and its mappings against `table` without touching it.
pub fn validate(source: &ImportSource, mappings: &[ColumnAction], table: &Table) -> Result<(), ImportError> {
    if source.headers.is_empty() {
        return Err(ImportError::EmptySheet);
    }
    if source.body_rows.is_empty() {
        return Err(ImportError::NoDataRows);
    }
    if mappings.len() != source.headers.len() {
        return Err(ImportError::MappingCountMismatch {
            headers: source.headers.len(),
            mappings: mappings.len(),
        });
    }
    if mappings.iter().all(|m| *m == ColumnAction::Ignore) {
        return Err(ImportError::NoMappings);
    }
    for (idx, mapping) in mappings.iter().enumerate() {
        match mapping {
            ColumnAction::Existing(id) if table.column(id).is_none() => {
                return Err(ImportError::UnknownColumn(id.clone()));
            }
            ColumnAction::New { title, .. } if title.trim().is_empty() => {
                return Err(ImportError::BlankNewColumnTitle { source_column: idx });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Validate, then merge `source` into `table`.
pub fn reconcile(table: &mut Table, source: &ImportSource, mappings: &[ColumnAction]) -> Result<ImportSummary, ImportError> {
    validate(source, mappings, table)?;

    let mut summary = ImportSummary::default();
    let pre_existing = table.column_ids();
    let mut reusable = table.reusable_placeholders(&pre_existing).into_iter();

    // Source column index -> target column
    let mut targets: Vec<(usize, ColumnId)> = Vec::new();
    for (idx, mapping) in mappings.iter().enumerate() {
        match mapping {
            ColumnAction::Existing(id) => targets.push((idx, id.clone())),
            ColumnAction::New { title, column_type } => {
                let column = Column::new(ColumnId::generate(), title.trim(), *column_type);
                let id = column.id.clone();
                if let Err(e) = table.add_column(column) {
                    log::warn!("import could not create column '{}': {}", title.trim(), e);
                    continue;
                }
                summary.columns_created.push(id.clone());
                targets.push((idx, id));
            }
            ColumnAction::Ignore => {}
        }
    }

    let titles: Vec<String> = targets
        .iter()
        .map(|(_, id)| table.column(id).map(|c| c.title.clone()).unwrap_or_default())
        .collect();

    for (body_idx, body_row) in source.body_rows.iter().enumerate() {
        let row_id = match reusable.next() {
            Some(id) => {
                summary.rows_reused += 1;
                id
            }
            None => {
                summary.rows_appended += 1;
                table.push_placeholder()
            }
        };

        for ((src_idx, col_id), title) in targets.iter().zip(&titles) {
            let Some(raw) = body_row.get(*src_idx).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            match table.set_raw(&row_id, col_id, raw) {
                Ok(_) => summary.cells_written += 1,
                Err(TableError::Value(e)) => summary.warnings.push(ImportWarning {
                    source_row: body_idx + 1,
                    column: title.clone(),
                    message: e.to_string(),
                }),
                Err(e) => log::debug!("import skipped {}:{}: {}", row_id, col_id, e),
            }
        }
    }

    log::info!(
        "imported {} rows ({} reused, {} appended), {} cells, {} warnings",
        source.body_rows.len(),
        summary.rows_reused,
        summary.rows_appended,
        summary.cells_written,
        summary.warnings.len()
    );
    Ok(summary)
}

/// Import into live grid state. A rejected import leaves the state untouched
/// (no revision bump, so no sync pass).
pub fn import_into(state: &mut GridState, source: &ImportSource, mappings: &[ColumnAction]) -> Result<ImportSummary, ImportError> {
    validate(source, mappings, state.table())?;
    state.update_with(|table| reconcile(table, source, mappings))
}
