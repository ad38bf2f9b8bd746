//! Column definitions and per-type value checking.

use gridcrm_core::ColumnId;
use serde::{Deserialize, Serialize};

use crate::value::{parse_date, parse_number, CellValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Tag,
    Url,
    Email,
    Date,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Tag => "tag",
            ColumnType::Url => "url",
            ColumnType::Email => "email",
            ColumnType::Date => "date",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOverflowMode {
    #[default]
    Clip,
    Ellipsis,
    Wrap,
}

/// One choice of a tag column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOption {
    pub id: String,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub text_overflow_mode: TextOverflowMode,
    /// Only meaningful for tag columns.
    #[serde(default)]
    pub options: Vec<TagOption>,
    /// Display position. Kept dense (0..n) by `Table`.
    pub order: usize,
}

impl Column {
    pub fn new(id: impl Into<ColumnId>, title: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            column_type,
            description: String::new(),
            text_overflow_mode: TextOverflowMode::default(),
            options: Vec::new(),
            order: 0,
        }
    }

    pub fn with_options(mut self, options: Vec<TagOption>) -> Self {
        self.options = options;
        self
    }

    pub fn option_by_label(&self, label: &str) -> Option<&TagOption> {
        self.options.iter().find(|o| o.label.eq_ignore_ascii_case(label))
    }

    /// Check that `value` may be stored in this column.
    ///
    /// Empty values fit everywhere. Formulas fit every non-tag column.
    pub fn check(&self, value: &CellValue) -> Result<(), ValueError> {
        if value.is_empty() {
            return Ok(());
        }
        let fits = match (self.column_type, value) {
            (ColumnType::Tag, CellValue::Tags(_)) => true,
            (ColumnType::Tag, _) => false,
            (_, v) if v.is_formula() => true,
            (ColumnType::Text, CellValue::Text(_)) => true,
            (ColumnType::Number, CellValue::Number(_)) => true,
            (ColumnType::Url, CellValue::Url(_)) => true,
            (ColumnType::Email, CellValue::Email(_)) => true,
            (ColumnType::Date, CellValue::Date(_)) => true,
            _ => false,
        };
        if fits {
            Ok(())
        } else {
            Err(ValueError::TypeMismatch {
                column: self.title.clone(),
                expected: self.column_type,
                got: value.raw(),
            })
        }
    }

    /// Convert raw text (typed, pasted, imported) into a value of this
    /// column's type.
    ///
    /// Blank input becomes `Text("")` so an explicit clear is distinguishable
    /// from a cell that was never written.
    pub fn coerce(&self, raw: &str) -> Result<CellValue, ValueError> {
        if raw.trim().is_empty() {
            return Ok(CellValue::Text(String::new()));
        }
        if raw.starts_with('=') && self.column_type != ColumnType::Tag {
            return Ok(CellValue::Text(raw.to_string()));
        }

        let invalid = || ValueError::Invalid {
            column: self.title.clone(),
            expected: self.column_type,
            got: raw.to_string(),
        };

        match self.column_type {
            ColumnType::Text => Ok(CellValue::Text(raw.to_string())),
            ColumnType::Number => parse_number(raw).map(CellValue::Number).ok_or_else(invalid),
            ColumnType::Tag => Ok(CellValue::Tags(split_tags(raw))),
            ColumnType::Url => {
                let trimmed = raw.trim();
                if trimmed.contains(char::is_whitespace) {
                    Err(invalid())
                } else {
                    Ok(CellValue::Url(trimmed.to_string()))
                }
            }
            ColumnType::Email => {
                let trimmed = raw.trim();
                match trimmed.split_once('@') {
                    Some((user, domain)) if !user.is_empty() && !domain.is_empty() => {
                        Ok(CellValue::Email(trimmed.to_string()))
                    }
                    _ => Err(invalid()),
                }
            }
            ColumnType::Date => parse_date(raw).map(CellValue::Date).ok_or_else(invalid),
        }
    }
}

/// Split `a, b,c` into labels, dropping blanks and duplicates (case-insensitive).
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for label in raw.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(label)) {
            tags.push(label.to_string());
        }
    }
    tags
}

/// A value rejected by a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Raw text that can't be read as the column's type.
    Invalid { column: String, expected: ColumnType, got: String },
    /// A typed value of the wrong variant.
    TypeMismatch { column: String, expected: ColumnType, got: String },
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueError::Invalid { column, expected, got } => {
                write!(f, "'{got}' is not a valid {expected} for column '{column}'")
            }
            ValueError::TypeMismatch { column, expected, got } => {
                write!(f, "column '{column}' holds {expected} values, got '{got}'")
            }
        }
    }
}

impl std::error::Error for ValueError {}
