//! Typed cell values.
//!
//! A row stores `CellValue`s keyed by column id. Values are checked against
//! the column's declared type when written (`Column::check`), so the rest of
//! the engine never has to sniff strings to guess what a cell holds.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Date format used for display, clipboard and formulas.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Explicit null.
    Empty,
    /// Free text. Text starting with `=` is a formula.
    Text(String),
    Number(f64),
    Tags(Vec<String>),
    Url(String),
    Email(String),
    Date(NaiveDate),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// True for values that carry no user data: null, "", whitespace-only
    /// text, and an empty tag list.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) | CellValue::Url(s) | CellValue::Email(s) => s.trim().is_empty(),
            CellValue::Tags(tags) => tags.is_empty(),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.starts_with('='))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            CellValue::Tags(tags) => Some(tags),
            _ => None,
        }
    }

    /// Raw text as typed by the user (formulas are returned unevaluated).
    /// This is what the editor is seeded with and what the clipboard carries.
    pub fn raw(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) | CellValue::Url(s) | CellValue::Email(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Tags(tags) => tags.join(", "),
            CellValue::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Empty-normalized equality used by change detection:
/// absent, `Empty` and blank text all compare equal.
pub fn values_equivalent(a: Option<&CellValue>, b: Option<&CellValue>) -> bool {
    let a = a.filter(|v| !v.is_empty());
    let b = b.filter(|v| !v.is_empty());
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Format a number for display: integers without decimals, everything else
/// in Rust's shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse user-facing number text. Accepts thousands separators and a
/// leading `$`, which is how numbers arrive from pasted spreadsheets.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .chars()
        .filter(|&c| c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .ok()
        .or_else(|| datetime_date(trimmed))
}

/// Date part of a spreadsheet date-time (`2023-03-15 12:00:00`, or the ISO
/// `T` form). The time of day is dropped.
fn datetime_date(s: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_spreadsheet_datetimes() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 15);
        assert_eq!(parse_date("2023-03-15"), day);
        assert_eq!(parse_date("03/15/2023"), day);
        assert_eq!(parse_date("2023-03-15 12:00:00"), day);
        assert_eq!(parse_date(" 2023-03-15T08:30:00 "), day);
        assert_eq!(parse_date("2023-03-15 25:00:00"), None);
        assert_eq!(parse_date("March"), None);
    }

    #[test]
    fn emptiness() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::text("").is_empty());
        assert!(CellValue::text("   ").is_empty());
        assert!(CellValue::Tags(vec![]).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(!CellValue::text("x").is_empty());
    }

    #[test]
    fn equivalence_normalizes_empties() {
        let blank = CellValue::text("");
        assert!(values_equivalent(None, Some(&CellValue::Empty)));
        assert!(values_equivalent(Some(&blank), None));
        assert!(values_equivalent(Some(&CellValue::Empty), Some(&blank)));
        assert!(!values_equivalent(None, Some(&CellValue::text("a"))));
        assert!(!values_equivalent(Some(&CellValue::Number(1.0)), Some(&CellValue::Number(2.0))));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number("1,250"), Some(1250.0));
        assert_eq!(parse_number(" $99.5 "), Some(99.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn raw_text() {
        assert_eq!(CellValue::Tags(vec!["a".into(), "b".into()]).raw(), "a, b");
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(CellValue::Date(d).raw(), "2024-03-09");
        assert_eq!(CellValue::Empty.raw(), "");
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_string(&CellValue::Number(4.0)).unwrap();
        assert_eq!(json, r#"{"type":"number","value":4.0}"#);
        let back: CellValue = serde_json::from_str(r#"{"type":"text","value":"hi"}"#).unwrap();
        assert_eq!(back, CellValue::text("hi"));
    }
}
