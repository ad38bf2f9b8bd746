// Excel/ODS reading for import (xlsx, xls, xlsb, ods via calamine)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use gridcrm_engine::value::{format_number, DATE_FORMAT};

/// Read the first worksheet as rows of display strings.
pub fn read_first_sheet(path: &Path) -> Result<Vec<Vec<String>>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open spreadsheet: {}", e))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Format nicely: integers without decimals
        Data::Float(n) => format_number(*n),
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Excel serial date (1900 system) to `YYYY-MM-DD`, with a time part only
/// when the serial has one.
fn serial_to_text(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return format_number(serial);
    };
    let days = serial.floor();
    let Some(date) = Duration::try_days(days as i64).and_then(|d| epoch.checked_add_signed(d)) else {
        return format_number(serial);
    };

    let seconds = ((serial - days) * 86_400.0).round() as i64;
    if seconds == 0 || seconds >= 86_400 {
        return date.format(DATE_FORMAT).to_string();
    }
    let time = date.and_hms_opt(0, 0, 0).map(|dt| dt + Duration::seconds(seconds));
    match time {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => date.format(DATE_FORMAT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    #[test]
    fn test_serial_dates() {
        assert_eq!(serial_to_text(45000.0), "2023-03-15");
        assert_eq!(serial_to_text(45000.5), "2023-03-15 12:00:00");
    }

    #[test]
    fn test_reads_first_sheet_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.xlsx");

        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.write_string(0, 0, "Company").unwrap();
        first.write_string(0, 1, "Revenue").unwrap();
        first.write_string(1, 0, "Acme").unwrap();
        first.write_number(1, 1, 1200.0).unwrap();
        first.write_number(2, 1, 2.5).unwrap();
        let second = workbook.add_worksheet();
        second.write_string(0, 0, "Ignored").unwrap();
        workbook.save(&path).unwrap();

        let rows = read_first_sheet(&path).unwrap();
        assert_eq!(rows[0], vec!["Company", "Revenue"]);
        assert_eq!(rows[1], vec!["Acme", "1200"]);
        assert_eq!(rows[2], vec!["", "2.5"]);
    }
}
