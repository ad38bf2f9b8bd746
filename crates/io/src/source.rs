//! Loading an import file into headers plus body rows, with size caps
//! enforced before anything is parsed or mapped.

use std::path::Path;

use gridcrm_config::Settings;

use crate::import::ImportError;

/// Parsed import file: the first non-blank row is the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSource {
    pub headers: Vec<String>,
    pub body_rows: Vec<Vec<String>>,
}

impl ImportSource {
    /// Split raw rows into headers and body. Leading and body rows with no
    /// non-blank field are dropped.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, ImportError> {
        let mut rows = rows.into_iter().filter(|r| r.iter().any(|f| !f.trim().is_empty()));
        let headers: Vec<String> = rows
            .next()
            .ok_or(ImportError::EmptySheet)?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let body_rows: Vec<Vec<String>> = rows.collect();
        if body_rows.is_empty() {
            return Err(ImportError::NoDataRows);
        }
        Ok(Self { headers, body_rows })
    }

    /// Reject sources over the configured row cap. Never truncates.
    pub fn check_row_cap(&self, settings: &Settings) -> Result<(), ImportError> {
        if self.body_rows.len() > settings.import_max_rows {
            return Err(ImportError::TooManyRows {
                rows: self.body_rows.len(),
                limit: settings.import_max_rows,
            });
        }
        Ok(())
    }
}

/// File extension, lowercased, without the dot.
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Load `path` as an import source, enforcing the extension allow-list and
/// the file-size and row caps from `settings`.
pub fn load(path: &Path, settings: &Settings) -> Result<ImportSource, ImportError> {
    let ext = extension(path);
    if !settings.allows_extension(&ext) {
        return Err(ImportError::UnsupportedExtension(ext));
    }

    let bytes = std::fs::metadata(path).map_err(|e| ImportError::Read(e.to_string()))?.len();
    if bytes > settings.import_max_file_bytes {
        return Err(ImportError::FileTooLarge { bytes, limit: settings.import_max_file_bytes });
    }

    let rows = match ext.as_str() {
        "csv" | "txt" => crate::csv::read(path, None)?,
        "tsv" => crate::csv::read(path, Some(b'\t'))?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => crate::xlsx::read_first_sheet(path).map_err(ImportError::Read)?,
        other => return Err(ImportError::UnsupportedExtension(other.to_string())),
    };

    let source = ImportSource::from_rows(rows)?;
    source.check_row_cap(settings)?;
    log::debug!(
        "loaded {} ({} columns, {} rows)",
        path.display(),
        source.headers.len(),
        source.body_rows.len()
    );
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect()
    }

    #[test]
    fn blank_rows_are_dropped() {
        let src = ImportSource::from_rows(rows(&[&["", ""], &[" Company ", "Site"], &["", " "], &["Acme", ""]])).unwrap();
        assert_eq!(src.headers, vec!["Company", "Site"]);
        assert_eq!(src.body_rows.len(), 1);
    }

    #[test]
    fn empty_and_header_only() {
        assert_eq!(ImportSource::from_rows(vec![]).unwrap_err(), ImportError::EmptySheet);
        assert_eq!(ImportSource::from_rows(rows(&[&["A"]])).unwrap_err(), ImportError::NoDataRows);
    }

    #[test]
    fn caps_are_enforced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.csv");
        fs::write(&path, "Company\nA\nB\nC\n").unwrap();

        let mut settings = Settings::default();
        settings.import_max_rows = 2;
        assert_eq!(load(&path, &settings).unwrap_err(), ImportError::TooManyRows { rows: 3, limit: 2 });

        settings.import_max_rows = 3;
        assert_eq!(load(&path, &settings).unwrap().body_rows.len(), 3);

        settings.import_max_file_bytes = 4;
        assert!(matches!(load(&path, &settings), Err(ImportError::FileTooLarge { limit: 4, .. })));
    }

    #[test]
    fn extension_allow_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deck.pdf");
        fs::write(&path, "%PDF").unwrap();
        assert_eq!(
            load(&path, &Settings::default()).unwrap_err(),
            ImportError::UnsupportedExtension("pdf".into())
        );

        let bare = dir.path().join("noext");
        fs::write(&bare, "a,b").unwrap();
        assert_eq!(load(&bare, &Settings::default()).unwrap_err(), ImportError::UnsupportedExtension(String::new()));
    }

    #[test]
    fn tsv_uses_tabs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.TSV");
        fs::write(&path, "Company\tNotes\nAcme\tone, two\n").unwrap();
        let src = load(&path, &Settings::default()).unwrap();
        assert_eq!(src.body_rows[0], vec!["Acme", "one, two"]);
    }
}
