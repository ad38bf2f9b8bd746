//! Delimited text import (CSV, TSV, TXT).
//!
//! A file is read once, decoded to UTF-8 and split into records. When the
//! delimiter is not implied by the extension it is chosen by how well each
//! candidate lines body records up with the header row.

use std::path::Path;

use crate::import::ImportError;

/// Delimiters tried when sniffing, in order of preference on a tie.
const CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Records inspected when sniffing: the header plus this many body rows.
const SNIFF_BODY_ROWS: usize = 20;

/// Read a delimited file. `None` sniffs the delimiter from the content.
pub fn read(path: &Path, delimiter: Option<u8>) -> Result<Vec<Vec<String>>, ImportError> {
    let bytes = std::fs::read(path).map_err(|e| ImportError::Read(e.to_string()))?;
    let text = decode(bytes);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&text));
    log::debug!("reading {} with delimiter {:?}", path.display(), delimiter as char);
    parse(&text, delimiter)
}

/// Bytes to text. UTF-8 when valid, otherwise Windows-1252 (what Excel
/// writes for "CSV" on Windows). A leading BOM is dropped so it does not
/// end up in the first header.
pub fn decode(bytes: Vec<u8>) -> String {
    let text = String::from_utf8(bytes).unwrap_or_else(|e| {
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
        decoded.into_owned()
    });
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Pick the delimiter whose header row splits into more than one field and
/// whose body rows most often have the header's width. Records are parsed
/// properly, so quoted fields may contain other candidates or newlines.
/// Falls back to comma (a single-column file is still valid CSV).
pub fn sniff_delimiter(text: &str) -> u8 {
    let mut best = (b',', 0usize, 0usize);
    for delimiter in CANDIDATES {
        let widths = record_widths(text, delimiter);
        let Some((&header, body)) = widths.split_first() else {
            continue;
        };
        if header < 2 {
            continue;
        }
        let aligned = body.iter().filter(|&&w| w == header).count();
        if (aligned, header) > (best.1, best.2) {
            best = (delimiter, aligned, header);
        }
    }
    best.0
}

fn record_widths(text: &str, delimiter: u8) -> Vec<usize> {
    reader(text, delimiter)
        .records()
        .take(SNIFF_BODY_ROWS + 1)
        .map_while(Result::ok)
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .map(|r| r.len())
        .collect()
}

/// Split decoded text into records. Rows may have differing widths.
pub fn parse(text: &str, delimiter: u8) -> Result<Vec<Vec<String>>, ImportError> {
    reader(text, delimiter)
        .records()
        .enumerate()
        .map(|(i, record)| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| ImportError::Read(format!("record {}: {}", i + 1, e)))
        })
        .collect()
}

fn reader(text: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}
