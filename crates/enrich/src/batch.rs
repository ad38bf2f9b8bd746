//! Enrichment batches: fill target columns of existing rows, one row at a time.
//!
//! Every external call is an await point during which the grid keeps
//! changing: rows are re-resolved by id (following promotions) after each
//! call, and a row or column that vanished is skipped without complaint.

use std::time::Duration;

use gridcrm_config::Settings;
use gridcrm_core::{CellKey, ColumnId, RowId};
use gridcrm_engine::progress::{Confidence, EnrichmentResult, Phase};
use gridcrm_sync::Grid;
use serde_json::Value;

use crate::client::{EnrichmentClient, ScrapedDetails};

/// Rows × columns to enrich, with the column whose value identifies the
/// company for each row.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichRequest {
    pub rows: Vec<RowId>,
    pub columns: Vec<ColumnId>,
    pub key_column: ColumnId,
    /// Free text passed along to the client (table description, prompt)
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub rows_skipped: usize,
    pub cells_completed: usize,
    pub cells_failed: usize,
    /// Progress generation this batch started; guards the delayed clear
    pub generation: u64,
}

/// Run an enrichment batch, then schedule the progress clear.
pub async fn enrich_rows(
    grid: &Grid,
    client: &dyn EnrichmentClient,
    request: &EnrichRequest,
    settings: &Settings,
) -> BatchReport {
    let report = run_batch(grid, client, request, settings).await;
    log::info!(
        "enrichment batch {} done: {} rows ok, {} failed, {} skipped",
        report.generation,
        report.rows_processed,
        report.rows_failed,
        report.rows_skipped
    );

    let delay = settings.progress_clear_delay();
    smol::spawn(clear_progress_later(grid.clone(), report.generation, delay)).detach();
    report
}

/// Wait `delay`, then clear progress unless a newer batch started.
pub async fn clear_progress_later(grid: Grid, generation: u64, delay: Duration) -> bool {
    smol::Timer::after(delay).await;
    grid.with_state(|s| s.progress.clear_if_current(generation))
}

/// The batch body without the delayed clear.
pub async fn run_batch(
    grid: &Grid,
    client: &dyn EnrichmentClient,
    request: &EnrichRequest,
    settings: &Settings,
) -> BatchReport {
    let cells = request
        .rows
        .iter()
        .flat_map(|r| request.columns.iter().map(move |c| CellKey::new(r.clone(), c.clone())));
    let generation = grid.with_state(|s| s.progress.begin_batch(cells.collect::<Vec<_>>()));

    let mut report = BatchReport { generation, ..BatchReport::default() };
    for row in &request.rows {
        enrich_row(grid, client, request, settings, row, &mut report).await;
    }
    report
}

/// What a row looks like right before its external call.
struct RowTarget {
    row: RowId,
    key: String,
    key_title: String,
    columns: Vec<ColumnId>,
    titles: Vec<String>,
}

fn resolve_target(grid: &Grid, request: &EnrichRequest, row: &RowId) -> Option<RowTarget> {
    grid.with_state(|s| {
        let row = s.resolve_row(row)?;
        let table = s.table();
        let (columns, titles): (Vec<ColumnId>, Vec<String>) = request
            .columns
            .iter()
            .filter_map(|c| table.column(c).map(|col| (col.id.clone(), col.title.clone())))
            .unzip();
        let key_title = table
            .column(&request.key_column)
            .map(|c| c.title.clone())
            .unwrap_or_else(|| request.key_column.to_string());
        let key = s.display(&row, &request.key_column).trim().to_string();
        Some(RowTarget { row, key, key_title, columns, titles })
    })
}

async fn enrich_row(
    grid: &Grid,
    client: &dyn EnrichmentClient,
    request: &EnrichRequest,
    settings: &Settings,
    row: &RowId,
    report: &mut BatchReport,
) {
    let Some(target) = resolve_target(grid, request, row) else {
        log::debug!("enrichment skipped row {}, it no longer exists", row);
        report.rows_skipped += 1;
        return;
    };
    if target.columns.is_empty() {
        report.rows_skipped += 1;
        return;
    }

    if target.key.is_empty() {
        let message = format!("missing {}", target.key_title);
        grid.with_state(|s| s.progress.fail(&target.row, &target.columns, &message));
        report.rows_failed += 1;
        report.cells_failed += target.columns.len();
        return;
    }

    grid.with_state(|s| s.progress.set_phase(&target.row, &target.columns, Phase::Discovery));
    let answer = client
        .scrape_company_details(&target.key, &target.titles, request.context.as_deref())
        .await;

    // The row may have been promoted or deleted while the call was out
    let Some(current) = grid.with_state(|s| s.resolve_row(&target.row)) else {
        log::debug!("enrichment result for {} dropped, row is gone", target.key);
        report.rows_skipped += 1;
        return;
    };

    let details = match answer {
        Ok(details) => details,
        Err(e) => {
            log::warn!("enrichment of {} failed: {}", target.key, e);
            let message = e.to_string();
            grid.with_state(|s| s.progress.fail(&current, &target.columns, &message));
            report.rows_failed += 1;
            report.cells_failed += target.columns.len();
            return;
        }
    };

    let financial = target.titles.iter().any(|t| settings.is_financial(t));
    let (completed, failed) = grid.with_state(|s| {
        s.progress.set_phase(&current, &target.columns, Phase::Extraction);
        if financial {
            s.progress.set_phase(&current, &target.columns, Phase::Financial);
        }
        let mut completed = 0;
        let mut failed = 0;
        for col in &target.columns {
            match write_field(s, &current, col, &details) {
                Ok(result) => {
                    s.progress.complete(&current, col, result);
                    completed += 1;
                }
                Err(message) => {
                    s.progress.fail(&current, std::slice::from_ref(col), &message);
                    failed += 1;
                }
            }
        }
        (completed, failed)
    });

    report.rows_processed += 1;
    report.cells_completed += completed;
    report.cells_failed += failed;
}

/// Write the client's value for `col` into the row. `Ok(None)` when the
/// answer did not cover the field or the column is gone.
fn write_field(
    state: &mut gridcrm_engine::GridState,
    row: &RowId,
    col: &ColumnId,
    details: &ScrapedDetails,
) -> Result<Option<EnrichmentResult>, String> {
    let Some(title) = state.table().column(col).map(|c| c.title.clone()) else {
        return Ok(None);
    };
    let Some(raw) = details.field(&title).and_then(json_to_raw) else {
        return Ok(None);
    };
    state.commit_text(&CellKey::new(row.clone(), col.clone()), &raw).map_err(|e| e.to_string())?;
    Ok(Some(EnrichmentResult { field: title, value: raw, confidence: Confidence::High }))
}

/// Cell text for a JSON answer. Null and blank answers count as not found.
pub fn json_to_raw(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.iter().filter_map(json_to_raw).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    };
    (!raw.is_empty()).then_some(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_become_cell_text() {
        assert_eq!(json_to_raw(&json!("  acme.com ")), Some("acme.com".into()));
        assert_eq!(json_to_raw(&json!(1200)), Some("1200".into()));
        assert_eq!(json_to_raw(&json!(2.5)), Some("2.5".into()));
        assert_eq!(json_to_raw(&json!(["SaaS", null, "B2B"])), Some("SaaS, B2B".into()));
        assert_eq!(json_to_raw(&json!(null)), None);
        assert_eq!(json_to_raw(&json!("")), None);
        assert_eq!(json_to_raw(&json!([])), None);
    }
}
