//! Generation: ask the client for new companies, add them as rows, then
//! enrich each one.

use std::collections::HashSet;

use gridcrm_config::Settings;
use gridcrm_core::{ColumnId, RowId};
use gridcrm_engine::{Column, Table};
use gridcrm_sync::Grid;

use crate::batch::{enrich_rows, BatchReport, EnrichRequest};
use crate::client::{EnrichError, EnrichmentClient};

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub query: String,
    pub count: usize,
    /// Column that receives the company names
    pub key_column: ColumnId,
    /// Existing columns to enrich for every new row
    pub columns: Vec<ColumnId>,
    /// Columns declared with this request; appended before any row is
    /// touched and enriched as well
    pub new_columns: Vec<Column>,
    pub context: Option<String>,
}

/// Run a generation batch. Fails only if the company lookup itself fails;
/// per-row problems end up in the report and the progress tracker.
pub async fn generate_rows(
    grid: &Grid,
    client: &dyn EnrichmentClient,
    request: &GenerateRequest,
    settings: &Settings,
) -> Result<BatchReport, EnrichError> {
    let created = add_columns(grid, &request.new_columns);

    let count = request.count.min(settings.generation_max_count);
    let names = client.identify_companies(&request.query, count).await?;

    let rows = grid.update_with(|t| {
        let names = fresh_names(t, &request.key_column, names, count);
        place_names(t, &request.key_column, &names)
    });
    log::info!("generation for {:?} added {} rows", request.query, rows.len());
    if rows.is_empty() {
        return Ok(BatchReport::default());
    }

    let mut columns = request.columns.clone();
    columns.extend(created);
    let enrich = EnrichRequest {
        rows,
        columns,
        key_column: request.key_column.clone(),
        context: request.context.clone(),
    };
    Ok(enrich_rows(grid, client, &enrich, settings).await)
}

/// Append declared columns, skipping any whose id is already taken.
fn add_columns(grid: &Grid, columns: &[Column]) -> Vec<ColumnId> {
    if columns.is_empty() {
        return Vec::new();
    }
    grid.update_with(|t| {
        let mut created = Vec::new();
        for column in columns {
            let id = column.id.clone();
            match t.add_column(column.clone()) {
                Ok(()) => created.push(id),
                Err(e) => log::warn!("generation column {} not added: {}", column.title, e),
            }
        }
        created
    })
}

/// Trimmed names, without blanks, without case-insensitive duplicates,
/// and without names already present in the key column.
fn fresh_names(table: &Table, key_column: &ColumnId, names: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen: HashSet<String> = table
        .rows()
        .iter()
        .filter_map(|r| r.get(key_column))
        .map(|v| v.raw().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && seen.insert(n.to_lowercase()))
        .take(limit)
        .collect()
}

/// Write names into empty placeholder rows first, then into new ones.
fn place_names(table: &mut Table, key_column: &ColumnId, names: &[String]) -> Vec<RowId> {
    let all_columns = table.column_ids();
    let mut reusable = table.reusable_placeholders(&all_columns).into_iter();

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let row = reusable.next().unwrap_or_else(|| table.push_placeholder());
        match table.set_raw(&row, key_column, name) {
            Ok(_) => rows.push(row),
            Err(e) => log::warn!("generated name {:?} not written: {}", name, e),
        }
    }
    rows
}
