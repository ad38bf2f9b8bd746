//! Enrichment and generation batches.
//!
//! - `client`: the `EnrichmentClient` collaborator (titles in, values out)
//! - `batch`: per-row enrichment with progress tracking
//! - `generate`: company discovery followed by enrichment of the new rows

pub mod batch;
pub mod client;
pub mod generate;

pub use batch::{clear_progress_later, enrich_rows, run_batch, BatchReport, EnrichRequest};
pub use client::{ClientCall, EnrichError, EnrichmentClient, ScrapedDetails, ScriptedClient};
pub use generate::{generate_rows, GenerateRequest};
