//! Vote timeline aggregation.
//!
//! This module provides:
//! - Time normalization with next-day rollover
//! - CSV reading of timestamped tally results
//! - Cumulative, interval and time-distribution statistics
//! - JSON export of the timeline

pub mod csv_reader;
pub mod export;
pub mod normalize;
pub mod statistics;

pub use csv_reader::VoteTable;
pub use statistics::{DEFAULT_INTERVAL_MINUTES, TimelineReport};

use anyhow::{Result, anyhow};
use std::path::Path;

/// Runs the full timeline pipeline: read CSV, calculate the timeline, export JSON.
///
/// With an empty `candidates` list the candidate columns are detected, skipping
/// `exclude` (typically the URL column).
pub fn generate_timeline(
    csv_path: &Path,
    time_column: &str,
    candidates: &[String],
    exclude: &[&str],
    interval_minutes: u32,
    json_path: &Path,
) -> Result<TimelineReport> {
    let table = if candidates.is_empty() {
        VoteTable::from_csv(csv_path, time_column, exclude)?
    } else {
        VoteTable::from_csv_with_candidates(csv_path, time_column, candidates)?
    };
    if table.is_empty() {
        return Err(anyhow!("No timestamped reports in {}", csv_path.display()));
    }

    log::info!(
        "Loaded {} reports ({} dropped), candidates: {}",
        table.len(),
        table.dropped,
        table.candidates.join(", ")
    );

    let report = TimelineReport::from_table(&table, interval_minutes);

    export::export_to_json(&report, json_path)?;
    log::info!("Timeline JSON saved: {}", json_path.display());

    Ok(report)
}
