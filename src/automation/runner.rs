//! Automated OCR pass over the result set.
//!
//! Walks every unresolved record, runs the fallback state machine on its image,
//! and writes the outcome back. Failures are contained per record; the store is
//! saved once at the end.

use anyhow::{Context, Result};
use std::path::Path;

use crate::automation::config::PipelineConfig;
use crate::automation::state::FallbackContext;
use crate::ocr::{Extraction, Recognizer};
use crate::paths::{image_path_for_url, rotated_path};
use crate::store::{Record, ResultStore, TimestampCell, UpsertOutcome, WriteOrigin};

/// Counts reported at the end of a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Records already resolved and left untouched
    pub skipped_resolved: usize,
    /// Records whose image file was absent or could not be decoded
    pub skipped_missing: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Records that needed the rotated copy
    pub rotated: usize,
}

impl PassSummary {
    pub fn processed(&self) -> usize {
        self.resolved + self.unresolved
    }
}

/// Resolves one record's image. Missing or unreadable images yield `Unresolved`
/// without touching the engine.
fn process_record<R: Recognizer + ?Sized>(
    url: &str,
    config: &PipelineConfig,
    recognizer: &R,
    summary: &mut PassSummary,
) -> Extraction {
    let Some(image_path) = image_path_for_url(&config.image_dir, url) else {
        log::warn!("Skipping {}: no file name in URL", url);
        summary.skipped_missing += 1;
        return Extraction::Unresolved;
    };

    let file_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if !image_path.exists() {
        log::warn!("Skipping missing image: {}", image_path.display());
        summary.skipped_missing += 1;
        return Extraction::Unresolved;
    }

    let img = match image::open(&image_path) {
        Ok(img) => img,
        Err(e) => {
            log::warn!("Failed to load {}: {}", image_path.display(), e);
            summary.skipped_missing += 1;
            return Extraction::Unresolved;
        }
    };

    let outcome = FallbackContext::new(&img, recognizer, config)
        .with_rotated_artifact(rotated_path(&image_path))
        .run();

    if outcome.rotated {
        log::info!("Image was rotated: {}", file_name);
        summary.rotated += 1;
    }

    match &outcome.extraction {
        Extraction::Resolved(time) => {
            log::info!("Processed: {}, Timestamp: {}", file_name, time);
            summary.resolved += 1;
        }
        Extraction::Unresolved => {
            log::info!("Processed: {}, Timestamp: {}", file_name, config.sentinel);
            summary.unresolved += 1;
        }
    }

    outcome.extraction
}

/// Runs the automated pass and saves the store.
///
/// Only records without a resolved timestamp are attempted. `limit` caps the
/// number of records attempted in this run.
pub fn run_automated_pass<R: Recognizer + ?Sized>(
    store: &mut ResultStore,
    config: &PipelineConfig,
    recognizer: &R,
    limit: Option<usize>,
) -> Result<PassSummary> {
    if store.is_empty() {
        log::warn!("No records to process in {}", store.path().display());
    }

    let mut summary = PassSummary {
        skipped_resolved: store.len() - store.pending_urls().len(),
        ..PassSummary::default()
    };

    let pending = store.pending_urls();
    let budget = limit.unwrap_or(pending.len());

    log::info!(
        "Starting OCR pass: {} pending, {} already resolved",
        pending.len(),
        summary.skipped_resolved
    );

    for (i, url) in pending.iter().take(budget).enumerate() {
        log::debug!("Record {}/{}: {}", i + 1, budget.min(pending.len()), url);

        let timestamp = match process_record(url, config, recognizer, &mut summary) {
            Extraction::Resolved(time) => TimestampCell::Resolved(time),
            Extraction::Unresolved => TimestampCell::NotFound,
        };
        if store.upsert(Record::new(url.as_str(), timestamp), WriteOrigin::Automated)
            == UpsertOutcome::Kept
        {
            log::debug!("Kept existing timestamp for {}", url);
        }
    }

    store
        .save()
        .with_context(|| format!("Failed to save results to {}", store.path().display()))?;

    log::info!(
        "OCR pass complete: {} resolved, {} unresolved, {} missing images, {} skipped",
        summary.resolved,
        summary.unresolved,
        summary.skipped_missing,
        summary.skipped_resolved
    );

    Ok(summary)
}

/// Convenience used by the CLI: load (or seed) the store from config paths and run.
pub fn run_from_config<R: Recognizer + ?Sized>(
    config: &PipelineConfig,
    recognizer: &R,
    limit: Option<usize>,
) -> Result<PassSummary> {
    let mut store = open_store(config)?;
    run_automated_pass(&mut store, config, recognizer, limit)
}

/// Opens the result store described by the config.
pub fn open_store(config: &PipelineConfig) -> Result<ResultStore> {
    ResultStore::load_or_seed(
        &config.output_csv,
        &config.input_csv,
        crate::store::StoreSchema::from_config(config),
    )
    .with_context(|| format!("Failed to load results from {}", display_source(config)))
}

fn display_source(config: &PipelineConfig) -> String {
    let path: &Path = if config.output_csv.exists() {
        &config.output_csv
    } else {
        &config.input_csv
    };
    path.display().to_string()
}
