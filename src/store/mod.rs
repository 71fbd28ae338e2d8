//! Persistent result set: one record per source image URL.
//!
//! This module provides:
//! - Record and timestamp-cell types
//! - The CSV-backed `ResultStore` with non-regressive upsert and atomic save
//! - Triage helpers for records OCR left unresolved

pub mod record;
pub mod result_store;
pub mod triage;

pub use record::{Record, TimestampCell};
pub use result_store::{ResultStore, StoreSchema, UpsertOutcome, WriteOrigin};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing the result set.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot infer schema: no records and no prior header to write")]
    SchemaInference,

    #[error("Column '{column}' not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("Column '{column}' appears more than once in {}", path.display())]
    DuplicateColumn { column: String, path: PathBuf },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace results file: {0}")]
    Persist(#[from] tempfile::PersistError),
}
