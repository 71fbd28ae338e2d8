//! Automated timestamp pass.
//!
//! This module provides:
//! - Pipeline configuration loaded from JSON
//! - The per-image fallback state machine (crop, band, rotated crop, rotated band)
//! - The pass runner that feeds every unresolved record through it

pub mod config;
pub mod runner;
pub mod state;

pub use config::PipelineConfig;
pub use runner::{open_store, run_from_config};
