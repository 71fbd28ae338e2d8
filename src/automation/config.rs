//! Configuration types for the OCR pipeline.
//!
//! Loads settings from a JSON file at startup. Provides file locations, column
//! names, crop regions, and Tesseract options. Any field missing from the file
//! falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tally-clock.json";

/// A rectangle in absolute pixel coordinates, as `(left, top, right, bottom)`.
///
/// `right` and `bottom` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Builds a rect from a position and size, the way a drag selection reports it.
    pub fn from_xywh(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x.saturating_add(width),
            bottom: y.saturating_add(height),
        }
    }

    /// Full-width band covering the top `1 / divisor` of an image.
    pub fn top_band(width: u32, height: u32, divisor: u32) -> Self {
        Self::new(0, 0, width, height / divisor.max(1))
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

impl Default for PixelRect {
    fn default() -> Self {
        Self::new(300, 400, 650, 600)
    }
}

/// Complete pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Results CSV used to seed the store when `output_csv` does not exist yet
    pub input_csv: PathBuf,
    /// Results CSV read and rewritten by every pass
    pub output_csv: PathBuf,
    /// Directory holding one image per record, named by URL basename
    pub image_dir: PathBuf,
    /// Column holding the source URL (record key)
    pub url_column: String,
    /// Column holding the extracted reporting time
    pub timestamp_column: String,
    /// Marker written when no time could be extracted
    pub sentinel: String,
    /// Small fixed box where the reporting time is usually printed
    pub initial_region: PixelRect,
    /// Larger crop is the top `1 / band_height_divisor` of the image, full width
    pub band_height_divisor: u32,
    /// Tesseract language
    pub language: String,
    /// Page segmentation mode for automated attempts (engine default when unset)
    pub auto_psm: Option<u8>,
    /// Page segmentation mode for manual re-extraction
    pub manual_psm: Option<u8>,
    /// Explicit Tesseract executable; searched for when unset
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory; searched for when unset
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_csv: PathBuf::from("resultados.csv"),
            output_csv: PathBuf::from("resultados-with-timestamps.csv"),
            image_dir: PathBuf::from("downloaded_images"),
            url_column: "URL".to_string(),
            timestamp_column: "timestamp".to_string(),
            sentinel: "NF".to_string(),
            initial_region: PixelRect::default(),
            band_height_divisor: 4,
            language: "eng".to_string(),
            auto_psm: None,
            manual_psm: Some(6),
            tesseract_path: None,
            tessdata_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from `path` (or `tally-clock.json`), or returns defaults.
    ///
    /// A missing or unparseable file is logged and never fatal.
    pub fn load(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        log::debug!("Looking for config at: {}", config_path.display());

        if !config_path.exists() {
            log::info!(
                "{} not found. Using default config.",
                config_path.display()
            );
            return Self::default();
        }

        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Config loaded from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!(
                    "Failed to read {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}
