//! Correction session state.
//!
//! Tracks the open record, its image as displayed, the selection and the
//! editable timestamp field.

use image::DynamicImage;
use std::path::PathBuf;

use crate::automation::config::PixelRect;

/// Outcome of the last session command, for display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing opened yet
    #[default]
    Idle,
    /// A record is open and its image loaded
    Opened,
    /// A record is open but its image could not be loaded
    ImageUnavailable(PathBuf),
    /// Extraction filled the field
    Extracted(String),
    /// Extraction found no time; field left as it was
    NoMatch,
    /// Extraction needs a selection first
    NoSelection,
    /// Field written to the store
    Committed(String),
}

impl SessionStatus {
    /// Get display text for the status.
    pub fn status_text(&self) -> String {
        match self {
            Self::Idle => "No record open".to_string(),
            Self::Opened => "Ready".to_string(),
            Self::ImageUnavailable(path) => format!("Image unavailable: {}", path.display()),
            Self::Extracted(time) => format!("Extracted {}", time),
            Self::NoMatch => "No time found in selection".to_string(),
            Self::NoSelection => "Select a region first".to_string(),
            Self::Committed(text) => format!("Saved '{}'", text),
        }
    }
}

/// The record currently under review.
#[derive(Debug)]
pub struct OpenRecord {
    pub url: String,
    /// Image as loaded from disk
    pub original: Option<DynamicImage>,
    /// Image with the current rotation applied
    pub displayed: Option<DynamicImage>,
    /// Clockwise rotation in degrees, 0..360
    pub rotation: i32,
    /// Region of the displayed image to run extraction on
    pub selection: Option<PixelRect>,
}

/// Correction session state.
#[derive(Debug, Default)]
pub struct SessionState {
    pub record: Option<OpenRecord>,
    /// Editable timestamp text
    pub field: String,
    pub status: SessionStatus,
}

impl SessionState {
    pub fn current_url(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.url.as_str())
    }

    pub fn rotation(&self) -> i32 {
        self.record.as_ref().map_or(0, |r| r.rotation)
    }

    pub fn selection(&self) -> Option<PixelRect> {
        self.record.as_ref().and_then(|r| r.selection)
    }

    /// Width and height of the displayed image.
    pub fn displayed_size(&self) -> Option<(u32, u32)> {
        self.record
            .as_ref()
            .and_then(|r| r.displayed.as_ref())
            .map(|img| (img.width(), img.height()))
    }

    /// One-line summary for the prompt.
    pub fn summary(&self) -> String {
        match &self.record {
            None => self.status.status_text(),
            Some(record) => {
                let size = self
                    .displayed_size()
                    .map(|(w, h)| format!("{}x{}", w, h))
                    .unwrap_or_else(|| "no image".to_string());
                let selection = self
                    .selection()
                    .map(|r| format!("{}x{} at ({}, {})", r.width(), r.height(), r.left, r.top))
                    .unwrap_or_else(|| "none".to_string());
                format!(
                    "{} [{}, rotated {}°, selection {}] timestamp='{}' - {}",
                    record.url,
                    size,
                    self.rotation(),
                    selection,
                    self.field,
                    self.status.status_text()
                )
            }
        }
    }
}
