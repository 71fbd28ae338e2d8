//! Manual timestamp correction.
//!
//! This module provides:
//! - A command-driven correction session over the result store
//! - Session state (open record, rotation, selection, editable field)
//! - A line-based command parser and stdin/stdout loop

pub mod command;
pub mod repl;
pub mod state;

pub use repl::run_session;
pub use state::{OpenRecord, SessionState, SessionStatus};

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;

use crate::automation::config::{PipelineConfig, PixelRect};
use crate::ocr::{Extraction, Recognizer, extract_timestamp, rotate_quarter_turns};
use crate::paths::image_path_for_url;
use crate::store::ResultStore;

/// Interactive correction of one record at a time.
///
/// Every commit is written through the store and saved immediately.
pub struct CorrectionSession<'a, R: Recognizer + ?Sized> {
    store: &'a mut ResultStore,
    recognizer: &'a R,
    image_dir: PathBuf,
    psm: Option<u8>,
    state: SessionState,
}

impl<'a, R: Recognizer + ?Sized> CorrectionSession<'a, R> {
    pub fn new(store: &'a mut ResultStore, recognizer: &'a R, config: &PipelineConfig) -> Self {
        Self {
            store,
            recognizer,
            image_dir: config.image_dir.clone(),
            psm: config.manual_psm,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &ResultStore {
        self.store
    }

    /// Opens a record, loading its image and filling the field with its current value.
    ///
    /// Rotation and selection are reset. A missing image is not an error; the
    /// field can still be edited and committed.
    pub fn open(&mut self, url: &str) -> Result<()> {
        let record = self
            .store
            .get(url)
            .ok_or_else(|| anyhow!("Unknown URL: {}", url))?;
        let field = record.timestamp.to_cell(&self.store.schema().sentinel);

        let image_path = image_path_for_url(&self.image_dir, url);
        let original = match &image_path {
            Some(path) => match image::open(path) {
                Ok(img) => Some(img),
                Err(e) => {
                    log::warn!("Failed to load image: {}: {}", path.display(), e);
                    None
                }
            },
            None => {
                log::warn!("No file name in URL: {}", url);
                None
            }
        };

        self.state.status = if original.is_some() {
            SessionStatus::Opened
        } else {
            SessionStatus::ImageUnavailable(image_path.unwrap_or_else(|| self.image_dir.clone()))
        };
        self.state.record = Some(OpenRecord {
            url: url.to_string(),
            displayed: original.clone(),
            original,
            rotation: 0,
            selection: None,
        });
        self.state.field = field;

        log::debug!("Opened {}", url);
        Ok(())
    }

    /// Opens the next unresolved record after the current one, wrapping around.
    ///
    /// Returns the opened URL, or `None` when nothing is left to correct.
    pub fn next_unresolved(&mut self) -> Result<Option<String>> {
        let records = self.store.records();
        let current = self.state.current_url();
        let start = current
            .and_then(|url| records.iter().position(|r| r.url == url))
            .map_or(0, |i| i + 1);

        let next = records
            .iter()
            .cycle()
            .skip(start)
            .take(records.len())
            .find(|r| !r.is_resolved() && Some(r.url.as_str()) != current)
            .map(|r| r.url.clone());

        match next {
            Some(url) => {
                self.open(&url)?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }

    /// Sets the region of the displayed image that `extract` will read.
    pub fn select_region(&mut self, rect: PixelRect) -> Result<()> {
        let record = self.open_record_mut()?;
        record.selection = Some(rect);
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        let record = self.open_record_mut()?;
        record.selection = None;
        Ok(())
    }

    /// Rotates the displayed image by a multiple of 90 degrees (positive is clockwise).
    ///
    /// Rotation accumulates modulo 360 and always re-derives the displayed pixels
    /// from the original. The selection is cleared since its coordinates no longer
    /// match.
    pub fn rotate(&mut self, degrees: i32) -> Result<()> {
        if degrees % 90 != 0 {
            return Err(anyhow!("Rotation must be a multiple of 90 degrees, got {}", degrees));
        }

        let record = self.open_record_mut()?;
        record.rotation = (record.rotation + degrees.rem_euclid(360)) % 360;
        record.selection = None;
        if let Some(original) = &record.original {
            record.displayed = Some(rotate_quarter_turns(original, record.rotation)?);
        }
        Ok(())
    }

    /// Runs extraction on the selection of the displayed image.
    ///
    /// On a match the field is replaced and the time returned. Otherwise the field
    /// keeps its value.
    pub fn extract(&mut self) -> Option<String> {
        let record = self.state.record.as_ref()?;
        let Some(image) = &record.displayed else {
            self.state.status = SessionStatus::ImageUnavailable(self.image_dir.clone());
            return None;
        };
        let Some(region) = record.selection else {
            self.state.status = SessionStatus::NoSelection;
            return None;
        };

        match extract_timestamp(image, &region, self.recognizer, self.psm) {
            Extraction::Resolved(time) => {
                log::info!("Extracted {} from {:?}", time, region);
                self.state.field = time.clone();
                self.state.status = SessionStatus::Extracted(time.clone());
                Some(time)
            }
            Extraction::Unresolved => {
                self.state.status = SessionStatus::NoMatch;
                None
            }
        }
    }

    /// Replaces the editable field.
    pub fn set_text(&mut self, text: &str) {
        self.state.field = text.to_string();
    }

    /// Writes the field verbatim to the open record and saves the store.
    pub fn commit(&mut self) -> Result<()> {
        let url = self
            .state
            .current_url()
            .ok_or_else(|| anyhow!("No record open"))?
            .to_string();
        let text = self.state.field.clone();

        self.store.correct(&url, text.as_str());
        self.store
            .save()
            .with_context(|| format!("Failed to save results to {}", self.store.path().display()))?;

        log::info!("Corrected {}: {}", url, text);
        self.state.status = SessionStatus::Committed(text);
        Ok(())
    }

    fn open_record_mut(&mut self) -> Result<&mut OpenRecord> {
        self.state
            .record
            .as_mut()
            .ok_or_else(|| anyhow!("No record open"))
    }
}
