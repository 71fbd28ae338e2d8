//! Fallback state machine for timestamp extraction.
//!
//! The machine sequences through: initial crop → larger crop → rotated initial
//! crop → rotated larger crop, stopping at the first attempt that yields a time.

use image::DynamicImage;
use std::path::PathBuf;

use crate::automation::config::{PipelineConfig, PixelRect};
use crate::ocr::{Extraction, Recognizer, extract_timestamp};

/// Fallback controller states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackState {
    /// Small fixed box on the image as loaded
    TryInitialCrop,
    /// Full-width top band on the image as loaded
    TryLargerCrop,
    /// Small fixed box on the 180°-rotated copy
    TryRotatedInitial,
    /// Full-width top band on the 180°-rotated copy
    TryRotatedLarger,
    /// A time was found
    Resolved(String),
    /// Every attempt came back empty
    Unresolved,
}

impl std::fmt::Display for FallbackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackState::TryInitialCrop => write!(f, "Trying initial crop"),
            FallbackState::TryLargerCrop => write!(f, "Trying larger crop"),
            FallbackState::TryRotatedInitial => write!(f, "Trying rotated initial crop"),
            FallbackState::TryRotatedLarger => write!(f, "Trying rotated larger crop"),
            FallbackState::Resolved(time) => write!(f, "Resolved: {}", time),
            FallbackState::Unresolved => write!(f, "Unresolved"),
        }
    }
}

impl FallbackState {
    /// Region and orientation this state tries, or `None` for terminal states.
    fn attempt(&self) -> Option<(RegionKind, bool)> {
        match self {
            FallbackState::TryInitialCrop => Some((RegionKind::Initial, false)),
            FallbackState::TryLargerCrop => Some((RegionKind::Band, false)),
            FallbackState::TryRotatedInitial => Some((RegionKind::Initial, true)),
            FallbackState::TryRotatedLarger => Some((RegionKind::Band, true)),
            FallbackState::Resolved(_) | FallbackState::Unresolved => None,
        }
    }

    /// State entered when this attempt comes back empty.
    fn on_miss(&self) -> FallbackState {
        match self {
            FallbackState::TryInitialCrop => FallbackState::TryLargerCrop,
            FallbackState::TryLargerCrop => FallbackState::TryRotatedInitial,
            FallbackState::TryRotatedInitial => FallbackState::TryRotatedLarger,
            _ => FallbackState::Unresolved,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.attempt().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionKind {
    Initial,
    Band,
}

/// Result of running the controller to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub extraction: Extraction,
    /// Whether a rotated copy had to be produced
    pub rotated: bool,
    /// Attempt states visited, in order
    pub attempts: Vec<FallbackState>,
}

/// Per-image controller context holding the source and the lazily-built rotated copy.
pub struct FallbackContext<'a, R: Recognizer + ?Sized> {
    /// Current state
    pub state: FallbackState,
    recognizer: &'a R,
    source: &'a DynamicImage,
    initial_region: PixelRect,
    band_region: PixelRect,
    psm: Option<u8>,
    /// Built on first rotated attempt and reused for the second
    rotated: Option<DynamicImage>,
    /// Where the rotated copy is written, if anywhere
    rotated_artifact: Option<PathBuf>,
    attempts: Vec<FallbackState>,
}

impl<'a, R: Recognizer + ?Sized> FallbackContext<'a, R> {
    pub fn new(source: &'a DynamicImage, recognizer: &'a R, config: &PipelineConfig) -> Self {
        Self {
            state: FallbackState::TryInitialCrop,
            recognizer,
            source,
            initial_region: config.initial_region,
            band_region: PixelRect::top_band(
                source.width(),
                source.height(),
                config.band_height_divisor,
            ),
            psm: config.auto_psm,
            rotated: None,
            rotated_artifact: None,
            attempts: Vec::new(),
        }
    }

    /// Saves the rotated copy to `path` when it gets built.
    pub fn with_rotated_artifact(mut self, path: PathBuf) -> Self {
        self.rotated_artifact = Some(path);
        self
    }

    /// Advances the state machine by one attempt.
    ///
    /// Returns `true` while more attempts remain, `false` once terminal.
    pub fn step(&mut self) -> bool {
        let Some((kind, rotated)) = self.state.attempt() else {
            return false;
        };

        log::debug!("{}", self.state);
        self.attempts.push(self.state.clone());

        let region = match kind {
            RegionKind::Initial => self.initial_region,
            RegionKind::Band => self.band_region,
        };

        let recognizer = self.recognizer;
        let psm = self.psm;
        let image = if rotated {
            self.rotated_image()
        } else {
            self.source
        };

        self.state = match extract_timestamp(image, &region, recognizer, psm) {
            Extraction::Resolved(time) => FallbackState::Resolved(time),
            Extraction::Unresolved => self.state.on_miss(),
        };

        !self.state.is_terminal()
    }

    /// Runs attempts until a terminal state is reached.
    pub fn run(mut self) -> FallbackOutcome {
        while self.step() {}

        let extraction = match &self.state {
            FallbackState::Resolved(time) => Extraction::Resolved(time.clone()),
            _ => Extraction::Unresolved,
        };

        FallbackOutcome {
            extraction,
            rotated: self.rotated.is_some(),
            attempts: self.attempts,
        }
    }

    fn rotated_image(&mut self) -> &DynamicImage {
        let source = self.source;
        let artifact = self.rotated_artifact.as_ref();
        self.rotated.get_or_insert_with(|| {
            let rotated = source.rotate180();
            if let Some(path) = artifact {
                match rotated.save(path) {
                    Ok(()) => log::debug!("Rotated copy saved to {}", path.display()),
                    Err(e) => log::warn!("Failed to save rotated copy {}: {}", path.display(), e),
                }
            }
            rotated
        })
    }
}
