use image::DynamicImage;
use regex::Regex;
use std::sync::OnceLock;

use super::engine::Recognizer;
use super::preprocess::crop_region;
use crate::automation::config::PixelRect;

/// 24-hour clock time: `HH:MM` with an optional `:SS`.
/// Hours 00-23, minutes and seconds 00-59.
const TIME_PATTERN: &str = r"\b([01]\d|2[0-3]):([0-5]\d)(?::([0-5]\d))?\b";

fn time_regex() -> &'static Regex {
    static TIME_REGEX: OnceLock<Regex> = OnceLock::new();
    TIME_REGEX.get_or_init(|| Regex::new(TIME_PATTERN).expect("TIME_PATTERN is a valid regex"))
}

/// Outcome of a single extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A time string was found in the recognized text
    Resolved(String),
    /// Nothing usable was recognized
    Unresolved,
}

/// Returns the first `HH:MM` / `HH:MM:SS` substring in OCR output.
pub fn find_time(text: &str) -> Option<String> {
    time_regex().find(text).map(|m| m.as_str().to_string())
}

/// Crops `region` out of `img`, recognizes it, and scans the text for a time.
///
/// Engine errors are contained here and reported as `Unresolved`, so callers
/// can move on to their next attempt.
pub fn extract_timestamp<R: Recognizer + ?Sized>(
    img: &DynamicImage,
    region: &PixelRect,
    recognizer: &R,
    psm: Option<u8>,
) -> Extraction {
    let Some(cropped) = crop_region(img, region) else {
        log::debug!(
            "Region {:?} lies outside the {}x{} image",
            region,
            img.width(),
            img.height()
        );
        return Extraction::Unresolved;
    };

    let text = match recognizer.recognize(&cropped, psm) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Recognition failed for region {:?}: {}", region, e);
            return Extraction::Unresolved;
        }
    };

    match find_time(&text) {
        Some(time) => Extraction::Resolved(time),
        None => {
            log::debug!("No time found in OCR text: {:?}", text.trim());
            Extraction::Unresolved
        }
    }
}
