//! Text recognition for tally-sheet images.
//!
//! Crops a region, hands it to Tesseract, and scans the output for a
//! 24-hour reporting time.

pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{OcrError, Recognizer, TesseractEngine};
pub use extract::{Extraction, extract_timestamp};
pub use preprocess::rotate_quarter_turns;
pub use setup::ensure_tesseract;
