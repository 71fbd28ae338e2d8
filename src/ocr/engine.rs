use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use crate::automation::config::PipelineConfig;

/// Errors raised by a text-recognition engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not found: {0}")]
    EngineNotFound(String),

    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A text-recognition engine treated as a black box: image in, text out.
///
/// `psm` is an engine-specific page-segmentation hint passed through unchanged.
pub trait Recognizer {
    fn recognize(&self, img: &GrayImage, psm: Option<u8>) -> Result<String, OcrError>;
}

/// Tesseract driven through its command-line interface.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
}

impl TesseractEngine {
    pub fn new(executable: PathBuf, tessdata: Option<PathBuf>, language: &str) -> Self {
        Self {
            executable,
            tessdata,
            language: language.to_string(),
        }
    }

    /// Locates Tesseract using the configured paths, then the usual install locations.
    ///
    /// A missing tessdata directory is not an error here; Tesseract then uses its
    /// compiled-in default.
    pub fn discover(config: &PipelineConfig) -> Result<Self, OcrError> {
        let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;
        let tessdata = find_tessdata_dir(config.tessdata_dir.as_deref(), &config.language).ok();

        log::debug!(
            "Using Tesseract at {} (tessdata: {})",
            executable.display(),
            tessdata
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "engine default".to_string())
        );

        Ok(Self::new(executable, tessdata, &config.language))
    }

    /// Arguments after the input path: output to stdout, data dir, language, psm.
    fn build_args(&self, psm: Option<u8>) -> Vec<String> {
        let mut args = vec!["stdout".to_string()];
        if let Some(dir) = &self.tessdata {
            args.push("--tessdata-dir".to_string());
            args.push(dir.to_string_lossy().to_string());
        }
        args.push("-l".to_string());
        args.push(self.language.clone());
        if let Some(mode) = psm {
            args.push("--psm".to_string());
            args.push(mode.to_string());
        }
        args
    }
}

impl Recognizer for TesseractEngine {
    fn recognize(&self, img: &GrayImage, psm: Option<u8>) -> Result<String, OcrError> {
        // Tesseract reads from disk, so stage the crop as a temporary PNG
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .args(self.build_args(psm))
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::EngineFailed(stderr.trim().to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::EngineNotFound(
                self.executable.display().to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_with_psm_and_tessdata() {
        let engine = TesseractEngine::new(
            PathBuf::from("tesseract"),
            Some(PathBuf::from("/opt/tessdata")),
            "eng",
        );
        assert_eq!(
            engine.build_args(Some(6)),
            vec!["stdout", "--tessdata-dir", "/opt/tessdata", "-l", "eng", "--psm", "6"]
        );
    }

    #[test]
    fn test_args_default_psm() {
        let engine = TesseractEngine::new(PathBuf::from("tesseract"), None, "mkd");
        assert_eq!(engine.build_args(None), vec!["stdout", "-l", "mkd"]);
    }

    #[test]
    fn test_missing_executable_reports_not_found() {
        let engine = TesseractEngine::new(
            PathBuf::from("/nonexistent/tesseract-binary"),
            None,
            "eng",
        );
        let img = GrayImage::new(4, 4);
        match engine.recognize(&img, None) {
            Err(OcrError::EngineNotFound(path)) => assert!(path.contains("tesseract-binary")),
            other => panic!("expected EngineNotFound, got {:?}", other),
        }
    }
}
