use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::OcrError;
use crate::automation::config::PipelineConfig;
use crate::paths::get_tessdata_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const COMMON_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

#[cfg(not(windows))]
const COMMON_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

#[cfg(windows)]
const SYSTEM_TESSDATA: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

#[cfg(not(windows))]
const SYSTEM_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Makes sure Tesseract and the configured language data are usable.
///
/// The executable must already be installed. Language data is downloaded into
/// the local data directory if no tessdata directory provides it.
pub fn ensure_tesseract(config: &PipelineConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;
    log::info!("Tesseract found at: {}", executable.display());

    if let Ok(tessdata) = find_tessdata_dir(config.tessdata_dir.as_deref(), &config.language) {
        log::info!(
            "{}.traineddata found in: {}",
            config.language,
            tessdata.display()
        );
        return Ok(TesseractPaths { executable, tessdata });
    }

    let tessdata = get_tessdata_dir();
    fs::create_dir_all(&tessdata)
        .with_context(|| format!("Failed to create {}", tessdata.display()))?;
    download_tessdata(&tessdata, &config.language)?;

    log::info!("Tesseract ready, language data in: {}", tessdata.display());

    Ok(TesseractPaths { executable, tessdata })
}

/// Downloads `<language>.traineddata` from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, language);
    let target = tessdata_dir.join(format!("{}.traineddata", language));

    log::info!("Downloading {}.traineddata...", language);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "tally-clock")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            language,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    file.write_all(&bytes)?;

    log::info!(
        "Downloaded {}.traineddata ({} bytes)",
        language,
        bytes.len()
    );

    Ok(())
}

/// Finds the Tesseract executable: configured path first, then PATH, then common locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf, OcrError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        log::warn!(
            "Configured Tesseract path {} does not exist, searching instead",
            path.display()
        );
    }

    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    COMMON_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            OcrError::EngineNotFound("Tesseract not found. Please install Tesseract-OCR.".to_string())
        })
}

/// Finds a tessdata directory containing `<language>.traineddata`.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Result<PathBuf, OcrError> {
    let traineddata = format!("{}.traineddata", language);
    let has_language = |dir: &Path| dir.join(&traineddata).exists();

    if let Some(dir) = configured {
        if has_language(dir) {
            return Ok(dir.to_path_buf());
        }
    }

    let local = get_tessdata_dir();
    if has_language(&local) {
        return Ok(local);
    }

    // TESSDATA_PREFIX may point at the tessdata dir itself or at its parent
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        if has_language(&prefix) {
            return Ok(prefix);
        }
        let nested = prefix.join("tessdata");
        if has_language(&nested) {
            return Ok(nested);
        }
    }

    SYSTEM_TESSDATA
        .iter()
        .map(PathBuf::from)
        .find(|p| has_language(p))
        .ok_or_else(|| {
            OcrError::EngineNotFound(format!(
                "tessdata directory not found. Please ensure {} is available.",
                traineddata
            ))
        })
}
