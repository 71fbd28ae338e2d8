use std::path::{Path, PathBuf};

/// Suffix appended to the file stem of a rotated side copy.
const ROTATED_SUFFIX: &str = "_rotated";

/// Returns the per-user data directory: `<data_local_dir>/tally-clock/`
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally-clock")
}

/// Returns the directory holding the run log.
pub fn get_logs_dir() -> PathBuf {
    get_data_dir().join("logs")
}

/// Returns the log file every run appends to.
pub fn get_log_path() -> PathBuf {
    get_logs_dir().join("tally-clock.log")
}

/// Returns the directory used for downloaded Tesseract language data.
pub fn get_tessdata_dir() -> PathBuf {
    get_data_dir().join("tessdata")
}

/// Extracts the image file name from a source URL.
///
/// Only the last path segment is used; query strings and fragments are ignored.
/// Plain relative names like `a.jpg` are accepted as-is.
pub fn filename_for_url(url: &str) -> Option<String> {
    let name = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.last())
            .map(|s| s.to_string()),
        Err(_) => {
            let without_query = url.split(['?', '#']).next().unwrap_or(url);
            without_query
                .rsplit(['/', '\\'])
                .next()
                .map(|s| s.to_string())
        }
    };

    name.filter(|n| !n.is_empty())
}

/// Resolves the local image path for a record's source URL.
pub fn image_path_for_url(image_dir: &Path, url: &str) -> Option<PathBuf> {
    filename_for_url(url).map(|name| image_dir.join(name))
}

/// Returns the path of the rotated side copy: `<stem>_rotated.<ext>` next to the source.
pub fn rotated_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, ROTATED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, ROTATED_SUFFIX),
    };
    source.with_file_name(file_name)
}
