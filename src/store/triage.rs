//! Helpers for reviewing records OCR could not resolve.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::result_store::ResultStore;
use crate::paths::image_path_for_url;

/// Counts from copying unresolved images into a review folder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    pub copied: usize,
    pub missing: usize,
}

/// URLs whose timestamp cell contains the sentinel, in file order.
///
/// Records never attempted (empty cell) are not listed.
pub fn unresolved_urls(store: &ResultStore) -> Vec<String> {
    let sentinel = store.schema().sentinel.as_str();
    store
        .records()
        .iter()
        .filter(|r| r.timestamp.to_cell(sentinel).contains(sentinel))
        .map(|r| r.url.clone())
        .collect()
}

/// Writes a single-column `URL` CSV listing every record marked with the sentinel.
pub fn write_unresolved_csv(store: &ResultStore, path: &Path) -> Result<usize> {
    let urls = unresolved_urls(store);

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record([store.schema().url_column.as_str()])?;
    for url in &urls {
        writer.write_record([url.as_str()])?;
    }
    writer.flush().context("Failed to write unresolved list")?;

    log::info!("{} unresolved URLs written to {}", urls.len(), path.display());
    Ok(urls.len())
}

/// Copies the image of every unresolved record from `image_dir` into `dest_dir`.
///
/// Missing source images are logged and counted, never fatal.
pub fn copy_unresolved_images(
    store: &ResultStore,
    image_dir: &Path,
    dest_dir: &Path,
) -> Result<CopySummary> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    let mut summary = CopySummary::default();

    for url in unresolved_urls(store) {
        let Some(src) = image_path_for_url(image_dir, &url) else {
            log::warn!("No file name in URL: {}", url);
            summary.missing += 1;
            continue;
        };

        if !src.exists() {
            log::warn!("File not found: {}", src.display());
            summary.missing += 1;
            continue;
        }

        // image_path_for_url only yields paths that end in a file name
        let Some(file_name) = src.file_name() else {
            summary.missing += 1;
            continue;
        };
        let dst = dest_dir.join(file_name);
        fs::copy(&src, &dst).with_context(|| format!("Failed to copy {}", src.display()))?;
        log::info!("Copied: {}", file_name.to_string_lossy());
        summary.copied += 1;
    }

    Ok(summary)
}
