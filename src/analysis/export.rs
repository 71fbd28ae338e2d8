//! JSON export for timeline data.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export a serializable summary to a JSON file.
///
/// The output is pretty-printed for human readability.
pub fn export_to_json<T: Serialize>(value: &T, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).context("Failed to serialize timeline to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::statistics::{TimeDistribution, TimelineReport};
    use tempfile::tempdir;

    #[test]
    fn test_export_to_json() {
        let mut distribution = TimeDistribution::default();
        distribution.by_second.insert(5, 2);
        let report = TimelineReport {
            candidates: vec!["EG".to_string()],
            total_reports: 5,
            dropped_reports: 1,
            interval_minutes: 10,
            cumulative: Vec::new(),
            buckets: Vec::new(),
            distribution,
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("timeline.json");

        export_to_json(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"total_reports\": 5"));
        assert!(content.contains("\"interval_minutes\": 10"));
        assert!(content.contains("\"5\": 2"));
    }

    #[test]
    fn test_export_to_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("timeline.json");
        assert!(export_to_json(&vec![1, 2, 3], &path).is_err());
    }
}
