//! CSV reader for timestamped tally results.
//!
//! Parses the result set into one report per row with a normalized time and
//! per-candidate vote counts.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use std::path::Path;

use super::normalize::{has_seconds, normalize_time};

/// One tally sheet report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Time text as stored in the result set
    pub raw_time: String,
    /// Normalized time (anchored, with next-day rollover)
    pub time: NaiveDateTime,
    /// Votes per candidate, in `VoteTable::candidates` order
    pub votes: Vec<u64>,
}

impl Report {
    pub fn has_seconds(&self) -> bool {
        has_seconds(&self.raw_time)
    }
}

/// All reports loaded from a result CSV, sorted by normalized time.
#[derive(Debug, Clone)]
pub struct VoteTable {
    /// Candidate column names
    pub candidates: Vec<String>,
    /// Reports in chronological order
    pub reports: Vec<Report>,
    /// Rows dropped because their time did not parse
    pub dropped: usize,
}

impl VoteTable {
    /// Load reports from a CSV file.
    ///
    /// Candidate columns are detected: every column other than the time column and
    /// `exclude` whose cells parse as non-negative integers on every row with a
    /// valid time. Rows with an unparseable time are skipped with a warning.
    pub fn from_csv(path: &Path, time_column: &str, exclude: &[&str]) -> Result<Self> {
        let (headers, rows) = read_rows(path)?;
        let time_idx = column_index(&headers, time_column, path)?;

        let mut timed = Vec::new();
        let mut dropped = 0;
        for (row_num, row) in rows.iter().enumerate() {
            let raw = row.get(time_idx).map(String::as_str).unwrap_or("");
            match normalize_time(raw) {
                Ok(time) => timed.push((row, time)),
                Err(e) => {
                    log::warn!("Skipping row {}: {}", row_num + 2, e);
                    dropped += 1;
                }
            }
        }

        let candidate_idx: Vec<usize> = (0..headers.len())
            .filter(|&i| i != time_idx && !exclude.contains(&headers[i].as_str()))
            .filter(|&i| {
                !timed.is_empty()
                    && timed
                        .iter()
                        .all(|(row, _)| parse_votes(row.get(i).map(String::as_str)).is_some())
            })
            .collect();

        let candidates = candidate_idx.iter().map(|&i| headers[i].clone()).collect();
        let mut reports: Vec<Report> = timed
            .into_iter()
            .map(|(row, time)| Report {
                raw_time: row[time_idx].trim().to_string(),
                time,
                votes: candidate_idx
                    .iter()
                    .map(|&i| parse_votes(row.get(i).map(String::as_str)).unwrap_or(0))
                    .collect(),
            })
            .collect();
        reports.sort_by_key(|r| r.time);

        Ok(VoteTable { candidates, reports, dropped })
    }

    /// Load reports using an explicit candidate list.
    ///
    /// Rows with an unparseable time or vote count are skipped with a warning.
    pub fn from_csv_with_candidates(
        path: &Path,
        time_column: &str,
        candidates: &[String],
    ) -> Result<Self> {
        let (headers, rows) = read_rows(path)?;
        let time_idx = column_index(&headers, time_column, path)?;
        let candidate_idx = candidates
            .iter()
            .map(|c| column_index(&headers, c, path))
            .collect::<Result<Vec<_>>>()?;

        let mut reports = Vec::new();
        let mut dropped = 0;
        for (row_num, row) in rows.iter().enumerate() {
            let raw = row.get(time_idx).map(String::as_str).unwrap_or("");
            let time = match normalize_time(raw) {
                Ok(time) => time,
                Err(e) => {
                    log::warn!("Skipping row {}: {}", row_num + 2, e);
                    dropped += 1;
                    continue;
                }
            };

            let votes: Option<Vec<u64>> = candidate_idx
                .iter()
                .map(|&i| parse_votes(row.get(i).map(String::as_str)))
                .collect();
            match votes {
                Some(votes) => reports.push(Report {
                    raw_time: raw.trim().to_string(),
                    time,
                    votes,
                }),
                None => {
                    log::warn!("Skipping row {}: invalid vote count", row_num + 2);
                    dropped += 1;
                }
            }
        }
        reports.sort_by_key(|r| r.time);

        Ok(VoteTable {
            candidates: candidates.to_vec(),
            reports,
            dropped,
        })
    }

    /// Number of reports in the table.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

fn parse_votes(cell: Option<&str>) -> Option<u64> {
    cell?.trim().parse::<u64>().ok()
}

fn column_index(headers: &[String], name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| anyhow!("Column '{}' not found in {}", name, path.display()))
}

fn read_rows(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => log::warn!("Skipping malformed CSV row {}: {}", row_num + 2, e),
        }
    }
    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_detects_candidates_and_sorts() {
        let file = create_test_csv(
            "URL,timestamp,EG,MM,Notes
https://x.org/b.jpg,01:10,5,7,late
https://x.org/a.jpg,19:00:05,10,3,early
https://x.org/c.jpg,NF,1,1,
",
        );

        let table = VoteTable::from_csv(file.path(), "timestamp", &["URL"]).unwrap();

        assert_eq!(table.candidates, vec!["EG", "MM"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped, 1);
        // 19:00 on the anchor day sorts before 01:10 on the next day
        assert_eq!(table.reports[0].raw_time, "19:00:05");
        assert_eq!(table.reports[0].votes, vec![10, 3]);
        assert_eq!(table.reports[1].votes, vec![5, 7]);
        assert!(table.reports[0].has_seconds());
        assert!(!table.reports[1].has_seconds());
    }

    #[test]
    fn test_explicit_candidates_skip_bad_counts() {
        let file = create_test_csv(
            "URL,timestamp,EG,MM
a.jpg,19:00,10,3
b.jpg,19:05,n/a,4
",
        );

        let table = VoteTable::from_csv_with_candidates(
            file.path(),
            "timestamp",
            &["MM".to_string(), "EG".to_string()],
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.reports[0].votes, vec![3, 10]);
        assert_eq!(table.dropped, 1);
    }

    #[test]
    fn test_missing_time_column() {
        let file = create_test_csv("URL,EG\na.jpg,1\n");
        let err = VoteTable::from_csv(file.path(), "timestamp", &[]).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_header_only() {
        let file = create_test_csv("URL,timestamp,EG\n");
        let table = VoteTable::from_csv(file.path(), "timestamp", &["URL"]).unwrap();
        assert!(table.is_empty());
        assert!(table.candidates.is_empty());
    }
}
