//! CSV-backed result set keyed by source URL.
//!
//! The whole file is held in memory, merged into with `upsert`, and written
//! back atomically with `save`.

use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::StoreError;
use super::record::{Record, TimestampCell};
use crate::automation::config::PipelineConfig;

/// Column names and sentinel that give the CSV its meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    pub url_column: String,
    pub timestamp_column: String,
    pub sentinel: String,
}

impl Default for StoreSchema {
    fn default() -> Self {
        Self {
            url_column: "URL".to_string(),
            timestamp_column: "timestamp".to_string(),
            sentinel: "NF".to_string(),
        }
    }
}

impl StoreSchema {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            url_column: config.url_column.clone(),
            timestamp_column: config.timestamp_column.clone(),
            sentinel: config.sentinel.clone(),
        }
    }
}

/// Who is writing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// The OCR pass; never displaces a resolved timestamp
    Automated,
    /// A human correction; always wins
    Manual,
}

/// What `upsert` did with the incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Existing resolved value was preserved
    Kept,
}

pub struct ResultStore {
    path: PathBuf,
    schema: StoreSchema,
    /// Header as read from disk; `None` until a file has been loaded
    columns: Option<Vec<String>>,
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl ResultStore {
    /// Creates an empty store that will be saved to `path`.
    pub fn new(path: &Path, schema: StoreSchema) -> Self {
        Self {
            path: path.to_path_buf(),
            schema,
            columns: None,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Loads all records from `path`. A missing file gives an empty store.
    pub fn load(path: &Path, schema: StoreSchema) -> Result<Self, StoreError> {
        let mut store = Self::new(path, schema);
        if path.exists() {
            store.read_from(path)?;
        }
        Ok(store)
    }

    /// Loads `output` if it exists, otherwise seeds from `input`.
    ///
    /// Either way the store saves to `output`, so re-runs resume from previous results.
    pub fn load_or_seed(output: &Path, input: &Path, schema: StoreSchema) -> Result<Self, StoreError> {
        let mut store = Self::new(output, schema);
        if output.exists() {
            store.read_from(output)?;
        } else if input.exists() {
            log::info!(
                "{} not found, seeding from {}",
                output.display(),
                input.display()
            );
            store.read_from(input)?;
        } else {
            log::warn!(
                "Neither {} nor {} exists, starting empty",
                output.display(),
                input.display()
            );
        }
        Ok(store)
    }

    /// Reads every row of a CSV file into the keyed set.
    ///
    /// Duplicate URLs are merged. The last resolved row wins, and a resolved
    /// timestamp is never displaced by a later unresolved row. Rows without a
    /// URL are skipped with a warning. Repeated header names are rejected.
    fn read_from(&mut self, source: &Path) -> Result<(), StoreError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_path(source)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        // Carried cells are keyed by column name
        for (i, name) in headers.iter().enumerate() {
            if headers[..i].contains(name) {
                return Err(StoreError::DuplicateColumn {
                    column: name.clone(),
                    path: source.to_path_buf(),
                });
            }
        }

        let url_idx = headers
            .iter()
            .position(|h| h == &self.schema.url_column)
            .ok_or_else(|| StoreError::MissingColumn {
                column: self.schema.url_column.clone(),
                path: source.to_path_buf(),
            })?;
        let ts_idx = headers
            .iter()
            .position(|h| h == &self.schema.timestamp_column);

        let mut columns = headers.clone();
        if ts_idx.is_none() {
            columns.push(self.schema.timestamp_column.clone());
        }

        for (row_num, result) in reader.records().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping malformed CSV row {}: {}", row_num + 2, e);
                    continue;
                }
            };

            let url = row.get(url_idx).unwrap_or("").trim();
            if url.is_empty() {
                log::warn!("Skipping CSV row {}: empty {}", row_num + 2, self.schema.url_column);
                continue;
            }

            let timestamp = ts_idx
                .and_then(|i| row.get(i))
                .map(|raw| TimestampCell::from_cell(raw, &self.schema.sentinel))
                .unwrap_or(TimestampCell::Empty);

            let record = headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != url_idx && Some(*i) != ts_idx)
                .fold(Record::new(url, timestamp), |record, (i, name)| {
                    record.with_field(name.as_str(), row.get(i).unwrap_or(""))
                });

            // Later resolved rows win; unresolved rows never displace a resolved one
            let origin = if record.is_resolved() {
                WriteOrigin::Manual
            } else {
                WriteOrigin::Automated
            };
            self.upsert(record, origin);
        }

        self.columns = Some(columns);

        log::info!(
            "Loaded {} records from {}",
            self.records.len(),
            source.display()
        );
        Ok(())
    }

    /// Merges a record into the keyed set.
    ///
    /// Automated writes leave an already-resolved timestamp alone. Manual writes
    /// always replace the timestamp. Carried columns from the incoming record
    /// overwrite same-named columns; others are kept.
    pub fn upsert(&mut self, record: Record, origin: WriteOrigin) -> UpsertOutcome {
        let Some(&idx) = self.index.get(&record.url) else {
            self.index.insert(record.url.clone(), self.records.len());
            self.records.push(record);
            return UpsertOutcome::Inserted;
        };

        let existing = &mut self.records[idx];
        if origin == WriteOrigin::Automated && existing.is_resolved() {
            return UpsertOutcome::Kept;
        }

        existing.timestamp = record.timestamp;
        for (name, value) in record.fields {
            match existing.fields.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = value,
                None => existing.fields.push((name, value)),
            }
        }
        UpsertOutcome::Replaced
    }

    /// Writes a human-entered timestamp verbatim, overwriting whatever was there.
    pub fn correct(&mut self, url: &str, text: impl Into<String>) -> UpsertOutcome {
        self.upsert(
            Record::new(url, TimestampCell::Resolved(text.into())),
            WriteOrigin::Manual,
        )
    }

    /// Writes the full keyed set back to disk, replacing the file atomically.
    ///
    /// The column set is the loaded header, or inferred from the first record
    /// when nothing was loaded. Columns only some records carry are appended.
    pub fn save(&self) -> Result<(), StoreError> {
        let columns = self.output_columns()?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let temp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file());
            writer.write_record(&columns)?;
            for record in &self.records {
                writer.write_record(columns.iter().map(|c| self.cell(record, c)))?;
            }
            writer.flush()?;
        }
        temp.persist(&self.path)?;

        log::info!(
            "Saved {} records to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn output_columns(&self) -> Result<Vec<String>, StoreError> {
        let mut columns = match (self.columns(), self.records.first()) {
            (Some(columns), _) => columns.to_vec(),
            (None, Some(first)) => {
                let mut inferred = vec![
                    self.schema.url_column.clone(),
                    self.schema.timestamp_column.clone(),
                ];
                inferred.extend(first.fields.iter().map(|(n, _)| n.clone()));
                inferred
            }
            (None, None) => return Err(StoreError::SchemaInference),
        };

        for record in &self.records {
            for (name, _) in &record.fields {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        Ok(columns)
    }

    fn cell(&self, record: &Record, column: &str) -> String {
        if column == self.schema.url_column {
            record.url.clone()
        } else if column == self.schema.timestamp_column {
            record.timestamp.to_cell(&self.schema.sentinel)
        } else {
            record.field(column).unwrap_or("").to_string()
        }
    }

    pub fn get(&self, url: &str) -> Option<&Record> {
        self.index.get(url).map(|&i| &self.records[i])
    }

    /// Records in first-seen order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// URLs eligible for automated resolution, in file order.
    pub fn pending_urls(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.is_resolved())
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "URL,timestamp,EG,NM
https://example.org/img/a.jpg,19:05,120,98
https://example.org/img/b.jpg,NF,40,77
\"https://example.org/img/c,1.jpg\",,5,6
";

    fn resolved(text: &str) -> TimestampCell {
        TimestampCell::Resolved(text.to_string())
    }

    fn sample_store(dir: &Path) -> ResultStore {
        let path = dir.join("results.csv");
        fs::write(&path, SAMPLE).unwrap();
        ResultStore::load(&path, StoreSchema::default()).unwrap()
    }

    #[test]
    fn test_load_keys_by_url() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());

        assert_eq!(store.len(), 3);
        let a = store.get("https://example.org/img/a.jpg").unwrap();
        assert_eq!(a.timestamp, resolved("19:05"));
        assert_eq!(a.field("EG"), Some("120"));
        assert_eq!(
            store.get("https://example.org/img/b.jpg").unwrap().timestamp,
            TimestampCell::NotFound
        );
        assert_eq!(
            store.get("https://example.org/img/c,1.jpg").unwrap().timestamp,
            TimestampCell::Empty
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = ResultStore::load(&dir.path().join("absent.csv"), StoreSchema::default()).unwrap();
        assert!(store.is_empty());
        assert!(store.columns().is_none());
    }

    #[test]
    fn test_load_requires_url_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "link,timestamp\nx,19:00\n").unwrap();

        match ResultStore::load(&path, StoreSchema::default()) {
            Err(StoreError::MissingColumn { column, .. }) => assert_eq!(column, "URL"),
            other => panic!("expected MissingColumn, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_load_rejects_repeated_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repeated.csv");
        fs::write(&path, "URL,timestamp,EG,EG\na.jpg,19:00,1,2\n").unwrap();

        match ResultStore::load(&path, StoreSchema::default()) {
            Err(StoreError::DuplicateColumn { column, .. }) => assert_eq!(column, "EG"),
            other => panic!("expected DuplicateColumn, got {:?}", other.map(|s| s.len())),
        }
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "URL,timestamp,EG,EG\na.jpg,19:00,1,2\n"
        );
    }

    #[test]
    fn test_load_adds_missing_timestamp_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "URL,EG\na.jpg,10\n").unwrap();

        let store = ResultStore::load(&path, StoreSchema::default()).unwrap();
        assert_eq!(store.columns().unwrap(), &["URL", "EG", "timestamp"]);
        assert_eq!(store.get("a.jpg").unwrap().timestamp, TimestampCell::Empty);
    }

    #[test]
    fn test_duplicate_url_resolved_row_is_authoritative() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dups.csv");
        fs::write(&path, "URL,timestamp\na.jpg,NF\na.jpg,20:10\na.jpg,NF\n").unwrap();

        let store = ResultStore::load(&path, StoreSchema::default()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.jpg").unwrap().timestamp, resolved("20:10"));
    }

    #[test]
    fn test_duplicate_url_last_resolved_row_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dups.csv");
        fs::write(
            &path,
            "URL,timestamp,EG\na.jpg,19:00,1\na.jpg,20:10,2\na.jpg,,3\na.jpg,NF,4\n",
        )
        .unwrap();

        let store = ResultStore::load(&path, StoreSchema::default()).unwrap();
        let record = store.get("a.jpg").unwrap();
        assert_eq!(record.timestamp, resolved("20:10"));
        assert_eq!(record.field("EG"), Some("2"));
    }

    #[test]
    fn test_automated_upsert_never_regresses_resolved() {
        let dir = tempdir().unwrap();
        let mut store = sample_store(dir.path());
        let url = "https://example.org/img/a.jpg";

        let outcome = store.upsert(Record::new(url, TimestampCell::NotFound), WriteOrigin::Automated);
        assert_eq!(outcome, UpsertOutcome::Kept);
        assert_eq!(store.get(url).unwrap().timestamp, resolved("19:05"));

        // A different automated result does not displace it either
        let outcome = store.upsert(Record::new(url, resolved("07:00")), WriteOrigin::Automated);
        assert_eq!(outcome, UpsertOutcome::Kept);
        assert_eq!(store.get(url).unwrap().timestamp, resolved("19:05"));
    }

    #[test]
    fn test_automated_upsert_fills_unresolved() {
        let dir = tempdir().unwrap();
        let mut store = sample_store(dir.path());
        let url = "https://example.org/img/b.jpg";

        let outcome = store.upsert(Record::new(url, resolved("21:00:01")), WriteOrigin::Automated);
        assert_eq!(outcome, UpsertOutcome::Replaced);

        let record = store.get(url).unwrap();
        assert_eq!(record.timestamp, resolved("21:00:01"));
        // Carried columns survive a timestamp-only write
        assert_eq!(record.field("NM"), Some("77"));
    }

    #[test]
    fn test_manual_correction_always_overwrites() {
        let dir = tempdir().unwrap();
        let mut store = sample_store(dir.path());
        let url = "https://example.org/img/a.jpg";

        assert_eq!(store.correct(url, "18:59"), UpsertOutcome::Replaced);
        assert_eq!(store.get(url).unwrap().timestamp, resolved("18:59"));

        // Free text is accepted without validation
        store.correct(url, "illegible stamp");
        assert_eq!(store.get(url).unwrap().timestamp, resolved("illegible stamp"));
    }

    #[test]
    fn test_manual_correction_inserts_new_url() {
        let mut store = ResultStore::new(Path::new("unused.csv"), StoreSchema::default());
        assert_eq!(store.correct("new.jpg", "19:00"), UpsertOutcome::Inserted);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());

        let out = dir.path().join("out.csv");
        let mut copy = ResultStore::new(&out, StoreSchema::default());
        for record in store.records() {
            copy.upsert(record.clone(), WriteOrigin::Automated);
        }
        copy.columns = store.columns.clone();
        copy.save().unwrap();

        let reloaded = ResultStore::load(&out, StoreSchema::default()).unwrap();
        assert_eq!(reloaded.records(), store.records());
        assert_eq!(reloaded.columns(), store.columns());
    }

    #[test]
    fn test_save_overwrites_in_place() {
        let dir = tempdir().unwrap();
        let mut store = sample_store(dir.path());

        store.correct("https://example.org/img/b.jpg", "19:30:00");
        store.save().unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("URL,timestamp,EG,NM"));
        assert!(content.contains("https://example.org/img/b.jpg,19:30:00,40,77"));
        // Embedded comma stays quoted
        assert!(content.contains("\"https://example.org/img/c,1.jpg\",,5,6"));
    }

    #[test]
    fn test_save_infers_schema_from_first_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.csv");
        let mut store = ResultStore::new(&path, StoreSchema::default());
        store.upsert(
            Record::new("a.jpg", TimestampCell::NotFound).with_field("EG", "3"),
            WriteOrigin::Automated,
        );
        store.save().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "URL,timestamp,EG\na.jpg,NF,3\n");
    }

    #[test]
    fn test_save_empty_without_schema_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let store = ResultStore::new(&path, StoreSchema::default());

        assert!(matches!(store.save(), Err(StoreError::SchemaInference)));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_empty_with_loaded_header_writes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("header-only.csv");
        fs::write(&path, "URL,timestamp,EG\n").unwrap();

        let store = ResultStore::load(&path, StoreSchema::default()).unwrap();
        store.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "URL,timestamp,EG\n");
    }

    #[test]
    fn test_load_or_seed_prefers_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        fs::write(&input, "URL,timestamp\na.jpg,\n").unwrap();

        let seeded = ResultStore::load_or_seed(&output, &input, StoreSchema::default()).unwrap();
        assert_eq!(seeded.get("a.jpg").unwrap().timestamp, TimestampCell::Empty);
        assert_eq!(seeded.path(), output.as_path());

        fs::write(&output, "URL,timestamp\na.jpg,19:00\n").unwrap();
        let resumed = ResultStore::load_or_seed(&output, &input, StoreSchema::default()).unwrap();
        assert_eq!(resumed.get("a.jpg").unwrap().timestamp, resolved("19:00"));
    }

    #[test]
    fn test_pending_urls_skip_resolved() {
        let dir = tempdir().unwrap();
        let store = sample_store(dir.path());

        assert_eq!(
            store.pending_urls(),
            vec![
                "https://example.org/img/b.jpg".to_string(),
                "https://example.org/img/c,1.jpg".to_string()
            ]
        );
    }
}
