//! One row of the result set.

/// The state of a record's timestamp cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampCell {
    /// A time found by OCR or any text committed by a human
    Resolved(String),
    /// Extraction was attempted and failed (written as the sentinel)
    NotFound,
    /// No attempt recorded yet (empty cell or missing column)
    Empty,
}

impl TimestampCell {
    /// Interprets a raw CSV cell, given the configured sentinel.
    pub fn from_cell(raw: &str, sentinel: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == sentinel {
            TimestampCell::NotFound
        } else if trimmed.is_empty() {
            TimestampCell::Empty
        } else {
            TimestampCell::Resolved(raw.to_string())
        }
    }

    /// Renders the cell for writing back to CSV.
    pub fn to_cell(&self, sentinel: &str) -> String {
        match self {
            TimestampCell::Resolved(text) => text.clone(),
            TimestampCell::NotFound => sentinel.to_string(),
            TimestampCell::Empty => String::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TimestampCell::Resolved(_))
    }
}

/// A result row keyed by its source URL.
///
/// Columns other than the URL and timestamp are carried through untouched,
/// in the order they were read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub url: String,
    pub timestamp: TimestampCell,
    pub fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(url: impl Into<String>, timestamp: TimestampCell) -> Self {
        Self {
            url: url.into(),
            timestamp,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Value of a carried column, if the record has it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_resolved(&self) -> bool {
        self.timestamp.is_resolved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parsing() {
        assert_eq!(TimestampCell::from_cell("NF", "NF"), TimestampCell::NotFound);
        assert_eq!(TimestampCell::from_cell(" NF ", "NF"), TimestampCell::NotFound);
        assert_eq!(TimestampCell::from_cell("", "NF"), TimestampCell::Empty);
        assert_eq!(
            TimestampCell::from_cell("19:05", "NF"),
            TimestampCell::Resolved("19:05".to_string())
        );
    }

    #[test]
    fn test_sentinel_is_distinct_from_empty() {
        assert_ne!(TimestampCell::NotFound.to_cell("NF"), TimestampCell::Empty.to_cell("NF"));
        assert!(!TimestampCell::NotFound.is_resolved());
        assert!(!TimestampCell::Empty.is_resolved());
    }

    #[test]
    fn test_field_lookup() {
        let record = Record::new("a.jpg", TimestampCell::Empty)
            .with_field("EG", "120")
            .with_field("NM", "98");

        assert_eq!(record.field("NM"), Some("98"));
        assert_eq!(record.field("XX"), None);
    }
}
