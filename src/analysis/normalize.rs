//! Clock-time normalization for tally reports.
//!
//! Reports span one evening into the following early morning. Times are anchored
//! to 1900-01-01 and anything before 18:00 is pushed to the next day so the whole
//! night sorts correctly.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

/// Reading known to be wrong on the source sheets, with its replacement.
const KNOWN_BAD: (&str, &str) = ("15:05:58", "19:26:00");

/// Reports at or after this hour belong to the anchor day.
pub const ROLLOVER_HOUR: u32 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unparseable time: '{0}'")]
pub struct TimeParseError(pub String);

/// Day every normalized time is anchored to.
pub fn anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
}

/// Parses `HH:MM` or `HH:MM:SS` into an anchored datetime with next-day rollover.
pub fn normalize_time(raw: &str) -> Result<NaiveDateTime, TimeParseError> {
    let trimmed = raw.trim();
    let text = if trimmed == KNOWN_BAD.0 { KNOWN_BAD.1 } else { trimmed };

    let time = NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|_| TimeParseError(raw.to_string()))?;

    // chrono reads `:60` as a leap second
    if time.nanosecond() >= 1_000_000_000 {
        return Err(TimeParseError(raw.to_string()));
    }

    let mut adjusted = anchor_date().and_time(time);
    if time.hour() < ROLLOVER_HOUR {
        adjusted += Duration::days(1);
    }
    Ok(adjusted)
}

/// Whether the raw text carries a seconds field.
pub fn has_seconds(raw: &str) -> bool {
    raw.trim().split(':').count() == 3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1900, 1, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_evening_stays_on_anchor_day() {
        assert_eq!(normalize_time("19:30").unwrap(), at(1, 19, 30, 0));
        assert_eq!(normalize_time("18:00:00").unwrap(), at(1, 18, 0, 0));
        assert_eq!(normalize_time("23:59:59").unwrap(), at(1, 23, 59, 59));
    }

    #[test]
    fn test_early_hours_roll_over() {
        assert_eq!(normalize_time("00:15").unwrap(), at(2, 0, 15, 0));
        assert_eq!(normalize_time("17:59:59").unwrap(), at(2, 17, 59, 59));
    }

    #[test]
    fn test_known_bad_reading_is_replaced() {
        assert_eq!(normalize_time("15:05:58").unwrap(), at(1, 19, 26, 0));
        assert_eq!(normalize_time(" 15:05:58 ").unwrap(), at(1, 19, 26, 0));
    }

    #[test]
    fn test_unparseable() {
        for raw in ["NF", "", "25:00", "7 pm", "19:61", "19:05:60", "01:59:60"] {
            assert_eq!(
                normalize_time(raw),
                Err(TimeParseError(raw.to_string())),
                "input {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_has_seconds() {
        assert!(has_seconds("19:00:01"));
        assert!(!has_seconds("19:00"));
    }
}
