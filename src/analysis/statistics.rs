//! Timeline statistics for tally reports.
//!
//! Calculates running vote totals, fixed-interval buckets, and the distribution of
//! report times.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

use super::csv_reader::VoteTable;
use super::normalize::anchor_date;

/// Default bucket width in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 10;

/// Running totals after one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub time: NaiveDateTime,
    /// Totals per candidate, including this report
    pub totals: Vec<u64>,
}

/// Reports that fell into one fixed-width time interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalBucket {
    /// Interval start (floored)
    pub start: NaiveDateTime,
    /// Votes per candidate reported in this interval
    pub sums: Vec<u64>,
    /// Sum over all candidates
    pub total: u64,
    /// Share per candidate, 0-100 (all zero for an empty total)
    pub percentages: Vec<f64>,
    /// First candidate minus second candidate
    pub margin: i64,
    /// Reports in this interval
    pub reports: usize,
    /// Reports up to and including this interval
    pub cumulative_reports: usize,
}

/// How report times spread over hours, minutes and seconds.
///
/// Only reports with a seconds field are counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeDistribution {
    pub by_second: BTreeMap<u32, usize>,
    pub by_minute: BTreeMap<u32, usize>,
    pub by_hour: BTreeMap<u32, usize>,
}

/// Full timeline summary for a vote table.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineReport {
    pub candidates: Vec<String>,
    pub total_reports: usize,
    /// Rows left out because their time did not parse
    pub dropped_reports: usize,
    pub interval_minutes: u32,
    pub cumulative: Vec<CumulativePoint>,
    pub buckets: Vec<IntervalBucket>,
    pub distribution: TimeDistribution,
}

impl TimelineReport {
    /// Calculate the timeline for the table using `interval_minutes`-wide buckets.
    pub fn from_table(table: &VoteTable, interval_minutes: u32) -> Self {
        let interval_minutes = interval_minutes.max(1);

        TimelineReport {
            candidates: table.candidates.clone(),
            total_reports: table.len(),
            dropped_reports: table.dropped,
            interval_minutes,
            cumulative: cumulative_series(table),
            buckets: interval_buckets(table, interval_minutes),
            distribution: time_distribution(table),
        }
    }
}

/// Running per-candidate totals at each report, in time order.
pub fn cumulative_series(table: &VoteTable) -> Vec<CumulativePoint> {
    let mut totals = vec![0u64; table.candidates.len()];

    table
        .reports
        .iter()
        .map(|report| {
            for (total, votes) in totals.iter_mut().zip(&report.votes) {
                *total += votes;
            }
            CumulativePoint {
                time: report.time,
                totals: totals.clone(),
            }
        })
        .collect()
}

/// Floors `time` to a multiple of `minutes` counted from midnight of the anchor day.
fn floor_to_interval(time: NaiveDateTime, minutes: u32) -> NaiveDateTime {
    let origin = anchor_date().and_time(NaiveTime::MIN);
    let width = i64::from(minutes) * 60;
    let offset = (time - origin).num_seconds();
    origin + Duration::seconds(offset.div_euclid(width) * width)
}

/// Groups reports into fixed-width intervals. Empty intervals are omitted.
pub fn interval_buckets(table: &VoteTable, interval_minutes: u32) -> Vec<IntervalBucket> {
    let n = table.candidates.len();
    let mut grouped: BTreeMap<NaiveDateTime, (Vec<u64>, usize)> = BTreeMap::new();

    for report in &table.reports {
        let start = floor_to_interval(report.time, interval_minutes);
        let entry = grouped.entry(start).or_insert_with(|| (vec![0; n], 0));
        for (sum, votes) in entry.0.iter_mut().zip(&report.votes) {
            *sum += votes;
        }
        entry.1 += 1;
    }

    let mut cumulative_reports = 0;
    grouped
        .into_iter()
        .map(|(start, (sums, reports))| {
            cumulative_reports += reports;
            let total: u64 = sums.iter().sum();
            let percentages = sums
                .iter()
                .map(|&s| if total > 0 { s as f64 / total as f64 * 100.0 } else { 0.0 })
                .collect();
            let first = sums.first().copied().unwrap_or(0) as i64;
            let second = sums.get(1).copied().unwrap_or(0) as i64;

            IntervalBucket {
                start,
                sums,
                total,
                percentages,
                margin: first - second,
                reports,
                cumulative_reports,
            }
        })
        .collect()
}

/// Counts reports per second-of-minute, minute and hour.
pub fn time_distribution(table: &VoteTable) -> TimeDistribution {
    let mut dist = TimeDistribution::default();

    for report in table.reports.iter().filter(|r| r.has_seconds()) {
        *dist.by_second.entry(report.time.second()).or_insert(0) += 1;
        *dist.by_minute.entry(report.time.minute()).or_insert(0) += 1;
        *dist.by_hour.entry(report.time.hour()).or_insert(0) += 1;
    }

    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::csv_reader::Report;
    use crate::analysis::normalize::normalize_time;

    fn table(rows: &[(&str, u64, u64)]) -> VoteTable {
        let mut reports: Vec<Report> = rows
            .iter()
            .map(|&(t, a, b)| Report {
                raw_time: t.to_string(),
                time: normalize_time(t).unwrap(),
                votes: vec![a, b],
            })
            .collect();
        reports.sort_by_key(|r| r.time);
        VoteTable {
            candidates: vec!["EG".to_string(), "MM".to_string()],
            reports,
            dropped: 0,
        }
    }

    #[test]
    fn test_cumulative_series() {
        let t = table(&[("19:00", 10, 5), ("19:03", 2, 8), ("00:30", 1, 1)]);
        let series = cumulative_series(&t);

        let totals: Vec<Vec<u64>> = series.iter().map(|p| p.totals.clone()).collect();
        assert_eq!(totals, vec![vec![10, 5], vec![12, 13], vec![13, 14]]);
    }

    #[test]
    fn test_interval_buckets() {
        let t = table(&[
            ("19:01", 10, 5),
            ("19:09:59", 2, 8),
            ("19:10", 4, 0),
            ("00:05", 0, 0),
        ]);
        let buckets = interval_buckets(&t, 10);

        assert_eq!(buckets.len(), 3);

        assert_eq!(buckets[0].start, normalize_time("19:00").unwrap());
        assert_eq!(buckets[0].sums, vec![12, 13]);
        assert_eq!(buckets[0].total, 25);
        assert_eq!(buckets[0].margin, -1);
        assert_eq!(buckets[0].reports, 2);
        assert!((buckets[0].percentages[0] - 48.0).abs() < 1e-9);

        assert_eq!(buckets[1].start, normalize_time("19:10").unwrap());
        assert_eq!(buckets[1].cumulative_reports, 3);
        assert_eq!(buckets[1].percentages, vec![100.0, 0.0]);

        // Past midnight lands on the next day
        assert_eq!(buckets[2].start, normalize_time("00:00").unwrap());
        assert_eq!(buckets[2].percentages, vec![0.0, 0.0]);
        assert_eq!(buckets[2].cumulative_reports, 4);
    }

    #[test]
    fn test_fifteen_minute_buckets() {
        let t = table(&[("19:14", 1, 0), ("19:15", 1, 0), ("19:44:59", 1, 0)]);
        let starts: Vec<NaiveDateTime> =
            interval_buckets(&t, 15).into_iter().map(|b| b.start).collect();
        assert_eq!(
            starts,
            vec![
                normalize_time("19:00").unwrap(),
                normalize_time("19:15").unwrap(),
                normalize_time("19:30").unwrap(),
            ]
        );
    }

    #[test]
    fn test_distribution_counts_only_seconds_rows() {
        let t = table(&[("19:00:05", 0, 0), ("19:30:05", 0, 0), ("20:00", 0, 0)]);
        let dist = time_distribution(&t);

        assert_eq!(dist.by_second.get(&5), Some(&2));
        assert_eq!(dist.by_hour.get(&19), Some(&2));
        assert_eq!(dist.by_hour.get(&20), None);
        assert_eq!(dist.by_minute.len(), 2);
    }

    #[test]
    fn test_report_from_table() {
        let t = table(&[("19:00", 1, 2)]);
        let report = TimelineReport::from_table(&t, 0);
        assert_eq!(report.interval_minutes, 1);
        assert_eq!(report.total_reports, 1);
        assert_eq!(report.buckets.len(), 1);
    }
}
