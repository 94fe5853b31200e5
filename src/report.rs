// src/report.rs

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Earliest and latest coverage day seen, as `YYYY-MM-DD`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl DateRange {
    /// Fold a canonical day string into the range. Zero-padded big-endian
    /// day strings order the same lexicographically and chronologically.
    pub fn observe(&mut self, day: &str) {
        if self.min.as_deref().map_or(true, |min| day < min) {
            self.min = Some(day.to_string());
        }
        if self.max.as_deref().map_or(true, |max| day > max) {
            self.max = Some(day.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => write!(f, "{} to {}", min, max),
            _ => f.write_str("none"),
        }
    }
}

/// Counters for one run, filled in stage by stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_in_source: usize,
    pub duplicate_count: usize,
    pub new_count: usize,
    pub inserted_count: usize,
    pub failed_count: usize,
    pub date_range: DateRange,
}

impl RunStats {
    /// Inserted share of attempted uploads, in percent.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.inserted_count + self.failed_count;
        if attempted == 0 {
            0.0
        } else {
            self.inserted_count as f64 / attempted as f64 * 100.0
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.inserted_count > 0 {
            Outcome::Imported
        } else if self.new_count == 0 {
            Outcome::NoNewRecords
        } else {
            Outcome::Failed
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Imported,
    NoNewRecords,
    Failed,
}

impl Outcome {
    pub fn headline(&self) -> &str {
        match self {
            Outcome::Imported => "✅ Coverage import succeeded",
            Outcome::NoNewRecords => "ℹ️ Coverage import: nothing new",
            Outcome::Failed => "❌ Coverage import failed",
        }
    }
}

/// Read-only view of a finished run, handed to the notifier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_in_source: usize,
    pub duplicate_count: usize,
    pub new_count: usize,
    pub inserted_count: usize,
    pub failed_count: usize,
    pub success_rate: f64,
    pub date_range: String,
    pub elapsed_secs: f64,
    pub outcome: Outcome,
}

/// Pure aggregation of the run counters.
pub fn summarize(stats: &RunStats, elapsed: Duration) -> RunSummary {
    RunSummary {
        total_in_source: stats.total_in_source,
        duplicate_count: stats.duplicate_count,
        new_count: stats.new_count,
        inserted_count: stats.inserted_count,
        failed_count: stats.failed_count,
        success_rate: stats.success_rate(),
        date_range: stats.date_range.to_string(),
        elapsed_secs: elapsed.as_secs_f64(),
        outcome: stats.outcome(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_tracks_extremes() {
        let mut range = DateRange::default();
        assert!(range.is_empty());
        assert_eq!(range.to_string(), "none");

        for day in ["2025-03-14", "2024-12-31", "2025-01-09", "2025-03-15"] {
            range.observe(day);
        }
        assert_eq!(range.min.as_deref(), Some("2024-12-31"));
        assert_eq!(range.max.as_deref(), Some("2025-03-15"));
        assert_eq!(range.to_string(), "2024-12-31 to 2025-03-15");
    }

    #[test]
    fn success_rate_guards_zero_denominator() {
        let stats = RunStats::default();
        assert_eq!(stats.success_rate(), 0.0);

        let stats = RunStats {
            new_count: 20,
            inserted_count: 15,
            failed_count: 5,
            ..Default::default()
        };
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn outcome_follows_counts() {
        let nothing = RunStats::default();
        assert_eq!(nothing.outcome(), Outcome::NoNewRecords);

        let all_failed = RunStats {
            new_count: 4,
            failed_count: 4,
            ..Default::default()
        };
        assert_eq!(all_failed.outcome(), Outcome::Failed);
        assert_eq!(all_failed.success_rate(), 0.0);

        let some = RunStats {
            new_count: 4,
            inserted_count: 1,
            failed_count: 3,
            ..Default::default()
        };
        assert_eq!(some.outcome(), Outcome::Imported);
    }

    #[test]
    fn summary_copies_counts() {
        let mut stats = RunStats {
            total_in_source: 10,
            duplicate_count: 4,
            new_count: 6,
            inserted_count: 6,
            ..Default::default()
        };
        stats.date_range.observe("2025-02-01");

        let summary = summarize(&stats, Duration::from_millis(2500));
        assert_eq!(summary.total_in_source, 10);
        assert_eq!(summary.success_rate, 100.0);
        assert_eq!(summary.date_range, "2025-02-01 to 2025-02-01");
        assert_eq!(summary.elapsed_secs, 2.5);
        assert_eq!(summary.outcome, Outcome::Imported);
    }
}
