//! Materialized aggregate records
//!
//! The ledger keeps one overall summary and one summary per calendar day,
//! both incrementally maintained on every write and wholesale-replaced by a
//! rebuild. They are a cache over the event log, never a second source of
//! truth.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::event::{RatingEvent, Satisfaction};

/// Per-category event counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    #[serde(default)]
    pub low: u64,
    #[serde(default)]
    pub mid: u64,
    #[serde(default)]
    pub high: u64,
}

impl CategoryCounts {
    /// Increment the counter for one category
    pub fn increment(&mut self, category: Satisfaction) {
        match category {
            Satisfaction::Low => self.low += 1,
            Satisfaction::Mid => self.mid += 1,
            Satisfaction::High => self.high += 1,
        }
    }

    /// Count for one category
    pub fn get(&self, category: Satisfaction) -> u64 {
        match category {
            Satisfaction::Low => self.low,
            Satisfaction::Mid => self.mid,
            Satisfaction::High => self.high,
        }
    }

    /// Sum across all categories
    pub fn sum(&self) -> u64 {
        self.low + self.mid + self.high
    }

    /// Add another set of counts into this one
    pub fn merge(&mut self, other: CategoryCounts) {
        self.low += other.low;
        self.mid += other.mid;
        self.high += other.high;
    }
}

/// Singleton summary of the whole event log (document `meta/overall`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAggregate {
    pub total: u64,

    #[serde(flatten)]
    pub counts: CategoryCounts,

    /// Highest event id folded into this record
    #[serde(rename = "lastId")]
    pub last_id: Option<u64>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Local>,
}

impl OverallAggregate {
    /// Fresh record with nothing folded in
    pub fn empty() -> Self {
        Self {
            total: 0,
            counts: CategoryCounts::default(),
            last_id: None,
            updated_at: Local::now(),
        }
    }

    /// Fold one event into the summary
    pub fn apply(&mut self, event: &RatingEvent) {
        self.total += 1;
        self.counts.increment(event.category);
        self.last_id = Some(self.last_id.map_or(event.id, |last| last.max(event.id)));
        self.updated_at = Local::now();
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Per-day summary (one document per date in the `daily` collection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,

    pub total: u64,

    #[serde(flatten)]
    pub counts: CategoryCounts,

    #[serde(rename = "lastId")]
    pub last_id: Option<u64>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Local>,
}

impl DailyAggregate {
    /// Fresh record for a date with no events folded in
    ///
    /// Also what a read of a never-written date returns: a day with zero
    /// events is a valid state, distinct from the ledger being missing.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total: 0,
            counts: CategoryCounts::default(),
            last_id: None,
            updated_at: Local::now(),
        }
    }

    /// Fold one event into the summary; the event must carry this date
    pub fn apply(&mut self, event: &RatingEvent) {
        self.total += 1;
        self.counts.increment(event.category);
        self.last_id = Some(self.last_id.map_or(event.id, |last| last.max(event.id)));
        self.updated_at = Local::now();
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Singleton id-allocator record (document `meta/counters`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterState {
    /// Smallest id guaranteed not yet used; never decreases
    #[serde(rename = "nextId")]
    pub next_id: u64,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Local>,
}

impl CounterState {
    pub fn new(next_id: u64) -> Self {
        Self {
            next_id,
            updated_at: Local::now(),
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Outcome of a rebuild pass over the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    /// Documents scanned (including any skipped as unparseable)
    pub scanned: u64,
    /// Events counted into the rebuilt overall aggregate
    pub total: u64,
    /// Highest event id observed
    #[serde(rename = "lastId")]
    pub last_id: Option<u64>,
    /// Distinct dates that received a daily record
    pub distinct_dates: usize,
    /// Counter value after the rebuild (never below its previous value)
    #[serde(rename = "nextId")]
    pub next_id: u64,
}

/// Sum of the daily records over an inclusive date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodAggregate {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: u64,
    #[serde(flatten)]
    pub counts: CategoryCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn event(id: u64, category: Satisfaction) -> RatingEvent {
        let occurred = "2025-03-14T10:00:00".parse::<NaiveDateTime>().unwrap();
        RatingEvent::new(id, category, occurred, Local::now())
    }

    #[test]
    fn test_overall_apply_counts_by_category() {
        let mut overall = OverallAggregate::empty();
        overall.apply(&event(1, Satisfaction::High));
        overall.apply(&event(2, Satisfaction::Mid));
        overall.apply(&event(3, Satisfaction::High));

        assert_eq!(overall.total, 3);
        assert_eq!(overall.counts.high, 2);
        assert_eq!(overall.counts.mid, 1);
        assert_eq!(overall.counts.low, 0);
        assert_eq!(overall.last_id, Some(3));
    }

    #[test]
    fn test_last_id_never_regresses() {
        let mut overall = OverallAggregate::empty();
        overall.apply(&event(9, Satisfaction::Low));
        overall.apply(&event(4, Satisfaction::Low));
        assert_eq!(overall.last_id, Some(9));
    }

    #[test]
    fn test_overall_wire_format_flattens_counts() {
        let mut overall = OverallAggregate::empty();
        overall.apply(&event(1, Satisfaction::Low));

        let value = overall.to_value().unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["low"], 1);
        assert_eq!(value["lastId"], 1);

        let parsed = OverallAggregate::from_value(value).unwrap();
        assert_eq!(parsed.counts.low, 1);
    }

    #[test]
    fn test_daily_empty_is_all_zeros() {
        let day = DailyAggregate::empty("2025-03-14".parse().unwrap());
        assert_eq!(day.total, 0);
        assert_eq!(day.counts.sum(), 0);
        assert_eq!(day.last_id, None);
    }

    #[test]
    fn test_counts_missing_fields_default_to_zero() {
        // Older documents may omit zero-valued categories
        let value = serde_json::json!({
            "date": "2025-03-14",
            "total": 2,
            "high": 2,
            "updatedAt": Local::now().to_rfc3339(),
        });
        let day = DailyAggregate::from_value(value).unwrap();
        assert_eq!(day.counts.high, 2);
        assert_eq!(day.counts.low, 0);
        assert_eq!(day.last_id, None);
    }
}
