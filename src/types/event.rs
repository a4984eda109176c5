//! Rating event types
//!
//! A rating event is the immutable unit of the append-only event log.
//! Everything else the engine stores (overall and per-day aggregates, the
//! id counter) is derived state that can be rebuilt from these records.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::utils::time::{split_timestamp, weekday_label};

/// Satisfaction level of a rating event
///
/// A fixed, closed set of three values. Anything else is rejected with
/// `InvalidCategory` before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Satisfaction {
    Low,
    Mid,
    High,
}

impl Satisfaction {
    /// All categories, in ascending satisfaction order
    pub const ALL: [Satisfaction; 3] = [Satisfaction::Low, Satisfaction::Mid, Satisfaction::High];

    /// Parse a category from its wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Satisfaction::Low),
            "mid" => Some(Satisfaction::Mid),
            "high" => Some(Satisfaction::High),
            _ => None,
        }
    }

    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Satisfaction::Low => "low",
            Satisfaction::Mid => "mid",
            Satisfaction::High => "high",
        }
    }
}

impl std::fmt::Display for Satisfaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable rating event
///
/// Created exactly once by the aggregation engine inside the write
/// transaction; never mutated, never deleted. `id` is unique and assigned in
/// monotonically non-decreasing order (gaps are allowed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEvent {
    /// Sequential id reserved by the counter allocator
    pub id: u64,

    /// Satisfaction level
    pub category: Satisfaction,

    /// Calendar date at ingestion (local time)
    pub date: NaiveDate,

    /// Time of day at ingestion, whole seconds
    pub time: NaiveTime,

    /// Weekday label derived from `date`
    pub weekday: String,

    /// Server-assigned ingestion instant
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Local>,
}

impl RatingEvent {
    /// Build an event from a reserved id and an ingestion timestamp
    pub fn new(
        id: u64,
        category: Satisfaction,
        occurred_at: NaiveDateTime,
        created_at: DateTime<Local>,
    ) -> Self {
        let (date, time) = split_timestamp(occurred_at);
        Self {
            id,
            category,
            date,
            time,
            weekday: weekday_label(date).to_string(),
            created_at,
        }
    }

    /// Serialize into a store document
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserialize from a store document
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
