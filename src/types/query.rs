//! Query filter and page envelope for event-log reads

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::event::{RatingEvent, Satisfaction};

/// Filters for `query_events`
///
/// All fields are optional and combine with AND. An `id` filter takes the
/// exact-lookup fast path and bypasses the scan entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EventFilter {
    pub id: Option<u64>,
    pub category: Option<Satisfaction>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl EventFilter {
    /// Filter matching a single event id
    pub fn by_id(id: u64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Whether an event passes the category and date-range filters
    pub fn matches(&self, event: &RatingEvent) -> bool {
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if event.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if event.date > to {
                return false;
            }
        }
        true
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPage {
    /// Matching events across all pages
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Events on this page, ordered by (date desc, time desc, id desc)
    pub items: Vec<RatingEvent>,
}

impl EventPage {
    /// Empty result set
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            total: 0,
            page,
            page_size,
            total_pages: 0,
            items: Vec::new(),
        }
    }
}
