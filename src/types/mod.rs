//! Data types for the feedback ledger
//!
//! This module contains all the core data structures used throughout the
//! engine: the immutable rating event, the derived aggregate records, and
//! the query envelope.

mod aggregate;
mod event;
mod query;

pub use aggregate::{
    CategoryCounts, CounterState, DailyAggregate, OverallAggregate, PeriodAggregate,
    RebuildReport,
};
pub use event::{RatingEvent, Satisfaction};
pub use query::{EventFilter, EventPage};
