//! Feedback Ledger
//!
//! An append-only rating-event store with incrementally maintained
//! aggregates, built on an optimistic-transaction document store with
//! pluggable in-memory and on-disk backends.
//!
//! # Features
//!
//! - **Atomic ingestion**: id reservation, event append, and aggregate
//!   increments commit as one transaction
//! - **Race-free ids**: a singleton counter record hands out sequential
//!   ids under optimistic concurrency
//! - **Derived ledger**: overall and per-day rollups maintained on every
//!   write, rebuildable from the event log at any time
//! - **Pluggable storage**: in-memory or atomic-file persistence, chosen
//!   once at startup
//!
//! # Modules
//!
//! - `types`: Core data structures (RatingEvent, aggregates, query envelope)
//! - `store`: Document store abstraction, transactions, and both backends
//! - `engine`: The aggregation engine and its public operations
//! - `config`: Engine configuration and storage mode selection
//! - `error`: The engine-level error taxonomy
//! - `utils`: Utility functions (timestamps, atomic file writes)
//!
//! # Example
//!
//! ```no_run
//! use feedback_ledger::{AggregationEngine, EngineConfig, StorageMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AggregationEngine::open(StorageMode::from_env(), EngineConfig::from_env())?;
//!     let event = engine.record_now("high")?;
//!     println!("recorded event {} on {}", event.id, event.date);
//!     let overall = engine.get_overall_aggregate()?;
//!     println!("{} events so far", overall.total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{EngineConfig, StorageMode};
pub use engine::AggregationEngine;
pub use error::{LedgerError, LedgerResult};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};
pub use types::{
    CategoryCounts, DailyAggregate, EventFilter, EventPage, OverallAggregate, PeriodAggregate,
    RatingEvent, RebuildReport, Satisfaction,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
