//! Aggregation engine
//!
//! The orchestrator behind the public operations: event ingestion, ledger
//! reads, event-log queries, and the rebuild procedure. It owns the
//! transaction boundary: a write's id reservation, event append, and
//! ledger increments execute as one atomic commit against the backing
//! store, so readers only ever see fully committed writes.

mod counter;
mod ledger;
mod query;
mod rebuild;
mod write;

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::config::{EngineConfig, StorageMode};
use crate::error::LedgerResult;
use crate::store::{
    run_transaction, DocumentStore, FileStore, MemoryStore, StoreResult, Transaction,
};
use crate::types::{
    DailyAggregate, EventFilter, EventPage, OverallAggregate, PeriodAggregate, RatingEvent,
    RebuildReport,
};

/// Orchestrator over a backing document store
///
/// The store handle is an explicit constructor argument, not ambient
/// state; independent engines (and processes) may share one store.
pub struct AggregationEngine {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) config: EngineConfig,
}

impl AggregationEngine {
    /// Create an engine over an already-opened store
    pub fn new(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Engine over a fresh in-process store
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Open the storage strategy selected by `mode` and build an engine on it
    pub fn open(mode: StorageMode, config: EngineConfig) -> LedgerResult<Self> {
        match mode {
            StorageMode::Memory => Ok(Self::in_memory(config)),
            StorageMode::File(dir) => Ok(Self::new(Arc::new(FileStore::open(dir)?), config)),
        }
    }

    /// Handle to the backing store
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a body inside an optimistic transaction with the configured
    /// retry budget
    pub(crate) fn run_txn<T, F>(&self, body: F) -> LedgerResult<T>
    where
        F: FnMut(&mut Transaction<'_>) -> StoreResult<T>,
    {
        Ok(run_transaction(
            self.store.as_ref(),
            self.config.txn_max_attempts,
            body,
        )?)
    }
}

// Public operations, delegated to the focused submodules.
impl AggregationEngine {
    /// Ingest one rating event
    ///
    /// Fails with `InvalidCategory` before touching any state when the
    /// category is not one of the fixed three. On success the returned
    /// event carries its allocated id.
    pub fn create_event(
        &self,
        category: &str,
        occurred_at: NaiveDateTime,
    ) -> LedgerResult<RatingEvent> {
        write::create_event(self, category, occurred_at)
    }

    /// Ingest one rating event timestamped now (local time)
    pub fn record_now(&self, category: &str) -> LedgerResult<RatingEvent> {
        write::create_event(self, category, Local::now().naive_local())
    }

    /// Exact-id lookup in the event store
    pub fn get_event(&self, id: u64) -> LedgerResult<RatingEvent> {
        query::get_event(self, id)
    }

    /// Read the overall aggregate (staleness policy applies when missing)
    pub fn get_overall_aggregate(&self) -> LedgerResult<OverallAggregate> {
        ledger::get_overall(self)
    }

    /// Read one day's aggregate; a day with no events reads as zeros
    pub fn get_daily_aggregate(&self, date: NaiveDate) -> LedgerResult<DailyAggregate> {
        ledger::get_daily(self, date)
    }

    /// Sum the daily aggregates over an inclusive date range
    ///
    /// Two calls over different ranges give a period comparison.
    pub fn get_period_aggregate(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LedgerResult<PeriodAggregate> {
        ledger::get_period(self, from, to)
    }

    /// Dates that have a daily record, newest first
    pub fn list_dates(&self) -> LedgerResult<Vec<NaiveDate>> {
        ledger::list_dates(self)
    }

    /// Query the event log with filters, pagination and the default
    /// (date desc, time desc, id desc) order
    pub fn query_events(
        &self,
        filter: EventFilter,
        page: usize,
        page_size: usize,
    ) -> LedgerResult<EventPage> {
        query::query_events(self, filter, page, page_size)
    }

    /// Recompute the counter and the whole ledger from the event log
    ///
    /// Administrative operation, not on the hot write path; see the module
    /// docs in `rebuild` for the consistency caveat against concurrent
    /// writers.
    pub fn rebuild_aggregates(&self, max_events: Option<u64>) -> LedgerResult<RebuildReport> {
        rebuild::rebuild_aggregates(self, max_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::types::Satisfaction;

    fn engine() -> AggregationEngine {
        AggregationEngine::in_memory(EngineConfig::default())
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        format!("{}T{}", date, time).parse().unwrap()
    }

    #[test]
    fn test_create_event_assigns_sequential_ids() {
        let engine = engine();
        let a = engine.create_event("high", at("2025-03-14", "10:00:00")).unwrap();
        let b = engine.create_event("low", at("2025-03-14", "10:05:00")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.category, Satisfaction::High);
        assert_eq!(a.weekday, "Friday");
    }

    #[test]
    fn test_invalid_category_is_rejected() {
        let engine = engine();
        let result = engine.create_event("unknown", at("2025-03-14", "10:00:00"));
        assert!(matches!(result, Err(LedgerError::InvalidCategory(_))));
    }

    #[test]
    fn test_overall_unavailable_without_writes() {
        let engine = engine();
        assert!(matches!(
            engine.get_overall_aggregate(),
            Err(LedgerError::AggregateUnavailable)
        ));
    }

    #[test]
    fn test_get_event_not_found() {
        let engine = engine();
        assert!(matches!(engine.get_event(99), Err(LedgerError::NotFound(99))));
    }

    #[test]
    fn test_query_pagination_envelope() {
        let engine = engine();
        for i in 0..5 {
            engine
                .create_event("mid", at("2025-03-14", &format!("10:00:0{}", i)))
                .unwrap();
        }

        let page = engine.query_events(EventFilter::default(), 2, 2).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        // Third and fourth newest: times 10:00:02 and 10:00:01.
        assert_eq!(page.items[0].id, 3);
        assert_eq!(page.items[1].id, 2);
    }

    #[test]
    fn test_query_by_id_fast_path() {
        let engine = engine();
        let event = engine.create_event("high", at("2025-03-14", "10:00:00")).unwrap();

        let page = engine
            .query_events(EventFilter::by_id(event.id), 1, 50)
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0], event);

        let miss = engine.query_events(EventFilter::by_id(999), 1, 50).unwrap();
        assert_eq!(miss.total, 0);
        assert!(miss.items.is_empty());
    }

    #[test]
    fn test_daily_zero_is_not_stale() {
        let engine = engine();
        engine.create_event("high", at("2025-03-14", "10:00:00")).unwrap();

        // Ledger exists, this date has no events: a valid zero.
        let day = engine.get_daily_aggregate("2025-01-01".parse().unwrap()).unwrap();
        assert_eq!(day.total, 0);
        assert_eq!(day.last_id, None);
    }
}
