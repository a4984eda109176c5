//! Event ingestion
//!
//! One write = one transaction: reserve the id, persist the event, fold it
//! into the ledger. Either all three effects commit or none of them are
//! ever visible to readers.

use chrono::{Local, NaiveDateTime};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{event_key, COUNTERS_DOC, EVENTS, META};
use crate::types::{RatingEvent, Satisfaction};

use super::{counter, ledger, AggregationEngine};

pub(super) fn create_event(
    engine: &AggregationEngine,
    category: &str,
    occurred_at: NaiveDateTime,
) -> LedgerResult<RatingEvent> {
    let category = Satisfaction::parse(category)
        .ok_or_else(|| LedgerError::InvalidCategory(category.to_string()))?;

    // The scan-based allocator seed is only computed when the counter
    // record is missing; with the record in place the stored value wins
    // inside the transaction. Should the record vanish between this peek
    // and the transactional read, the allocator re-resolves from the log.
    let fallback = match engine.store.get(META, COUNTERS_DOC)? {
        Some(_) => None,
        None => Some(counter::resolve_initial_next_id(engine.store.as_ref())?),
    };

    let created_at = Local::now();
    engine.run_txn(|tx| {
        let id = counter::reserve_next_id(tx, engine.store.as_ref(), fallback)?;
        let event = RatingEvent::new(id, category, occurred_at, created_at);
        tx.set(EVENTS, &event_key(id), event.to_value()?);
        ledger::apply_increment(tx, &event)?;
        Ok(event)
    })
}
