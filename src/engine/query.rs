//! Event-log queries
//!
//! Reads go straight to the event store, never the ledger. An exact-id
//! filter takes the point-lookup fast path; everything else is a lazy scan
//! with in-memory filtering, the default (date desc, time desc, id desc)
//! order, and page slicing.

use crate::error::{LedgerError, LedgerResult};
use crate::store::{event_key, StoreError, EVENTS};
use crate::types::{EventFilter, EventPage, RatingEvent};

use super::AggregationEngine;

/// Exact-document lookup by event id
pub(super) fn get_event(engine: &AggregationEngine, id: u64) -> LedgerResult<RatingEvent> {
    match engine.store.get(EVENTS, &event_key(id))? {
        Some(doc) => Ok(RatingEvent::from_value(doc.value).map_err(StoreError::from)?),
        None => Err(LedgerError::NotFound(id)),
    }
}

pub(super) fn query_events(
    engine: &AggregationEngine,
    filter: EventFilter,
    page: usize,
    page_size: usize,
) -> LedgerResult<EventPage> {
    let page = page.max(1);
    let page_size = page_size.max(1);

    // Fast path: exact id, no scan. A miss is an empty page, not an error.
    if let Some(id) = filter.id {
        return match get_event(engine, id) {
            Ok(event) if filter.matches(&event) => Ok(EventPage {
                total: 1,
                page,
                page_size,
                total_pages: 1,
                items: vec![event],
            }),
            Ok(_) => Ok(EventPage::empty(page, page_size)),
            Err(LedgerError::NotFound(_)) => Ok(EventPage::empty(page, page_size)),
            Err(e) => Err(e),
        };
    }

    let mut rows = Vec::new();
    for item in engine.store.scan(EVENTS)? {
        let doc = item?;
        match RatingEvent::from_value(doc.value) {
            Ok(event) => {
                if filter.matches(&event) {
                    rows.push(event);
                }
            }
            Err(e) => {
                eprintln!("Warning: skipping unparseable event document {}: {}", doc.key, e);
            }
        }
    }

    rows.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.time.cmp(&a.time))
            .then_with(|| b.id.cmp(&a.id))
    });

    let total = rows.len();
    let total_pages = (total + page_size - 1) / page_size;
    let offset = (page - 1) * page_size;
    let items = rows.into_iter().skip(offset).take(page_size).collect();

    Ok(EventPage {
        total,
        page,
        page_size,
        total_pages,
        items,
    })
}
