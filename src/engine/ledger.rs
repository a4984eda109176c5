//! Aggregate ledger
//!
//! Incremental maintenance of the overall and per-day summary records, and
//! the reads over them. The ledger is derived state: a missing overall
//! record means the ledger is stale, and the staleness policy (auto-rebuild
//! or an explicit error) applies; zeros are never fabricated.

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::store::{StoreError, StoreResult, Transaction, DAILY, META, OVERALL_DOC};
use crate::types::{CategoryCounts, DailyAggregate, OverallAggregate, PeriodAggregate, RatingEvent};

use super::{rebuild, AggregationEngine};

/// Fold one freshly persisted event into both summary records
///
/// Must run inside the same transaction as the event write. A missing
/// record is recreated seeded from this event (the rebuild procedure is the
/// repair path for the history it misses).
pub(super) fn apply_increment(tx: &mut Transaction<'_>, event: &RatingEvent) -> StoreResult<()> {
    let mut overall = match tx.get(META, OVERALL_DOC)? {
        Some(value) => OverallAggregate::from_value(value)?,
        None => OverallAggregate::empty(),
    };
    overall.apply(event);
    tx.set(META, OVERALL_DOC, overall.to_value()?);

    let key = event.date.to_string();
    let mut daily = match tx.get(DAILY, &key)? {
        Some(value) => DailyAggregate::from_value(value)?,
        None => DailyAggregate::empty(event.date),
    };
    daily.apply(event);
    tx.set(DAILY, &key, daily.to_value()?);

    Ok(())
}

/// Read the overall aggregate, applying the staleness policy when absent
pub(super) fn get_overall(engine: &AggregationEngine) -> LedgerResult<OverallAggregate> {
    if let Some(doc) = engine.store.get(META, OVERALL_DOC)? {
        return Ok(OverallAggregate::from_value(doc.value).map_err(StoreError::from)?);
    }

    if engine.config.auto_rebuild {
        if let Err(e) = rebuild::rebuild_aggregates(engine, engine.config.rebuild_bound()) {
            eprintln!("Warning: auto-rebuild of the aggregate ledger failed: {}", e);
        }
        if let Some(doc) = engine.store.get(META, OVERALL_DOC)? {
            return Ok(OverallAggregate::from_value(doc.value).map_err(StoreError::from)?);
        }
    }

    Err(LedgerError::AggregateUnavailable)
}

/// Read one day's aggregate; a day with no events is all zeros
///
/// "No record for this date" and "no ledger at all" are different states:
/// the former is a valid zero, the latter goes through the staleness
/// policy before anything is returned.
pub(super) fn get_daily(engine: &AggregationEngine, date: NaiveDate) -> LedgerResult<DailyAggregate> {
    let key = date.to_string();

    if let Some(doc) = engine.store.get(DAILY, &key)? {
        return Ok(DailyAggregate::from_value(doc.value).map_err(StoreError::from)?);
    }

    // Date record absent: only a valid zero if the ledger itself is
    // present. This may auto-rebuild, so re-check the date afterwards.
    let _ = get_overall(engine)?;
    match engine.store.get(DAILY, &key)? {
        Some(doc) => Ok(DailyAggregate::from_value(doc.value).map_err(StoreError::from)?),
        None => Ok(DailyAggregate::empty(date)),
    }
}

/// Sum the daily records over an inclusive date range
pub(super) fn get_period(
    engine: &AggregationEngine,
    from: NaiveDate,
    to: NaiveDate,
) -> LedgerResult<PeriodAggregate> {
    let mut total = 0u64;
    let mut counts = CategoryCounts::default();

    for item in engine.store.scan(DAILY)? {
        let doc = item?;
        match DailyAggregate::from_value(doc.value) {
            Ok(day) => {
                if day.date >= from && day.date <= to {
                    total += day.total;
                    counts.merge(day.counts);
                }
            }
            Err(e) => {
                eprintln!("Warning: skipping unparseable daily document {}: {}", doc.key, e);
            }
        }
    }

    Ok(PeriodAggregate {
        from,
        to,
        total,
        counts,
    })
}

/// Dates that have a daily record, newest first
pub(super) fn list_dates(engine: &AggregationEngine) -> LedgerResult<Vec<NaiveDate>> {
    let mut dates = Vec::new();
    for item in engine.store.scan(DAILY)? {
        let doc = item?;
        match DailyAggregate::from_value(doc.value) {
            Ok(day) => dates.push(day.date),
            Err(e) => {
                eprintln!("Warning: skipping unparseable daily document {}: {}", doc.key, e);
            }
        }
    }
    dates.sort_unstable_by(|a, b| b.cmp(a));
    Ok(dates)
}
