//! Rebuild procedure
//!
//! Recomputes the counter and both aggregate families from a full (or
//! bounded) scan of the event log, then replaces the stored records
//! wholesale in commits kept under the store's per-commit ceiling.
//!
//! The procedure is deliberately *not* one transaction: it spans multiple
//! commits, and events written while the scan is running may be under- or
//! double-counted. It is a recovery tool with the same weak guarantee the
//! system always had: run it when write traffic is low, or re-run it if it
//! raced with writers. Its end state is idempotent over a static log.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::store::{DAILY, EVENTS, META, OVERALL_DOC};
use crate::types::{DailyAggregate, OverallAggregate, RatingEvent, RebuildReport};

use super::{counter, AggregationEngine};

fn incomplete(partial: &RebuildReport, reason: &dyn std::fmt::Display) -> LedgerError {
    LedgerError::RebuildIncomplete {
        partial: partial.clone(),
        reason: reason.to_string(),
    }
}

pub(super) fn rebuild_aggregates(
    engine: &AggregationEngine,
    max_events: Option<u64>,
) -> LedgerResult<RebuildReport> {
    let mut overall = OverallAggregate::empty();
    let mut daily: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();
    let mut scanned = 0u64;
    let mut max_id = 0u64;

    let report_so_far = |scanned: u64,
                         overall: &OverallAggregate,
                         distinct_dates: usize,
                         max_id: u64| RebuildReport {
        scanned,
        total: overall.total,
        last_id: overall.last_id,
        distinct_dates,
        next_id: max_id + 1,
    };

    let scan = engine.store.scan(EVENTS).map_err(LedgerError::from)?;
    for item in scan {
        if let Some(bound) = max_events {
            if scanned >= bound {
                break;
            }
        }

        let doc = item.map_err(|e| {
            incomplete(&report_so_far(scanned, &overall, daily.len(), max_id), &e)
        })?;
        scanned += 1;

        match RatingEvent::from_value(doc.value) {
            Ok(event) => {
                overall.apply(&event);
                daily
                    .entry(event.date)
                    .or_insert_with(|| DailyAggregate::empty(event.date))
                    .apply(&event);
                max_id = max_id.max(event.id);
            }
            Err(e) => {
                eprintln!("Warning: skipping unparseable event document {}: {}", doc.key, e);
            }
        }
    }

    let mut report = report_so_far(scanned, &overall, daily.len(), max_id);

    // First commit replaces the singletons, so the ledger is readable again
    // even if a later daily batch fails. The counter only ever moves
    // forward: an allocator that issued ids since the scan started must not
    // be regressed.
    let observed_next = report.next_id;
    let effective_next = engine
        .run_txn(|tx| {
            let stored = counter::read_next_id(tx)?.unwrap_or(0);
            let next = stored.max(observed_next);
            counter::write_next_id(tx, next)?;
            tx.set(META, OVERALL_DOC, overall.to_value()?);
            Ok(next)
        })
        .map_err(|e| incomplete(&report, &e))?;
    report.next_id = effective_next;

    let batch_size = engine.config.max_ops_per_commit.max(1);
    let days: Vec<&DailyAggregate> = daily.values().collect();
    for chunk in days.chunks(batch_size) {
        engine
            .run_txn(|tx| {
                for day in chunk {
                    tx.set(DAILY, &day.date.to_string(), day.to_value()?);
                }
                Ok(())
            })
            .map_err(|e| incomplete(&report, &e))?;
    }

    Ok(report)
}
