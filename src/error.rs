//! Error taxonomy for the aggregation engine
//!
//! Conflicts on the optimistic transaction path are a store-layer concern
//! (`store::StoreError::Conflict`); the transaction wrapper retries them
//! transparently and they only reach callers as `BackingStoreUnavailable`
//! once the retry budget is exhausted.

use crate::store::StoreError;
use crate::types::RebuildReport;

/// Result type for engine operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors surfaced by the public engine operations
#[derive(Debug)]
pub enum LedgerError {
    /// Client supplied a category outside the fixed three-level set
    InvalidCategory(String),
    /// The backing document store could not be reached, returned a broken
    /// document, or kept conflicting past the retry budget
    BackingStoreUnavailable(String),
    /// The overall aggregate record is missing and auto-rebuild is disabled
    /// or itself failed; zeros are never fabricated in its place
    AggregateUnavailable,
    /// Exact-id lookup miss
    NotFound(u64),
    /// A rebuild failed partway through; the counts accumulated so far are
    /// preserved so the caller can decide whether to retry
    RebuildIncomplete {
        partial: RebuildReport,
        reason: String,
    },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::InvalidCategory(value) => {
                write!(f, "invalid category '{}' (expected low, mid or high)", value)
            }
            LedgerError::BackingStoreUnavailable(msg) => {
                write!(f, "backing store unavailable: {}", msg)
            }
            LedgerError::AggregateUnavailable => {
                write!(f, "aggregate ledger unavailable (overall record missing)")
            }
            LedgerError::NotFound(id) => write!(f, "event {} not found", id),
            LedgerError::RebuildIncomplete { partial, reason } => write!(
                f,
                "rebuild incomplete after scanning {} events: {}",
                partial.scanned, reason
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => LedgerError::BackingStoreUnavailable(
                "transaction conflict retries exhausted".to_string(),
            ),
            other => LedgerError::BackingStoreUnavailable(other.to_string()),
        }
    }
}
