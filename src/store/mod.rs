//! Transactional document store abstraction
//!
//! The engine talks to its backing store through the [`DocumentStore`]
//! trait: versioned point reads, a lazy restartable scan, and an atomic
//! multi-document commit with optimistic conflict detection. Two strategies
//! implement it, an in-process [`MemoryStore`] and a durable [`FileStore`],
//! selected once at startup.
//!
//! [`run_transaction`] is the only write path: it records every read's
//! version, buffers writes, and retries the whole body when the commit-time
//! version check fails. The classic race (two writers reading the same
//! counter value) resolves with exactly one winner; the loser re-runs its
//! body against fresh state.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde_json::Value;

/// Collection holding the append-only rating events
pub const EVENTS: &str = "events";
/// Collection holding the singleton meta documents
pub const META: &str = "meta";
/// Collection holding one summary document per calendar date
pub const DAILY: &str = "daily";

/// Key of the counter singleton inside [`META`]
pub const COUNTERS_DOC: &str = "counters";
/// Key of the overall-aggregate singleton inside [`META`]
pub const OVERALL_DOC: &str = "overall";

/// Document key for an event id (zero-padded so scans run in id order)
pub fn event_key(id: u64) -> String {
    format!("event_{:010}", id)
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the store layer
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Commit-time version check failed; retried by [`run_transaction`]
    Conflict,
    /// A stored document could not be interpreted
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Json(e) => write!(f, "JSON error: {}", e),
            StoreError::Conflict => write!(f, "transaction conflict"),
            StoreError::Corrupt(msg) => write!(f, "corrupt document: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// A versioned document read from the store
#[derive(Debug, Clone)]
pub struct Document {
    pub key: String,
    /// Bumped on every write; version 0 means "does not exist"
    pub version: u64,
    pub value: Value,
}

/// Version stamp recorded for each transactional read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadStamp {
    pub collection: String,
    pub key: String,
    /// Version observed at read time (0 when the document was absent)
    pub version: u64,
}

/// A buffered write applied at commit time
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set {
        collection: String,
        key: String,
        value: Value,
    },
    Delete {
        collection: String,
        key: String,
    },
}

impl WriteOp {
    fn targets(&self, collection: &str, key: &str) -> bool {
        match self {
            WriteOp::Set {
                collection: c,
                key: k,
                ..
            }
            | WriteOp::Delete {
                collection: c,
                key: k,
            } => c == collection && k == key,
        }
    }
}

/// Lazy document iterator returned by [`DocumentStore::scan`]
pub type ScanIter<'a> = Box<dyn Iterator<Item = StoreResult<Document>> + 'a>;

/// Backend-agnostic transactional document store
///
/// Implementations must make `commit` atomic: either every buffered write
/// becomes visible or none does, and the commit fails with
/// [`StoreError::Conflict`] when any read-stamped document changed since it
/// was read.
pub trait DocumentStore: Send + Sync {
    /// Point read of one document with its current version
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>>;

    /// Lazy scan of a collection in key order
    ///
    /// Must tolerate an unbounded number of documents without materializing
    /// them all; documents written after the scan started may or may not be
    /// observed.
    fn scan(&self, collection: &str) -> StoreResult<ScanIter<'_>>;

    /// Validate the read set and apply the writes atomically
    fn commit(&self, reads: &[ReadStamp], writes: &[WriteOp]) -> StoreResult<()>;
}

/// Read set + write buffer accumulated by one transaction attempt
pub struct Transaction<'a> {
    store: &'a dyn DocumentStore,
    reads: Vec<ReadStamp>,
    writes: Vec<WriteOp>,
}

impl<'a> Transaction<'a> {
    fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Transactional read with read-your-writes semantics
    ///
    /// The observed version is stamped into the read set so the commit can
    /// detect concurrent modification, including creation of a document
    /// that was absent when read.
    pub fn get(&mut self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        for op in self.writes.iter().rev() {
            if op.targets(collection, key) {
                return match op {
                    WriteOp::Set { value, .. } => Ok(Some(value.clone())),
                    WriteOp::Delete { .. } => Ok(None),
                };
            }
        }

        match self.store.get(collection, key)? {
            Some(doc) => {
                self.reads.push(ReadStamp {
                    collection: collection.to_string(),
                    key: key.to_string(),
                    version: doc.version,
                });
                Ok(Some(doc.value))
            }
            None => {
                self.reads.push(ReadStamp {
                    collection: collection.to_string(),
                    key: key.to_string(),
                    version: 0,
                });
                Ok(None)
            }
        }
    }

    /// Buffer a full-document write
    pub fn set(&mut self, collection: &str, key: &str, value: Value) {
        self.writes.push(WriteOp::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            value,
        });
    }

    /// Buffer a document deletion
    pub fn delete(&mut self, collection: &str, key: &str) {
        self.writes.push(WriteOp::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        });
    }

    /// Number of writes buffered so far
    pub fn op_count(&self) -> usize {
        self.writes.len()
    }
}

/// Run `body` inside an optimistic transaction, retrying conflicts
///
/// Conflicted attempts are re-run against fresh reads up to `max_attempts`
/// times; after that the conflict is surfaced as an error. Non-conflict
/// errors from the body or the commit abort immediately.
pub fn run_transaction<T, F>(
    store: &dyn DocumentStore,
    max_attempts: u32,
    mut body: F,
) -> StoreResult<T>
where
    F: FnMut(&mut Transaction<'_>) -> StoreResult<T>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        let mut tx = Transaction::new(store);
        let out = body(&mut tx)?;
        match store.commit(&tx.reads, &tx.writes) {
            Ok(()) => return Ok(out),
            Err(StoreError::Conflict) if attempts < max_attempts => continue,
            Err(e) => return Err(e),
        }
    }
}
