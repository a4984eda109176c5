//! In-process document store
//!
//! Keeps every collection in an ordered map behind a single `RwLock`.
//! Commits take the write lock, so conflict checking and application are
//! one atomic step. Used as the non-durable storage strategy and by the
//! test suites.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde_json::Value;

use super::{Document, DocumentStore, ReadStamp, ScanIter, StoreError, StoreResult, WriteOp};

#[derive(Debug, Clone)]
struct StoredDoc {
    version: u64,
    value: Value,
}

type Collections = HashMap<String, BTreeMap<String, StoredDoc>>;

/// Memory-backed [`DocumentStore`]
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(collections: &Collections, collection: &str, key: &str) -> u64 {
        collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .map(|doc| doc.version)
            .unwrap_or(0)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .map(|doc| Document {
                key: key.to_string(),
                version: doc.version,
                value: doc.value.clone(),
            }))
    }

    fn scan(&self, collection: &str) -> StoreResult<ScanIter<'_>> {
        // Snapshot the key set, then fetch documents one at a time so the
        // scan stays lazy; keys deleted mid-scan are silently skipped.
        let keys: Vec<String> = self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default();
        let collection = collection.to_string();

        Ok(Box::new(keys.into_iter().filter_map(move |key| {
            match self.get(&collection, &key) {
                Ok(Some(doc)) => Some(Ok(doc)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        })))
    }

    fn commit(&self, reads: &[ReadStamp], writes: &[WriteOp]) -> StoreResult<()> {
        let mut collections = self.collections.write();

        for stamp in reads {
            let current = Self::current_version(&collections, &stamp.collection, &stamp.key);
            if current != stamp.version {
                return Err(StoreError::Conflict);
            }
        }

        for op in writes {
            match op {
                WriteOp::Set {
                    collection,
                    key,
                    value,
                } => {
                    let docs = collections.entry(collection.clone()).or_default();
                    let version = docs.get(key).map(|d| d.version).unwrap_or(0) + 1;
                    docs.insert(
                        key.clone(),
                        StoredDoc {
                            version,
                            value: value.clone(),
                        },
                    );
                }
                WriteOp::Delete { collection, key } => {
                    if let Some(docs) = collections.get_mut(collection) {
                        docs.remove(key);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set_op(collection: &str, key: &str, value: Value) -> WriteOp {
        WriteOp::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_get_missing_document() {
        let store = MemoryStore::new();
        assert!(store.get("events", "nope").unwrap().is_none());
    }

    #[test]
    fn test_set_bumps_version() {
        let store = MemoryStore::new();
        store
            .commit(&[], &[set_op("meta", "overall", json!({"total": 1}))])
            .unwrap();
        store
            .commit(&[], &[set_op("meta", "overall", json!({"total": 2}))])
            .unwrap();

        let doc = store.get("meta", "overall").unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.value, json!({"total": 2}));
    }

    #[test]
    fn test_commit_rejects_stale_read() {
        let store = MemoryStore::new();
        store
            .commit(&[], &[set_op("meta", "counters", json!({"nextId": 1}))])
            .unwrap();

        let stale = ReadStamp {
            collection: "meta".to_string(),
            key: "counters".to_string(),
            version: 0,
        };
        let result = store.commit(
            &[stale],
            &[set_op("meta", "counters", json!({"nextId": 2}))],
        );
        assert!(matches!(result, Err(StoreError::Conflict)));
    }

    #[test]
    fn test_conflicted_commit_applies_nothing() {
        let store = MemoryStore::new();
        let stale = ReadStamp {
            collection: "meta".to_string(),
            key: "counters".to_string(),
            version: 7,
        };
        let result = store.commit(&[stale], &[set_op("meta", "counters", json!({}))]);
        assert!(result.is_err());
        assert!(store.get("meta", "counters").unwrap().is_none());
    }

    #[test]
    fn test_scan_runs_in_key_order() {
        let store = MemoryStore::new();
        store
            .commit(
                &[],
                &[
                    set_op("events", "event_0000000002", json!({"id": 2})),
                    set_op("events", "event_0000000001", json!({"id": 1})),
                    set_op("events", "event_0000000010", json!({"id": 10})),
                ],
            )
            .unwrap();

        let ids: Vec<u64> = store
            .scan("events")
            .unwrap()
            .map(|doc| doc.unwrap().value["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 10]);
    }

    #[test]
    fn test_delete_removes_document() {
        let store = MemoryStore::new();
        store
            .commit(&[], &[set_op("meta", "overall", json!({"total": 1}))])
            .unwrap();
        store
            .commit(
                &[],
                &[WriteOp::Delete {
                    collection: "meta".to_string(),
                    key: "overall".to_string(),
                }],
            )
            .unwrap();
        assert!(store.get("meta", "overall").unwrap().is_none());
    }
}
