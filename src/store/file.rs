//! Durable document store over plain files
//!
//! One JSON file per document under `<data_dir>/<collection>/<key>.json`,
//! written with the atomic temp-file + rename pattern. Each file wraps its
//! payload with a version counter used for the optimistic commit check.
//!
//! Commits are serialized with a process-wide mutex: within one process the
//! store provides the same conflict detection as [`MemoryStore`], but two
//! independent processes sharing a data directory can still race. That is a
//! known limitation of this strategy; deployments needing cross-process
//! writers put a real transactional store behind the trait instead.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::atomic::{cleanup_temp_files, stage_write};

use super::{Document, DocumentStore, ReadStamp, ScanIter, StoreError, StoreResult, WriteOp};

/// On-disk wrapper around a document payload
#[derive(Debug, Serialize, Deserialize)]
struct VersionedDoc {
    version: u64,
    data: Value,
}

/// File-backed [`DocumentStore`]
pub struct FileStore {
    data_dir: PathBuf,
    commit_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `data_dir`
    pub fn open<P: AsRef<Path>>(data_dir: P) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        // Sweep temp files left by interrupted writes in every collection.
        for entry in fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                cleanup_temp_files(&path)?;
            }
        }

        Ok(Self {
            data_dir,
            commit_lock: Mutex::new(()),
        })
    }

    fn doc_path(&self, collection: &str, key: &str) -> PathBuf {
        self.data_dir.join(collection).join(format!("{}.json", key))
    }

    fn read_doc(&self, collection: &str, key: &str) -> StoreResult<Option<VersionedDoc>> {
        let path = self.doc_path(collection, key);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        let doc: VersionedDoc = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;
        Ok(Some(doc))
    }

    fn current_version(&self, collection: &str, key: &str) -> StoreResult<u64> {
        Ok(self.read_doc(collection, key)?.map(|d| d.version).unwrap_or(0))
    }

    fn stage_doc(&self, collection: &str, key: &str, doc: &VersionedDoc) -> StoreResult<PathBuf> {
        let path = self.doc_path(collection, key);
        let content = serde_json::to_string(doc)?;
        Ok(stage_write(&path, &content)?)
    }
}

/// One write of a commit, staged but not yet visible
enum StagedOp {
    Promote { temp: PathBuf, path: PathBuf },
    Remove(PathBuf),
}

impl DocumentStore for FileStore {
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        Ok(self.read_doc(collection, key)?.map(|doc| Document {
            key: key.to_string(),
            version: doc.version,
            value: doc.data,
        }))
    }

    fn scan(&self, collection: &str) -> StoreResult<ScanIter<'_>> {
        let dir = self.data_dir.join(collection);
        if !dir.exists() {
            return Ok(Box::new(std::iter::empty()));
        }

        // Snapshot the key list (cheap), then read one file per step so an
        // arbitrarily large collection never sits in memory at once.
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
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
        let _guard = self.commit_lock.lock();

        for stamp in reads {
            if self.current_version(&stamp.collection, &stamp.key)? != stamp.version {
                return Err(StoreError::Conflict);
            }
        }

        // Two-phase apply: stage every document to its temp sibling first,
        // so ordinary write failures (full disk, permissions) abort before
        // any committed file has changed.
        let mut staged = Vec::with_capacity(writes.len());
        for op in writes {
            let result = match op {
                WriteOp::Set {
                    collection,
                    key,
                    value,
                } => self
                    .current_version(collection, key)
                    .and_then(|version| {
                        self.stage_doc(
                            collection,
                            key,
                            &VersionedDoc {
                                version: version + 1,
                                data: value.clone(),
                            },
                        )
                    })
                    .map(|temp| StagedOp::Promote {
                        temp,
                        path: self.doc_path(collection, key),
                    }),
                WriteOp::Delete { collection, key } => {
                    Ok(StagedOp::Remove(self.doc_path(collection, key)))
                }
            };

            match result {
                Ok(op) => staged.push(op),
                Err(e) => {
                    for op in &staged {
                        if let StagedOp::Promote { temp, .. } = op {
                            let _ = fs::remove_file(temp);
                        }
                    }
                    return Err(e);
                }
            }
        }

        // Promotion is renames and unlinks on one filesystem; failures here
        // are not rolled back.
        for op in staged {
            match op {
                StagedOp::Promote { temp, path } => fs::rename(temp, path)?,
                StagedOp::Remove(path) => {
                    if path.exists() {
                        fs::remove_file(path)?;
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
    use tempfile::TempDir;

    fn set_op(collection: &str, key: &str, value: Value) -> WriteOp {
        WriteOp::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_documents_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(temp_dir.path()).unwrap();
            store
                .commit(&[], &[set_op("meta", "overall", json!({"total": 3}))])
                .unwrap();
        }

        let store = FileStore::open(temp_dir.path()).unwrap();
        let doc = store.get("meta", "overall").unwrap().unwrap();
        assert_eq!(doc.value, json!({"total": 3}));
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn test_version_check_across_commits() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

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

        // Version on disk is untouched.
        assert_eq!(
            store.get("meta", "counters").unwrap().unwrap().version,
            1
        );
    }

    #[test]
    fn test_scan_orders_by_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store
            .commit(
                &[],
                &[
                    set_op("events", "event_0000000003", json!({"id": 3})),
                    set_op("events", "event_0000000001", json!({"id": 1})),
                ],
            )
            .unwrap();

        let ids: Vec<u64> = store
            .scan("events")
            .unwrap()
            .map(|doc| doc.unwrap().value["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_scan_missing_collection_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.scan("events").unwrap().count(), 0);
    }

    #[test]
    fn test_open_sweeps_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let events_dir = temp_dir.path().join("events");
        fs::create_dir_all(&events_dir).unwrap();
        fs::write(events_dir.join("event_0000000001.tmp"), "partial").unwrap();

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(!events_dir.join("event_0000000001.tmp").exists());
        assert_eq!(store.scan("events").unwrap().count(), 0);
    }

    #[test]
    fn test_failed_commit_applies_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        // A plain file where the daily collection directory should be makes
        // every write into that collection fail at staging time.
        fs::write(temp_dir.path().join("daily"), "not a directory").unwrap();

        let result = store.commit(
            &[],
            &[
                set_op("events", "event_0000000001", json!({"id": 1})),
                set_op("daily", "2025-03-14", json!({"total": 1})),
            ],
        );
        assert!(result.is_err());

        // The earlier write of the same commit must not be visible, and its
        // staged temp file must be gone.
        assert!(store.get("events", "event_0000000001").unwrap().is_none());
        assert!(!temp_dir
            .path()
            .join("events")
            .join("event_0000000001.tmp")
            .exists());
    }

    #[test]
    fn test_delete_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store
            .commit(&[], &[set_op("meta", "overall", json!({}))])
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
