//! Engine configuration
//!
//! All knobs have in-code defaults and can be overridden through the
//! environment, so the embedding application configures the engine the same
//! way in development and in deployment.

use std::env;
use std::path::PathBuf;

/// Tunables of the aggregation engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rebuild the ledger automatically when a read finds it missing
    pub auto_rebuild: bool,
    /// Scan bound for auto-triggered rebuilds (0 = unbounded)
    pub rebuild_max_events: u64,
    /// Maximum writes per commit; rebuild batches stay under this ceiling
    pub max_ops_per_commit: usize,
    /// Transaction attempts before a conflict is surfaced to the caller
    pub txn_max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_rebuild: false,
            rebuild_max_events: 0,
            // Document stores commonly cap commits at ~500 ops; 450 leaves
            // headroom for the meta documents.
            max_ops_per_commit: 450,
            txn_max_attempts: 5,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, falling back to defaults
    ///
    /// Recognized variables: `AUTO_REBUILD_AGGREGATES` (truthy string),
    /// `REBUILD_MAX_EVENTS` (integer, 0 = unbounded).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            auto_rebuild: env_bool("AUTO_REBUILD_AGGREGATES", defaults.auto_rebuild),
            rebuild_max_events: env::var("REBUILD_MAX_EVENTS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.rebuild_max_events),
            ..defaults
        }
    }

    /// Rebuild bound as an `Option`, `None` meaning unbounded
    pub(crate) fn rebuild_bound(&self) -> Option<u64> {
        if self.rebuild_max_events == 0 {
            None
        } else {
            Some(self.rebuild_max_events)
        }
    }
}

/// Storage strategy, selected once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// In-process only; state is lost when the process exits
    Memory,
    /// Durable file-per-document store rooted at the given directory
    File(PathBuf),
}

impl StorageMode {
    /// Pick the storage mode from the environment
    ///
    /// `LEDGER_DATA_DIR` set (and non-empty) selects the durable file
    /// store; otherwise the in-process store is used.
    pub fn from_env() -> Self {
        match env::var("LEDGER_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => StorageMode::File(PathBuf::from(dir.trim())),
            _ => StorageMode::Memory,
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => truthy(&value),
        Err(_) => default,
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
