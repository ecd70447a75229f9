//! Durable storage for last-known odds.
//!
//! The store is a single key-value artifact (event id -> odds value) that is
//! read entirely at startup and rewritten entirely on every update. Three
//! backends implement [`OddsStore`]:
//!
//! - [`JsonFileStore`]: one JSON object on disk (default)
//! - [`SqliteOddsStore`]: one SQLite table, replaced in a transaction
//! - [`MemoryOddsStore`]: in-process fake for tests and dry runs

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::StoreError;

pub mod models;
pub mod sqlite;

pub use sqlite::SqliteOddsStore;

use models::OddsValue;

/// event_id -> last observed odds
pub type OddsMap = HashMap<String, OddsValue>;

/// Full-artifact persistence for the odds cache.
pub trait OddsStore: Send + Sync {
    /// Read every entry. A store that does not exist yet is empty, not an error.
    fn load(&self) -> Result<OddsMap, StoreError>;

    /// Replace the stored artifact with `odds`. Must be durable on return.
    fn save(&self, odds: &OddsMap) -> Result<(), StoreError>;

    /// Human-readable location for logging.
    fn describe(&self) -> String;
}

// ── JSON file ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFileStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl OddsStore for JsonFileStore {
    fn load(&self) -> Result<OddsMap, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No odds file at {}, starting empty", self.path.display());
                return Ok(OddsMap::new());
            }
            Err(e) => return Err(self.io_err(e)),
        };
        if raw.trim().is_empty() {
            return Ok(OddsMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, odds: &OddsMap) -> Result<(), StoreError> {
        let body = serde_json::to_vec(odds).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        // Write-then-rename so a crash mid-write never leaves a torn file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp).map_err(|e| self.io_err(e))?;
        file.write_all(&body).map_err(|e| self.io_err(e))?;
        file.sync_all().map_err(|e| self.io_err(e))?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;

        debug!("Flushed {} odds entries to {}", odds.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ── In-memory ─────────────────────────────────────────────────────────────────

/// Shared in-memory store. Clones observe the same contents, so a test can
/// keep one handle and hand another to the cache.
#[derive(Debug, Clone, Default)]
pub struct MemoryOddsStore {
    entries: Arc<Mutex<OddsMap>>,
    saves: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryOddsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: OddsMap) -> Self {
        MemoryOddsStore {
            entries: Arc::new(Mutex::new(entries)),
            ..Self::default()
        }
    }

    /// Make every subsequent `save` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> OddsMap {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl OddsStore for MemoryOddsStore {
    fn load(&self) -> Result<OddsMap, StoreError> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn save(&self, odds: &OddsMap) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store rejecting writes".into()));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        *entries = odds.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
