//! In-memory coordination store
//!
//! A lightweight alternative to Redis for tests and single-process
//! deployments. Records are cloned in and out, so callers never share state
//! with the store.
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::store::{CoordinationStore, InMemoryStore, Record};
//!
//! let store = InMemoryStore::new();
//! assert!(store.get("PersistentStats").unwrap().is_none());
//!
//! store.set("PersistentStats", &Record::new("PersistentStats")).unwrap();
//! assert_eq!(store.write_count(), 1);
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::StoreError;

use super::record::Record;
use super::traits::CoordinationStore;

/// Process-local record store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Record>>,
    reads: AtomicU64,
    writes: AtomicU64,
    reject_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes report failure without storing anything
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Make subsequent reads fail as if the store were unreachable
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls served
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `set` calls received, accepted or not
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Copy of a stored record without counting as a read
    pub fn snapshot(&self, key: &str) -> Option<Record> {
        self.records.read().get(key).cloned()
    }
}

impl CoordinationStore for InMemoryStore {
    fn store_id(&self) -> &str {
        "in-memory-v1"
    }

    fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionError(format!(
                "{} unavailable reading '{}'",
                self.store_id(),
                key
            )));
        }
        Ok(self.records.read().get(key).cloned())
    }

    fn set(&self, key: &str, record: &Record) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.records.write().insert(key.to_string(), record.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let store = InMemoryStore::new();
        let mut record = Record::new("r");
        record.simple_fields.insert("k".into(), "v".into());

        assert!(store.set("r", &record).unwrap());
        assert_eq!(store.get("r").unwrap(), Some(record));
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_overwrite_is_wholesale() {
        let store = InMemoryStore::new();
        let mut first = Record::new("r");
        first.simple_fields.insert("a".into(), "1".into());
        store.set("r", &first).unwrap();

        let second = Record::new("r");
        store.set("r", &second).unwrap();
        assert!(store.snapshot("r").unwrap().simple_fields.is_empty());
    }

    #[test]
    fn test_rejected_write() {
        let store = InMemoryStore::new();
        store.set_reject_writes(true);
        assert!(!store.set("r", &Record::new("r")).unwrap());
        assert!(store.snapshot("r").is_none());
        assert_eq!(store.write_count(), 1);
    }
}
