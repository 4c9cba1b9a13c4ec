//! Buffered writes layered over a key-value store.
//!
//! A `CacheOverlay` stages writes for the current transaction. Reads check the
//! overlay first and fall through to the backing store; merging the overlay
//! applies its writes to the store in key order.

use std::collections::BTreeMap;

/// Write buffer overlaying a backing key-value map.
///
/// Uses `BTreeMap` so merges apply in deterministic key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOverlay {
    /// key → Some(value) for sets, key → None for deletions.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

/// Result of looking up a key in the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayResult {
    /// Key was set in the overlay to this value.
    Found(Vec<u8>),
    /// Key was deleted in the overlay.
    Deleted,
    /// Key is untouched; the caller must check the backing store.
    NotInOverlay,
}

impl CacheOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    /// Record a tombstone that masks the backing store's value.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    pub fn get(&self, key: &[u8]) -> OverlayResult {
        match self.writes.get(key) {
            Some(Some(value)) => OverlayResult::Found(value.clone()),
            Some(None) => OverlayResult::Deleted,
            None => OverlayResult::NotInOverlay,
        }
    }

    /// Read through the overlay into `backing`.
    pub fn read_through(&self, backing: &BTreeMap<Vec<u8>, Vec<u8>>, key: &[u8]) -> Option<Vec<u8>> {
        match self.get(key) {
            OverlayResult::Found(value) => Some(value),
            OverlayResult::Deleted => None,
            OverlayResult::NotInOverlay => backing.get(key).cloned(),
        }
    }

    /// Apply every buffered write to `backing` and empty the overlay.
    /// Returns the number of keys touched.
    pub fn merge_into(&mut self, backing: &mut BTreeMap<Vec<u8>, Vec<u8>>) -> usize {
        let writes = std::mem::take(&mut self.writes);
        let touched = writes.len();
        for (key, value) in writes {
            match value {
                Some(v) => {
                    backing.insert(key, v);
                }
                None => {
                    backing.remove(&key);
                }
            }
        }
        touched
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
