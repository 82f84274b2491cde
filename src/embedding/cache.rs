//! Fingerprint-keyed embedding cache
//!
//! Bounded, insertion ordered. When an insert would exceed the capacity the oldest
//! half of the entries is dropped first. Reads never reorder entries.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::Hash;
use std::sync::Mutex;

use super::Embedding;

/// Stable hash of the first N characters of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(text: &str, prefix_chars: usize) -> Self {
        let prefix = crate::text::char_prefix(text, prefix_chars);
        let digest = Sha256::digest(prefix.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Drop the oldest half of `entries` (at least one entry when non-empty).
///
/// `entries` must only ever be read with `peek`, which keeps the LRU order equal
/// to insertion order.
pub fn evict_oldest_half<K: Hash + Eq, V>(entries: &mut LruCache<K, V>) -> usize {
    let to_remove = (entries.len() / 2).max(1).min(entries.len());
    for _ in 0..to_remove {
        entries.pop_lru();
    }
    to_remove
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}

pub struct VectorCache {
    entries: Mutex<LruCache<Fingerprint, Embedding>>,
    capacity: usize,
    prefix_chars: usize,
}

impl VectorCache {
    pub fn new(capacity: usize, prefix_chars: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            capacity: capacity.max(1),
            prefix_chars,
        }
    }

    pub fn fingerprint(&self, text: &str) -> Fingerprint {
        Fingerprint::of(text, self.prefix_chars)
    }

    pub fn get(&self, key: &Fingerprint) -> Option<Embedding> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.peek(key).cloned()
    }

    /// Insert, evicting the oldest half first if the cache is full.
    ///
    /// Eviction and insertion happen under one lock.
    pub fn insert(&self, key: Fingerprint, embedding: Embedding) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains(&key) && entries.len() >= self.capacity {
            let removed = evict_oldest_half(&mut entries);
            tracing::debug!("Embedding cache full, evicted {} oldest entries", removed);
        }
        entries.put(key, embedding);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
        }
    }
}
