//! Process-lifetime cache of retrieved payloads.
//!
//! Entries are keyed by the alias followed by every extra argument, with no
//! delimiter, and are never evicted: once a key has been read, every later
//! request for it sees exactly the same bytes.

use crate::source::MediaType;
use dashmap::DashMap;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Retrieved bytes together with the media type used to decode them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Raw payload
    pub bytes: Vec<u8>,
    /// The declared type, or the type the backend reported for this payload
    pub media_type: MediaType,
}

impl Payload {
    /// The payload as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Hit/miss counters for a [`RetrievalCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: usize,
    /// Lookups that went to a reader
    pub misses: usize,
    /// Payloads currently cached
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RetrievalCache {
    entries: DashMap<String, Arc<Payload>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl RetrievalCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Alias followed by each argument, in order.
    pub(crate) fn key(alias: &str, args: &[String]) -> String {
        let mut key = String::from(alias);
        for arg in args {
            key.push_str(arg);
        }
        key
    }

    /// Look up a key, counting the hit or miss.
    pub(crate) fn get(&self, key: &str) -> Option<Arc<Payload>> {
        let found = self.peek(key);
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Look up a key without touching the counters.
    pub(crate) fn peek(&self, key: &str) -> Option<Arc<Payload>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Store a payload. An existing entry for the key is kept.
    pub(crate) fn insert(&self, key: String, payload: Arc<Payload>) -> Arc<Payload> {
        Arc::clone(self.entries.entry(key).or_insert(payload).value())
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
