//! TTL response cache.
//!
//! Keyed by a digest of (conversation id, normalized message) so repeated
//! identical questions inside one conversation skip the whole reasoning
//! loop. Bounded size with oldest-entry eviction.
//!
//! Thread-safe via `std::sync::Mutex` (non-async, held briefly).

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// An in-memory cache with per-entry TTL and bounded size.
pub struct ResponseCache<V> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic cache key from the normalized query and conversation.
    fn key(conversation_id: &str, message: &str) -> String {
        let normalized = message.trim().to_lowercase();
        let digest = Sha256::digest(format!("{conversation_id}:{normalized}").as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Return the cached value, or None on miss/expiry.
    pub fn get(&self, conversation_id: &str, message: &str) -> Option<V> {
        let key = Self::key(conversation_id, message);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get(&key) {
            Some((stored, value)) if stored.elapsed() <= self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store a value, evicting expired entries and then the oldest entry
    /// when at capacity.
    pub fn put(&self, conversation_id: &str, message: &str, value: V) {
        let key = Self::key(conversation_id, message);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        entries.retain(|_, (stored, _)| stored.elapsed() <= self.ttl);

        if entries.len() >= self.max_entries
            && let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, (stored, _))| *stored)
                .map(|(k, _)| k.clone())
        {
            entries.remove(&oldest);
        }

        entries.insert(key, (Instant::now(), value));
    }

    /// Flush all entries.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
