//! Time-boxed, size-bounded score cache
//!
//! Entries expire lazily on read once `ttl` has elapsed since insertion. When
//! full, inserting a new fingerprint evicts the single oldest entry by insertion
//! time. Reads do not refresh an entry's age.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    score: f32,
    created_at: Instant,
}

/// Fingerprint → score cache guarded by a single lock
pub struct ScoreCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_size: usize,
}

impl ScoreCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(max_size.min(4096))),
            ttl,
            max_size,
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<f32> {
        self.get_at(fingerprint, Instant::now())
    }

    /// Look up a score as of `now`, evicting it if expired
    pub fn get_at(&self, fingerprint: &str, now: Instant) -> Option<f32> {
        let mut entries = self.entries.lock();
        let entry = *entries.get(fingerprint)?;

        if now.saturating_duration_since(entry.created_at) >= self.ttl {
            entries.remove(fingerprint);
            debug!(fingerprint, "Cached score expired");
            return None;
        }
        Some(entry.score)
    }

    pub fn put(&self, fingerprint: impl Into<String>, score: f32) {
        self.put_at(fingerprint, score, Instant::now());
    }

    /// Insert or overwrite, stamping the entry with `now`
    pub fn put_at(&self, fingerprint: impl Into<String>, score: f32, now: Instant) {
        if self.max_size == 0 {
            return;
        }
        let fingerprint = fingerprint.into();
        let mut entries = self.entries.lock();

        if !entries.contains_key(&fingerprint) && entries.len() >= self.max_size {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!(evicted = %oldest, "Score cache full, evicted oldest entry");
            }
        }

        entries.insert(
            fingerprint,
            CacheEntry {
                score,
                created_at: now,
            },
        );
    }

    /// Entries currently held, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
