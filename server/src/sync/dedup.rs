//! Recently-Processed User Cache
//!
//! Suppresses duplicate deliveries of the same logical membership event.
//! Entries live in a process-wide `DashMap` and expire lazily on write; there
//! is no background sweeper. The map is lost on restart, which is fine: it
//! only exists for short-window dedup, the membership update itself is
//! idempotent.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// How long a processed user id suppresses reprocessing, in milliseconds.
pub const DEDUP_WINDOW_MS: i64 = 30_000;

/// Process-wide map of user id to last-processed epoch milliseconds.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: DashMap<String, i64>,
}

impl DedupCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record `user_id` as processed at `now_ms`, unless it was already
    /// processed inside the window.
    ///
    /// Returns `false` when the user is a recent duplicate (caller must
    /// skip). On every accepted write, all expired entries are swept so the
    /// map cannot grow without bound.
    pub fn check_and_stamp(&self, user_id: &str, now_ms: i64) -> bool {
        // Window check and stamp must be a single atomic map operation, or
        // two simultaneous deliveries for the same user could both pass the
        // check and both proceed.
        match self.entries.entry(user_id.to_string()) {
            Entry::Occupied(entry) if now_ms - *entry.get() < DEDUP_WINDOW_MS => {
                return false;
            }
            Entry::Occupied(mut entry) => {
                entry.insert(now_ms);
            }
            Entry::Vacant(entry) => {
                entry.insert(now_ms);
            }
        }

        self.entries.retain(|_, last| now_ms - *last < DEDUP_WINDOW_MS);
        true
    }

    /// Number of live entries (expired-but-unswept entries included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
