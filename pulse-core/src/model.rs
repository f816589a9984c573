use std::collections::HashSet;
use std::time::Instant;

use pulse_types::{CallerTag, StockCode};

/// An interest-set membership record: a code's attributed callers and its
/// TTL bookkeeping.
///
/// Owned by the pool. `last_enqueued_at` resets on every
/// `enqueue`/`apply` touch regardless of tag; the pool's eviction sweep
/// drops entries whose `last_enqueued_at` has aged past the configured TTL.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    /// The pooled stock code.
    pub code: StockCode,
    /// Every caller currently claiming interest in this code.
    pub tags: HashSet<CallerTag>,
    /// When this entry was first enqueued.
    pub added_at: Instant,
    /// Most recent enqueue/apply touch; drives TTL eviction.
    pub last_enqueued_at: Instant,
}

impl PoolEntry {
    /// Start a new entry for `code`, attributed to `tag`, timestamped `now`.
    #[must_use]
    pub fn new(code: StockCode, tag: CallerTag, now: Instant) -> Self {
        let mut tags = HashSet::with_capacity(1);
        tags.insert(tag);
        Self {
            code,
            tags,
            added_at: now,
            last_enqueued_at: now,
        }
    }

    /// Record a fresh touch from `tag`, refreshing the TTL clock.
    pub fn touch(&mut self, tag: CallerTag, now: Instant) {
        self.tags.insert(tag);
        self.last_enqueued_at = now;
    }

    /// Whether `watchlist` is among this entry's attributed tags — the
    /// fast-vs-slow routing decision.
    #[must_use]
    pub fn is_watchlisted(&self) -> bool {
        self.tags.contains(&CallerTag::Watchlist)
    }

    /// Whether this entry has aged out of the pool's TTL window.
    #[must_use]
    pub fn is_expired(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.duration_since(self.last_enqueued_at) > ttl
    }
}
