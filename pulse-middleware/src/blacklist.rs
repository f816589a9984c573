use std::time::{Duration, Instant};

use dashmap::DashMap;
use pulse_types::StockCode;

/// Tracks codes that a source has permanently failed on, so the scheduler
/// stops retrying them until the staleness window reopens.
///
/// Entries are keyed by code alone: a blacklist is scoped to one source's
/// [`Skiplist`] instance, mirroring one gate per source in `quota`.
#[derive(Default)]
pub struct Skiplist {
    entries: DashMap<StockCode, Instant>,
}

impl Skiplist {
    /// Create an empty skip-list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Mark `code` as permanently failed as of now.
    pub fn mark(&self, code: StockCode) {
        self.entries.insert(code, Instant::now());
    }

    /// Whether `code` is currently skipped, given `staleness` (the source's
    /// configured staleness window). Entries older than `staleness` are
    /// evicted as a side effect, re-admitting the code for retry.
    #[must_use]
    pub fn is_skipped(&self, code: StockCode, staleness: Duration) -> bool {
        let Some(marked_at) = self.entries.get(&code).map(|e| *e) else {
            return false;
        };
        if marked_at.elapsed() >= staleness {
            self.entries.remove(&code);
            return false;
        }
        true
    }

    /// Remove `code` from the skip-list unconditionally, e.g. after a
    /// successful fetch recovers it.
    pub fn clear(&self, code: &StockCode) {
        self.entries.remove(code);
    }

    /// Number of codes currently skipped, for metrics/logging.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the skip-list is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
