use std::time::{Duration, Instant};

use dashmap::DashMap;
use pulse_core::PoolEntry;
use pulse_types::{CallerTag, PoolConfig, StockCode};

/// The interest set: every code any caller currently cares about, with its
/// attributed tags and TTL bookkeeping.
///
/// Backed by `DashMap` for lock-free concurrent `enqueue` from many
/// producers (watchlist sync, strategy scanners, refresh handlers) against
/// a single maintenance loop doing `evict_expired`.
#[derive(Default)]
pub struct Pool {
    entries: DashMap<StockCode, PoolEntry>,
}

impl Pool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record interest in `code` from `tag`, inserting or refreshing its
    /// entry's TTL clock.
    pub fn enqueue(&self, code: StockCode, tag: CallerTag, now: Instant) {
        self.entries
            .entry(code)
            .and_modify(|e| e.touch(tag, now))
            .or_insert_with(|| PoolEntry::new(code, tag, now));
    }

    /// Record interest in many codes at once, all attributed to `tag`.
    pub fn enqueue_many(&self, codes: impl IntoIterator<Item = StockCode>, tag: CallerTag, now: Instant) {
        for code in codes {
            self.enqueue(code, tag, now);
        }
    }

    /// Drop entries whose TTL has elapsed, returning the evicted codes so
    /// the cache can drop them too (cache ⊆ pool).
    pub fn evict_expired(&self, now: Instant, config: &PoolConfig) -> Vec<StockCode> {
        let expired: Vec<StockCode> = self
            .entries
            .iter()
            .filter(|e| e.is_expired(now, config.ttl))
            .map(|e| *e.key())
            .collect();
        for code in &expired {
            self.entries.remove(code);
        }
        expired
    }

    /// Snapshot of codes currently attributed to [`CallerTag::Watchlist`]
    /// (routed to the `fast` source).
    #[must_use]
    pub fn watchlisted(&self) -> Vec<StockCode> {
        self.entries
            .iter()
            .filter(|e| e.is_watchlisted())
            .map(|e| *e.key())
            .collect()
    }

    /// Snapshot of codes with no watchlist attribution (routed to `slow`
    /// and `scrape`).
    #[must_use]
    pub fn non_watchlisted(&self) -> Vec<StockCode> {
        self.entries
            .iter()
            .filter(|e| !e.is_watchlisted())
            .map(|e| *e.key())
            .collect()
    }

    /// All pooled codes, used for [`pulse_types::Dashboard::All`] refresh
    /// requests.
    #[must_use]
    pub fn all_codes(&self) -> Vec<StockCode> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Codes attributed to `tag`, used for per-dashboard refresh requests.
    #[must_use]
    pub fn codes_for(&self, tag: CallerTag) -> Vec<StockCode> {
        self.entries
            .iter()
            .filter(|e| e.tags.contains(&tag))
            .map(|e| *e.key())
            .collect()
    }

    /// Whether `code` is currently pooled.
    #[must_use]
    pub fn contains(&self, code: StockCode) -> bool {
        self.entries.contains_key(&code)
    }

    /// Number of pooled codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> StockCode {
        StockCode::parse(s).unwrap()
    }

    #[test]
    fn enqueue_routes_by_tag() {
        let pool = Pool::new();
        let now = Instant::now();
        pool.enqueue(code("000001"), CallerTag::Watchlist, now);
        pool.enqueue(code("600519"), CallerTag::Strategy, now);
        assert_eq!(pool.watchlisted(), vec![code("000001")]);
        assert_eq!(pool.non_watchlisted(), vec![code("600519")]);
    }

    #[test]
    fn evict_expired_removes_stale_entries_only() {
        let pool = Pool::new();
        let now = Instant::now();
        pool.enqueue(code("000001"), CallerTag::Bootstrap, now);
        let config = PoolConfig {
            ttl: Duration::from_millis(0),
            maintenance_interval: Duration::from_secs(1),
        };
        let later = now + Duration::from_millis(1);
        let evicted = pool.evict_expired(later, &config);
        assert_eq!(evicted, vec![code("000001")]);
        assert!(pool.is_empty());
    }

    #[test]
    fn touch_keeps_entry_alive_past_original_ttl() {
        let pool = Pool::new();
        let t0 = Instant::now();
        pool.enqueue(code("000001"), CallerTag::Watchlist, t0);
        let config = PoolConfig {
            ttl: Duration::from_millis(50),
            maintenance_interval: Duration::from_secs(1),
        };
        pool.enqueue(code("000001"), CallerTag::Watchlist, t0);
        let evicted = pool.evict_expired(t0, &config);
        assert!(evicted.is_empty());
        assert!(pool.contains(code("000001")));
    }
}
