use dashmap::DashMap;
use pulse_types::{Quote, StockCode};

/// The realtime quote cache: the latest known reading for every pooled
/// code.
///
/// Maintains two invariants:
/// - **cache ⊆ pool**: [`evict`](Self::evict) is always driven by the
///   pool's own eviction sweep, never by an independent TTL.
/// - **monotonic merge**: [`put`](Self::put) never lets an older reading
///   overwrite a newer one, even if it arrives later (a slow retry landing
///   after a fast update, say).
#[derive(Default)]
pub struct Cache {
    quotes: DashMap<StockCode, Quote>,
}

impl Cache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            quotes: DashMap::new(),
        }
    }

    /// Current quote for `code`, if cached.
    #[must_use]
    pub fn get(&self, code: StockCode) -> Option<Quote> {
        self.quotes.get(&code).map(|q| *q)
    }

    /// Merge one `(code, quote)` reading, returning `Some(quote)` only when
    /// it actually changed the cached value (a price/change_pct delta), or
    /// the code was new. A reading whose `last_updated` is older than
    /// what's cached is dropped rather than applied.
    pub fn put(&self, code: StockCode, quote: Quote) -> Option<Quote> {
        match self.quotes.get(&code).map(|q| *q) {
            None => {
                self.quotes.insert(code, quote);
                Some(quote)
            }
            Some(existing) if quote.last_updated < existing.last_updated => None,
            Some(existing) if existing.value_key() == quote.value_key() => {
                // Refresh the timestamp so staleness checks see the new read,
                // without reporting a delta to subscribers.
                self.quotes.insert(code, quote);
                None
            }
            Some(_) => {
                self.quotes.insert(code, quote);
                Some(quote)
            }
        }
    }

    /// Merge many readings at once, returning only the ones that produced a
    /// delta, in the same order as `readings`.
    pub fn put_many(&self, readings: impl IntoIterator<Item = (StockCode, Quote)>) -> Vec<(StockCode, Quote)> {
        readings
            .into_iter()
            .filter_map(|(code, quote)| self.put(code, quote).map(|q| (code, q)))
            .collect()
    }

    /// Drop `codes` from the cache, keeping it a subset of the pool after
    /// the pool's own eviction sweep.
    pub fn evict(&self, codes: &[StockCode]) {
        for code in codes {
            self.quotes.remove(code);
        }
    }

    /// Number of cached codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the cache is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
