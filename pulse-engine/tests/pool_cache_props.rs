//! Property test for the pool/cache containment invariant: after an
//! eviction sweep, every cached code is still pooled.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use pulse_engine::{Cache, Pool};
use pulse_types::{CallerTag, PoolConfig, Quote, StockCode};
use rust_decimal_macros::dec;

fn arb_code() -> impl Strategy<Value = StockCode> {
    (100_000u32..999_999u32).prop_map(|n| StockCode::parse(&n.to_string()).unwrap())
}

proptest! {
    /// Whichever codes a TTL sweep evicts from the pool, evicting the same
    /// codes from the cache leaves every cached code still pooled.
    #[test]
    fn cache_stays_a_subset_of_the_pool_after_eviction(
        live_codes in proptest::collection::hash_set(arb_code(), 0..10),
        expiring_codes in proptest::collection::hash_set(arb_code(), 0..10),
    ) {
        let pool = Pool::new();
        let cache = Cache::new();
        let config = PoolConfig {
            ttl: Duration::from_secs(60),
            maintenance_interval: Duration::from_secs(1),
        };

        let t0 = Instant::now();
        // codes due to expire are enqueued stale; live codes are enqueued
        // just before the sweep, so they're still within the TTL window.
        for &code in &expiring_codes {
            pool.enqueue(code, CallerTag::Strategy, t0);
            cache.put(code, Quote::from_price_and_change(dec!(1), dec!(0), t0));
        }
        let t1 = t0 + config.ttl + Duration::from_secs(1);
        for &code in &live_codes {
            pool.enqueue(code, CallerTag::Strategy, t1);
            cache.put(code, Quote::from_price_and_change(dec!(1), dec!(0), t1));
        }

        let evicted = pool.evict_expired(t1, &config);
        cache.evict(&evicted);

        // codes enqueued only as "expiring" are gone from both structures.
        for &code in expiring_codes.difference(&live_codes) {
            prop_assert!(!pool.contains(code));
            prop_assert!(cache.get(code).is_none());
        }
        // the central invariant: every cached code is still pooled.
        for &code in live_codes.iter().chain(expiring_codes.iter()) {
            if cache.get(code).is_some() {
                prop_assert!(pool.contains(code));
            }
        }
    }
}
