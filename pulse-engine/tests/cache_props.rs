//! Property test for the cache's merge-by-recency invariant, independent of
//! the order readings arrive in.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use pulse_engine::Cache;
use pulse_types::{Quote, StockCode, round_two_places};
use rust_decimal::Decimal;

fn arb_reading() -> impl Strategy<Value = (i64, i64, u64)> {
    (0i64..100_000, -10_000i64..10_000, 0u64..1_000_000)
}

proptest! {
    /// Whatever order a batch of readings for one code is applied in, the
    /// cache converges to the value carried by whichever reading has the
    /// latest `last_updated` (ties settled by application order, since an
    /// equal-or-newer timestamp always overwrites).
    #[test]
    fn cache_converges_to_latest_by_last_updated(
        readings in proptest::collection::vec(arb_reading(), 1..50)
    ) {
        let cache = Cache::new();
        let base = Instant::now();
        let code = StockCode::parse("000001").unwrap();

        let mut winner: Option<(u64, Decimal, Decimal)> = None;
        for &(price_cents, pct_hundredths, offset_ms) in &readings {
            let price = Decimal::new(price_cents, 2);
            let pct = Decimal::new(pct_hundredths, 2);
            let quote = Quote::from_price_and_change(price, pct, base + Duration::from_millis(offset_ms));
            cache.put(code, quote);
            if winner.is_none_or(|(o, _, _)| offset_ms >= o) {
                winner = Some((offset_ms, price, round_two_places(pct)));
            }
        }

        let (offset_ms, price, pct) = winner.unwrap();
        let cached = cache.get(code).unwrap();
        prop_assert_eq!(cached.last_updated, base + Duration::from_millis(offset_ms));
        prop_assert_eq!(cached.price, price);
        prop_assert_eq!(cached.change_pct, pct);
    }

    /// A single `put` never moves `last_updated` backwards relative to
    /// what's already cached.
    #[test]
    fn put_never_regresses_last_updated(
        first_offset_ms in 0u64..1_000_000,
        second_offset_ms in 0u64..1_000_000,
    ) {
        let cache = Cache::new();
        let base = Instant::now();
        let code = StockCode::parse("600519").unwrap();

        let first = Quote::from_price_and_change(Decimal::ONE, Decimal::ZERO, base + Duration::from_millis(first_offset_ms));
        cache.put(code, first);
        let second = Quote::from_price_and_change(Decimal::TWO, Decimal::ONE, base + Duration::from_millis(second_offset_ms));
        cache.put(code, second);

        let expected = base + Duration::from_millis(first_offset_ms.max(second_offset_ms));
        prop_assert_eq!(cache.get(code).unwrap().last_updated, expected);
    }
}
