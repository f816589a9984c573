use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A point-in-time price reading for a stock code.
///
/// `last_updated` is a monotonic instant (not wall-clock time), so
/// comparisons for freshness and merge ordering are immune to clock skew.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// Last traded price.
    pub price: Decimal,
    /// Percent change from previous close, rounded to two decimal places.
    pub change_pct: Decimal,
    /// When this reading was recorded, for freshness and merge-order checks.
    pub last_updated: Instant,
}

impl Quote {
    /// Build a quote from a price and previous close, deriving `change_pct`.
    ///
    /// `change_pct` is `(price - prev_close) / prev_close * 100`, rounded
    /// half-away-from-zero to two places; zero when `prev_close` is zero.
    #[must_use]
    pub fn from_price_and_prev_close(price: Decimal, prev_close: Decimal, now: Instant) -> Self {
        let change_pct = derive_change_pct(price, prev_close);
        Self {
            price,
            change_pct,
            last_updated: now,
        }
    }

    /// Build a quote from a price and an upstream-provided change percentage,
    /// which is authoritative over any derived value.
    #[must_use]
    pub fn from_price_and_change(price: Decimal, change_pct: Decimal, now: Instant) -> Self {
        Self {
            price,
            change_pct: round_two_places(change_pct),
            last_updated: now,
        }
    }

    /// The `(price, change_pct)` pair used for delta comparisons; excludes
    /// `last_updated` so re-emitting an unchanged value is a no-op.
    #[must_use]
    pub fn value_key(&self) -> (Decimal, Decimal) {
        (self.price, self.change_pct)
    }
}

/// Round half-away-from-zero to two decimal places.
#[must_use]
pub fn round_two_places(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Derive `change_pct` from price and previous close.
#[must_use]
pub fn derive_change_pct(price: Decimal, prev_close: Decimal) -> Decimal {
    if prev_close.is_zero() {
        return Decimal::ZERO;
    }
    round_two_places((price - prev_close) / prev_close * Decimal::ONE_HUNDRED)
}

/// Wire representation of a [`Quote`] for the `realtime_update` event
/// payload: field names match the original source's JSON shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealtimeQuoteWire {
    /// Last traded price.
    #[serde(rename = "RealtimePrice")]
    pub realtime_price: Decimal,
    /// Percent change from previous close.
    #[serde(rename = "RealtimeChange")]
    pub realtime_change: Decimal,
}

impl From<Quote> for RealtimeQuoteWire {
    fn from(q: Quote) -> Self {
        Self {
            realtime_price: q.price,
            realtime_change: q.change_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn derives_change_pct() {
        let pct = derive_change_pct(dec!(10.10), dec!(10.00));
        assert_eq!(pct, dec!(1.00));
    }

    #[test]
    fn zero_prev_close_yields_zero() {
        let pct = derive_change_pct(dec!(10.10), dec!(0));
        assert_eq!(pct, Decimal::ZERO);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_two_places(dec!(1.005)), dec!(1.01));
        assert_eq!(round_two_places(dec!(-1.005)), dec!(-1.01));
    }
}
