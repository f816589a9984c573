use std::time::Instant;

use async_trait::async_trait;
use pulse_types::{EngineError, Quote, StockCode};
use rust_decimal::Decimal;

/// A single provider-native reading before normalization.
///
/// Some providers supply an authoritative `change_pct` directly (mairui);
/// others only supply `prev_close`, from which `change_pct` is derived
/// (tushare). At least one of the two must be present for a meaningful
/// reading, but the type does not enforce this to keep adapters simple —
/// [`SourceAdapter::normalize`] treats a missing `prev_close` as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    /// The stock code this reading is for.
    pub code: StockCode,
    /// Last traded price, already parsed as a decimal.
    pub price: Decimal,
    /// Previous close, when the provider exposes it.
    pub prev_close: Option<Decimal>,
    /// Provider-computed percent change, when the provider exposes it
    /// directly (preferred over deriving it from `prev_close`).
    pub change_pct: Option<Decimal>,
}

/// Transport-level connection to one upstream data source.
///
/// Implementors own the HTTP/headless-browser details (URLs, licence
/// tokens, retries against a backup host); they return raw, unnormalized
/// readings for the requested codes. Fetching is best-effort: a source
/// that only answers for half the requested codes returns exactly those.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Stable lowercase name (`fast`, `slow`, `scrape`), used in log fields
    /// and the rate-limiter/blacklist keys.
    fn name(&self) -> &'static str;

    /// Fetch raw readings for the given codes.
    ///
    /// # Errors
    /// Returns [`EngineError::TransientUpstream`] on a timeout or 5xx, or
    /// [`EngineError::PermanentUpstream`] on a 4xx or unparseable payload.
    async fn fetch(&self, codes: &[StockCode]) -> Result<Vec<RawReading>, EngineError>;
}

/// Normalizes a provider's [`RawReading`] into a canonical [`Quote`].
///
/// Separating this from [`UpstreamClient`] mirrors the shape of the upstream
/// system's per-vendor adapter functions: transport and normalization vary
/// independently, and a single normalizer can serve several transports that
/// happen to agree on their raw shape.
pub trait SourceAdapter: Send + Sync {
    /// Convert one raw reading into a `(code, quote)` pair, stamping the
    /// quote with `now`.
    fn normalize(&self, reading: RawReading, now: Instant) -> (StockCode, Quote);
}

/// The default normalizer: prefers an upstream-supplied `change_pct`,
/// falling back to deriving it from `prev_close` (zero if absent).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAdapter;

impl SourceAdapter for DefaultAdapter {
    fn normalize(&self, reading: RawReading, now: Instant) -> (StockCode, Quote) {
        let quote = match reading.change_pct {
            Some(pct) => Quote::from_price_and_change(reading.price, pct, now),
            None => Quote::from_price_and_prev_close(
                reading.price,
                reading.prev_close.unwrap_or(Decimal::ZERO),
                now,
            ),
        };
        (reading.code, quote)
    }
}
