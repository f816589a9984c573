//! pulse-mock
//!
//! Deterministic mock upstream clients, for CI-safe exercising of the
//! engine, scheduler, and gateway without real network access.
#![warn(missing_docs)]

mod fixtures;

use async_trait::async_trait;
use pulse_core::{RawReading, UpstreamClient};
use pulse_types::{EngineError, StockCode};

pub use fixtures::{FAIL_CODE, TIMEOUT_CODE, fixture_for};

/// Mock upstream client backed by static fixtures.
///
/// Honors the two reserved sentinel codes ([`FAIL_CODE`], [`TIMEOUT_CODE`])
/// so tests can exercise the permanent- and transient-failure paths
/// end-to-end; every other code returns a deterministic fixture reading.
pub struct MockClient {
    name: &'static str,
}

impl MockClient {
    /// Build a mock client reporting as source `name` (`fast`, `slow`, or
    /// `scrape`) in its errors.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl UpstreamClient for MockClient {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, codes: &[StockCode]) -> Result<Vec<RawReading>, EngineError> {
        let mut readings = Vec::with_capacity(codes.len());
        for &code in codes {
            match code.as_str() {
                FAIL_CODE => {
                    return Err(EngineError::permanent(self.name, "forced failure fixture"));
                }
                TIMEOUT_CODE => {
                    return Err(EngineError::transient(self.name, "forced timeout fixture"));
                }
                _ => {
                    let (price, prev_close) = fixture_for(code);
                    readings.push(RawReading {
                        code,
                        price,
                        prev_close: Some(prev_close),
                        change_pct: None,
                    });
                }
            }
        }
        Ok(readings)
    }
}
