use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::{RawReading, UpstreamClient};
use pulse_scraper::{Coordinator, Priority};
use pulse_types::{EngineError, StockCode};

/// Forwards codes to the out-of-process scraper coordinator instead of
/// fetching directly.
///
/// Unlike `fast`/`slow`, a scrape "fetch" never blocks on a network round
/// trip: it enqueues a session and returns immediately with an empty
/// reading set. Actual readings surface later when the scheduler drains
/// the coordinator's results queue and merges them into the cache directly.
pub struct ScrapeClient {
    coordinator: Arc<Coordinator>,
    priority: Priority,
}

impl ScrapeClient {
    /// Build a client issuing sessions at `priority` against `coordinator`.
    #[must_use]
    pub fn new(coordinator: Arc<Coordinator>, priority: Priority) -> Self {
        Self {
            coordinator,
            priority,
        }
    }
}

#[async_trait]
impl UpstreamClient for ScrapeClient {
    fn name(&self) -> &'static str {
        "scrape"
    }

    async fn fetch(&self, codes: &[StockCode]) -> Result<Vec<RawReading>, EngineError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        self.coordinator.issue(codes, self.priority).await?;
        Ok(Vec::new())
    }
}
