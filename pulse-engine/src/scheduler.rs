use std::sync::Arc;
use std::time::Instant;

use pulse_core::{EngineHandle, SourceAdapter, TradingCalendar, UpstreamClient};
use pulse_middleware::Skiplist;
use pulse_types::{Quote, SourceConfig, StockCode};
use tokio::sync::{mpsc, oneshot, watch};

use crate::cache::Cache;
use crate::pool::Pool;

/// Selects which pooled codes a scheduler tick should fetch.
pub type CodeSelector = Arc<dyn Fn(&Pool) -> Vec<StockCode> + Send + Sync>;

/// Drives one source's fetch cadence: wakes on its trading/non-trading
/// interval, asks the pool which codes it owns, fetches, normalizes, and
/// merges into the cache — forwarding any resulting deltas downstream.
///
/// Driven by a `tokio::select!` loop over a `watch::Receiver<bool>`
/// shutdown signal and a timer, returning an [`EngineHandle`] the engine
/// can stop gracefully.
pub struct Scheduler<C, A> {
    name: &'static str,
    client: Arc<C>,
    adapter: Arc<A>,
    pool: Arc<Pool>,
    cache: Arc<Cache>,
    calendar: Arc<dyn TradingCalendar>,
    blacklist: Arc<Skiplist>,
    config: SourceConfig,
    select_codes: CodeSelector,
}

impl<C, A> Scheduler<C, A>
where
    C: UpstreamClient + 'static,
    A: SourceAdapter + 'static,
{
    /// Build a scheduler for one source.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        client: Arc<C>,
        adapter: Arc<A>,
        pool: Arc<Pool>,
        cache: Arc<Cache>,
        calendar: Arc<dyn TradingCalendar>,
        blacklist: Arc<Skiplist>,
        config: SourceConfig,
        select_codes: CodeSelector,
    ) -> Self {
        Self {
            name,
            client,
            adapter,
            pool,
            cache,
            calendar,
            blacklist,
            config,
            select_codes,
        }
    }

    fn tick_interval(&self) -> std::time::Duration {
        let now = chrono::Utc::now();
        if let Some(wait) = self.calendar.time_until_next_open(now) {
            return wait;
        }
        if self.calendar.is_trading_minute(now) {
            self.config.update_interval.trading_time
        } else {
            self.config.update_interval.non_trading_time
        }
    }

    /// Whether `code` needs a fresh read: either never cached, or cached
    /// longer ago than this source's staleness window allows.
    fn is_expired(&self, code: StockCode, now: Instant) -> bool {
        match self.cache.get(code) {
            None => true,
            Some(quote) => now.saturating_duration_since(quote.last_updated) > self.config.staleness,
        }
    }

    async fn tick(&self, deltas_tx: &mpsc::Sender<Vec<(StockCode, Quote)>>) {
        let all_codes = (self.select_codes)(&self.pool);
        let tick_start = Instant::now();
        let codes: Vec<StockCode> = all_codes
            .into_iter()
            .filter(|c| !self.blacklist.is_skipped(*c, self.config.staleness))
            .filter(|c| self.is_expired(*c, tick_start))
            .collect();
        if codes.is_empty() {
            return;
        }
        match self.client.fetch(&codes).await {
            Ok(readings) => {
                let now = Instant::now();
                let pairs: Vec<(StockCode, Quote)> = readings
                    .into_iter()
                    .map(|reading| {
                        let code = reading.code;
                        self.blacklist.clear(&code);
                        self.adapter.normalize(reading, now)
                    })
                    .collect();
                let deltas = self.cache.put_many(pairs);
                if !deltas.is_empty() {
                    let _ = deltas_tx.try_send(deltas);
                }
            }
            Err(pulse_types::EngineError::PermanentUpstream { msg, .. }) => {
                tracing::warn!(source = self.name, %msg, "batch permanently failed, blacklisting requested codes");
                for code in codes {
                    self.blacklist.mark(code);
                }
            }
            Err(e) => {
                tracing::debug!(source = self.name, error = %e, "fetch failed transiently, will retry next tick");
            }
        }
    }

    /// Spawn the loop, returning a handle for graceful shutdown.
    ///
    /// `shutdown` is the engine-wide shutdown flag shared by every loop;
    /// the returned [`EngineHandle`]'s own `stop()` is an additional,
    /// scheduler-scoped way to end just this task.
    pub fn spawn(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        deltas_tx: mpsc::Sender<Vec<(StockCode, Quote)>>,
    ) -> EngineHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let scheduler = self;
        let join = tokio::spawn(async move {
            loop {
                let interval = scheduler.tick_interval();
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    () = tokio::time::sleep(interval) => {
                        scheduler.tick(&deltas_tx).await;
                    }
                }
            }
        });
        EngineHandle::new(join, stop_tx)
    }
}
