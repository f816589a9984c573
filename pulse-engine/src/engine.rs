use std::sync::Arc;
use std::time::Instant;

use pulse_core::{DefaultAdapter, EngineHandle, ShanghaiShenzhenCalendar, SourceAdapter};
use pulse_middleware::Skiplist;
use pulse_scraper::{Coordinator, Priority, RedisBus};
use pulse_sources::{FastClient, ScrapeClient, SlowClient};
use pulse_types::EngineConfig;
use tokio::sync::{mpsc, watch, Mutex};

use crate::cache::Cache;
use crate::gateway::Gateway;
use crate::ingress::Ingress;
use crate::pool::Pool;
use crate::scheduler::Scheduler;

const DELTA_CHANNEL_BUFFER: usize = 256;
const SCRAPE_DRAIN_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);
const SCRAPE_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// Wires the pool, cache, per-source schedulers, scrape coordinator, and
/// subscription gateway into one engine with a single shutdown switch.
///
/// Construction (`new`) only assembles shared state; it talks to neither
/// the network nor Redis. [`start`](Self::start) does that, and is
/// idempotent: calling it again while already running is a no-op.
pub struct Engine {
    /// Interest-set state, shared with request handlers via [`Ingress`].
    pub pool: Arc<Pool>,
    /// Realtime quote cache, shared with request handlers directly.
    pub cache: Arc<Cache>,
    /// Subscription fan-out, shared with the websocket layer.
    pub gateway: Arc<Gateway>,
    /// Front door onto the pool for request handlers.
    pub ingress: Ingress,
    config: EngineConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<EngineHandle>>,
}

impl Engine {
    /// Assemble engine state from `config`. Does not start any background
    /// task; call [`start`](Self::start) for that.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let pool = Arc::new(Pool::new());
        let cache = Arc::new(Cache::new());
        let gateway = Arc::new(Gateway::new());
        let ingress = Ingress::new(Arc::clone(&pool));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            pool,
            cache,
            gateway,
            ingress,
            config,
            shutdown_tx,
            shutdown_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Start the fast/slow/scrape schedulers, the scrape-result drain loop,
    /// and the gateway broadcaster.
    ///
    /// Idempotent: a second call observes `handles` already populated and
    /// returns immediately without spawning a duplicate set of tasks.
    ///
    /// # Errors
    /// Returns [`pulse_types::EngineError::ConfigInvalid`] if `config`
    /// fails [`EngineConfig::validate`](pulse_types::EngineConfig::validate),
    /// or if connecting to the scrape message bus fails.
    pub async fn start(&self) -> Result<(), pulse_types::EngineError> {
        let mut handles = self.handles.lock().await;
        if !handles.is_empty() {
            return Ok(());
        }
        self.config
            .validate()
            .map_err(pulse_types::EngineError::ConfigInvalid)?;

        let fast_config = self.config.data_sources["fast"].clone();
        let slow_config = self.config.data_sources["slow"].clone();
        let scrape_config = self.config.data_sources["scrape"].clone();

        let bus = RedisBus::connect(self.config.queues.clone().unwrap_or_default()).await?;
        let coordinator = Arc::new(Coordinator::new(Arc::new(bus), self.config.scraper));

        let calendar: Arc<dyn pulse_core::TradingCalendar> = Arc::new(ShanghaiShenzhenCalendar);
        let (deltas_tx, deltas_rx) = mpsc::channel(DELTA_CHANNEL_BUFFER);

        let fast_scheduler = Arc::new(Scheduler::new(
            "fast",
            Arc::new(FastClient::new(fast_config)),
            Arc::new(DefaultAdapter),
            Arc::clone(&self.pool),
            Arc::clone(&self.cache),
            Arc::clone(&calendar),
            Arc::new(Skiplist::new()),
            self.config.data_sources["fast"].clone(),
            Arc::new(|p: &Pool| p.watchlisted()),
        ));
        let slow_scheduler = Arc::new(Scheduler::new(
            "slow",
            Arc::new(SlowClient::new(slow_config)),
            Arc::new(DefaultAdapter),
            Arc::clone(&self.pool),
            Arc::clone(&self.cache),
            Arc::clone(&calendar),
            Arc::new(Skiplist::new()),
            self.config.data_sources["slow"].clone(),
            Arc::new(|p: &Pool| p.non_watchlisted()),
        ));
        let scrape_scheduler = Arc::new(Scheduler::new(
            "scrape",
            Arc::new(ScrapeClient::new(Arc::clone(&coordinator), Priority::Low)),
            Arc::new(DefaultAdapter),
            Arc::clone(&self.pool),
            Arc::clone(&self.cache),
            Arc::clone(&calendar),
            Arc::new(Skiplist::new()),
            scrape_config,
            Arc::new(|p: &Pool| p.non_watchlisted()),
        ));

        handles.push(fast_scheduler.spawn(self.shutdown_rx.clone(), deltas_tx.clone()));
        handles.push(slow_scheduler.spawn(self.shutdown_rx.clone(), deltas_tx.clone()));
        handles.push(scrape_scheduler.spawn(self.shutdown_rx.clone(), deltas_tx));
        handles.push(Arc::clone(&self.gateway).spawn(deltas_rx, self.shutdown_rx.clone()));
        handles.push(spawn_scrape_drain(Arc::clone(&coordinator), Arc::clone(&self.cache), Arc::clone(&self.gateway), self.shutdown_rx.clone()));
        handles.push(spawn_pool_maintenance(
            Arc::clone(&self.pool),
            Arc::clone(&self.cache),
            self.config.pool,
            self.shutdown_rx.clone(),
        ));
        Ok(())
    }

    /// Flip the shared shutdown flag and await every spawned task.
    /// Idempotent: safe to call more than once, or before [`start`](Self::start).
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut handles = self.handles.lock().await;
        for mut handle in handles.drain(..) {
            handle.stop().await;
        }
    }
}

/// Periodically evicts expired pool entries and drops the matching cache
/// entries, keeping cache ⊆ pool as entries age out.
fn spawn_pool_maintenance(
    pool: Arc<Pool>,
    cache: Arc<Cache>,
    config: pulse_types::PoolConfig,
    mut shutdown: watch::Receiver<bool>,
) -> EngineHandle {
    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                () = tokio::time::sleep(config.maintenance_interval) => {
                    let evicted = pool.evict_expired(Instant::now(), &config);
                    if !evicted.is_empty() {
                        cache.evict(&evicted);
                        tracing::debug!(count = evicted.len(), "evicted expired pool entries");
                    }
                }
            }
        }
    });
    EngineHandle::new(join, stop_tx)
}

fn spawn_scrape_drain(
    coordinator: Arc<Coordinator>,
    cache: Arc<Cache>,
    gateway: Arc<Gateway>,
    mut shutdown: watch::Receiver<bool>,
) -> EngineHandle {
    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
    let join = tokio::spawn(async move {
        let mut next_sweep = Instant::now() + SCRAPE_SWEEP_INTERVAL;
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                () = tokio::time::sleep(SCRAPE_DRAIN_INTERVAL) => {
                    match coordinator.drain_one().await {
                        Ok(readings) if !readings.is_empty() => {
                            let now = Instant::now();
                            let pairs: Vec<_> = readings
                                .into_iter()
                                .map(|reading| DefaultAdapter.normalize(reading, now))
                                .collect();
                            let deltas = cache.put_many(pairs);
                            if !deltas.is_empty() {
                                gateway.broadcast(&deltas);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!(error = %e, "scrape drain failed transiently"),
                    }
                    if Instant::now() >= next_sweep {
                        next_sweep = Instant::now() + SCRAPE_SWEEP_INTERVAL;
                        match coordinator.sweep_expired().await {
                            Ok(failures) => {
                                for failure in failures {
                                    tracing::warn!(error = %failure, "scrape session abandoned after max retries");
                                }
                            }
                            Err(e) => tracing::warn!(error = %e, "scrape sweep failed"),
                        }
                    }
                }
            }
        }
    });
    EngineHandle::new(join, stop_tx)
}
