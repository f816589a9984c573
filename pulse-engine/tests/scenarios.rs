//! End-to-end scenarios composing `Pool`, `Cache`, `Scheduler`, and
//! `Gateway` the way `Engine::start` wires them, without a real network or
//! Redis dependency.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pulse_core::{DefaultAdapter, TradingCalendar};
use pulse_engine::{Cache, Gateway, Ingress, Pool, Scheduler};
use pulse_middleware::Skiplist;
use pulse_mock::MockClient;
use pulse_types::{CallerTag, Dashboard, PoolConfig, SourceConfig, StockCode, UpdateInterval};
use tokio::sync::{mpsc, watch};

struct AlwaysTrading;
impl TradingCalendar for AlwaysTrading {
    fn is_trading_minute(&self, _at: chrono::DateTime<chrono::Utc>) -> bool {
        true
    }
    fn is_trading_day(&self, _at: chrono::DateTime<chrono::Utc>) -> bool {
        true
    }
    fn nearest_prior_trading_day(&self, at: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
        at
    }
}

struct NeverTrading;
impl TradingCalendar for NeverTrading {
    fn is_trading_minute(&self, _at: chrono::DateTime<chrono::Utc>) -> bool {
        false
    }
    fn is_trading_day(&self, _at: chrono::DateTime<chrono::Utc>) -> bool {
        false
    }
    fn nearest_prior_trading_day(&self, at: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
        at
    }
}

fn code(s: &str) -> StockCode {
    StockCode::parse(s).unwrap()
}

fn fast_config_with(trading: Duration, non_trading: Duration) -> SourceConfig {
    let mut config = SourceConfig::fast_default();
    config.update_interval = UpdateInterval {
        trading_time: trading,
        non_trading_time: non_trading,
    };
    config
}

fn fast_scheduler(
    pool: Arc<Pool>,
    cache: Arc<Cache>,
    calendar: Arc<dyn TradingCalendar>,
    config: SourceConfig,
) -> Arc<Scheduler<MockClient, DefaultAdapter>> {
    Arc::new(Scheduler::new(
        "fast",
        Arc::new(MockClient::new("fast")),
        Arc::new(DefaultAdapter),
        pool,
        cache,
        calendar,
        Arc::new(Skiplist::new()),
        config,
        Arc::new(|p: &Pool| p.watchlisted()),
    ))
}

/// A single watchlisted code flows from pool seed through a spawned
/// scheduler's tick into the cache and out through the gateway to a
/// subscribed client.
#[tokio::test]
async fn single_code_fast_path_reaches_a_subscriber() {
    let pool = Arc::new(Pool::new());
    let cache = Arc::new(Cache::new());
    let gateway = Arc::new(Gateway::new());
    let ingress = Ingress::new(Arc::clone(&pool));

    ingress.enqueue([code("000001")], CallerTag::Watchlist);

    let config = fast_config_with(Duration::from_millis(5), Duration::from_millis(5));
    let scheduler = fast_scheduler(Arc::clone(&pool), Arc::clone(&cache), Arc::new(AlwaysTrading), config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (deltas_tx, mut deltas_rx) = mpsc::channel(4);
    let mut handle = scheduler.spawn(shutdown_rx.clone(), deltas_tx);

    let (_id, mut client_rx) = gateway.register(4);
    let deltas = tokio::time::timeout(Duration::from_secs(1), deltas_rx.recv())
        .await
        .expect("scheduler should tick within the timeout")
        .unwrap();
    gateway.broadcast(&deltas);

    let received = tokio::time::timeout(Duration::from_secs(1), client_rx.recv())
        .await
        .expect("gateway should have broadcast the tick's delta")
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, code("000001"));
    assert!(cache.get(code("000001")).is_some());

    handle.stop().await;
    let _ = shutdown_tx.send(true);
}

/// Once a fixture stops changing, a scheduler's later ticks stop producing
/// deltas even though it keeps running.
#[tokio::test]
async fn repeated_unchanged_fixture_suppresses_delta_after_first_tick() {
    let pool = Arc::new(Pool::new());
    let cache = Arc::new(Cache::new());
    pool.enqueue(code("600519"), CallerTag::Watchlist, Instant::now());

    let config = fast_config_with(Duration::from_millis(5), Duration::from_millis(5));
    let scheduler = fast_scheduler(Arc::clone(&pool), Arc::clone(&cache), Arc::new(AlwaysTrading), config);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (deltas_tx, mut deltas_rx) = mpsc::channel(8);
    let mut handle = scheduler.spawn(shutdown_rx, deltas_tx);

    let first = tokio::time::timeout(Duration::from_secs(1), deltas_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.len(), 1);

    // Give it a few more tick cycles; the fixture never moves so no further
    // delta should ever arrive.
    let second = tokio::time::timeout(Duration::from_millis(100), deltas_rx.recv()).await;
    assert!(second.is_err(), "unchanged fixture must not emit a second delta");

    handle.stop().await;
}

/// Eviction is pool-driven: once a code's TTL lapses, `Pool::evict_expired`
/// reports it and the cache drops it too, restoring cache ⊆ pool.
#[tokio::test]
async fn ttl_eviction_removes_code_from_pool_and_cache() {
    let pool = Arc::new(Pool::new());
    let cache = Arc::new(Cache::new());
    let t0 = Instant::now();
    pool.enqueue(code("300750"), CallerTag::Strategy, t0);
    cache.put(
        code("300750"),
        pulse_types::Quote::from_price_and_change(rust_decimal::Decimal::ONE, rust_decimal::Decimal::ZERO, t0),
    );

    let config = PoolConfig {
        ttl: Duration::from_millis(0),
        maintenance_interval: Duration::from_secs(1),
    };
    let evicted = pool.evict_expired(t0 + Duration::from_millis(1), &config);
    cache.evict(&evicted);

    assert!(pool.is_empty());
    assert!(cache.is_empty());
}

/// Outside trading hours a scheduler configured with a long non-trading
/// interval never produces a tick within a short window, while the same
/// scheduler under an always-trading calendar ticks promptly.
#[tokio::test]
async fn trading_hours_gate_the_tick_cadence() {
    let pool = Arc::new(Pool::new());
    let cache = Arc::new(Cache::new());
    pool.enqueue(code("000001"), CallerTag::Watchlist, Instant::now());

    let config = fast_config_with(Duration::from_millis(5), Duration::from_secs(30));
    let scheduler = fast_scheduler(pool, cache, Arc::new(NeverTrading), config);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (deltas_tx, mut deltas_rx) = mpsc::channel(4);
    let mut handle = scheduler.spawn(shutdown_rx, deltas_tx);

    let outcome = tokio::time::timeout(Duration::from_millis(150), deltas_rx.recv()).await;
    assert!(outcome.is_err(), "non-trading cadence should not have ticked yet");

    handle.stop().await;
}

/// A `refresh_realtime_data`-style request resolves a dashboard to its
/// pooled codes, force-enqueues them, and a snapshot can be served straight
/// from the cache without waiting for the next scheduled tick.
#[tokio::test]
async fn refresh_request_snapshots_cached_codes_for_its_dashboard() {
    let pool = Arc::new(Pool::new());
    let cache = Arc::new(Cache::new());
    let ingress = Ingress::new(Arc::clone(&pool));

    ingress.enqueue([code("000001")], CallerTag::Watchlist);
    cache.put(
        code("000001"),
        pulse_types::Quote::from_price_and_change(rust_decimal::Decimal::ONE, rust_decimal::Decimal::ZERO, Instant::now()),
    );

    let codes = ingress.codes_for_refresh(Dashboard::WatchlistDashboard);
    assert_eq!(codes, vec![code("000001")]);

    ingress.enqueue(codes.iter().copied(), CallerTag::Refresh);

    let snapshot: Vec<_> = codes.into_iter().filter_map(|c| cache.get(c).map(|q| (c, q))).collect();
    assert_eq!(snapshot.len(), 1);
}
