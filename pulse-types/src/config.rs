use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-source update cadence, split by trading/non-trading hours.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateInterval {
    /// Sleep between ticks while inside a trading window.
    #[serde(with = "duration_secs")]
    pub trading_time: Duration,
    /// Sleep between ticks outside trading hours.
    #[serde(with = "duration_secs")]
    pub non_trading_time: Duration,
}

/// Rate/quota limits for a source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SourceLimits {
    /// Calls allowed per 60-second window (used by `slow`).
    pub per_minute: Option<u32>,
}

/// Headless-scraper specific timeouts (`timeouts.goto`/`timeouts.selector`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScrapeTimeouts {
    /// Milliseconds budgeted for page navigation.
    pub goto_ms: u64,
    /// Milliseconds budgeted for selector resolution.
    pub selector_ms: u64,
}

impl Default for ScrapeTimeouts {
    fn default() -> Self {
        Self {
            goto_ms: 10_000,
            selector_ms: 5_000,
        }
    }
}

/// Configuration for a single upstream data source (`data_sources.<name>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Primary URL or URL template for this source.
    pub main_url: Option<String>,
    /// Fallback URL tried once after a primary failure.
    pub backup_url: Option<String>,
    /// Licence/token query parameter required by some vendors.
    pub licence: Option<String>,
    /// Maximum codes processed per scheduler tick.
    pub batch_size: usize,
    /// Seconds to sleep between consecutive per-code requests (`fast`).
    #[serde(with = "duration_secs", rename = "rate_limit")]
    pub rate_limit: Duration,
    /// Per-minute call quota (`slow`).
    pub limits: SourceLimits,
    /// Trading/non-trading poll cadence.
    pub update_interval: UpdateInterval,
    /// Staleness window before a cached quote is considered expired.
    #[serde(with = "duration_secs")]
    pub staleness: Duration,
    /// Headless-browser timeouts (`scrape` only).
    pub timeouts: Option<ScrapeTimeouts>,
    /// URL template for the `scrape` source, e.g. `https://example/{}`.
    pub url_template: Option<String>,
}

impl SourceConfig {
    /// Default configuration for the `fast` source: per-code HTTP GET,
    /// 60s staleness, 1s between requests.
    #[must_use]
    pub fn fast_default() -> Self {
        Self {
            main_url: Some("https://fast.example/api/quote/{code}".to_owned()),
            backup_url: Some("https://fast-backup.example/api/quote/{code}".to_owned()),
            licence: None,
            batch_size: 50,
            rate_limit: Duration::from_secs(1),
            limits: SourceLimits::default(),
            update_interval: UpdateInterval {
                trading_time: Duration::from_secs(3),
                non_trading_time: Duration::from_secs(30),
            },
            staleness: Duration::from_secs(60),
            timeouts: None,
            url_template: None,
        }
    }

    /// Default configuration for the `slow` source: batched HTTP, per-minute
    /// quota, 60s staleness.
    #[must_use]
    pub fn slow_default() -> Self {
        Self {
            main_url: Some("https://slow.example/api/batch".to_owned()),
            backup_url: None,
            licence: Some("demo-licence".to_owned()),
            batch_size: 10,
            rate_limit: Duration::from_secs(0),
            limits: SourceLimits {
                per_minute: Some(60),
            },
            update_interval: UpdateInterval {
                trading_time: Duration::from_secs(5),
                non_trading_time: Duration::from_secs(60),
            },
            staleness: Duration::from_secs(60),
            timeouts: None,
            url_template: None,
        }
    }

    /// Default configuration for the `scrape` source: 180s staleness
    /// window, overridable per deployment.
    #[must_use]
    pub fn scrape_default() -> Self {
        Self {
            main_url: None,
            backup_url: None,
            licence: None,
            batch_size: 50,
            rate_limit: Duration::from_secs(0),
            limits: SourceLimits::default(),
            update_interval: UpdateInterval {
                trading_time: Duration::from_secs(10),
                non_trading_time: Duration::from_secs(120),
            },
            staleness: Duration::from_secs(180),
            timeouts: Some(ScrapeTimeouts::default()),
            url_template: Some("https://quote.example/{}".to_owned()),
        }
    }
}

/// Bus (message queue) configuration for the Scraper Coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Bus host.
    pub host: String,
    /// Bus port.
    pub port: u16,
    /// Logical database/namespace index.
    pub db: i64,
    /// High-priority request channel/list name.
    pub tasks_queue_high: String,
    /// Low-priority request channel/list name.
    pub tasks_queue_low: String,
    /// Reply/results channel name.
    pub results_queue: String,
    /// Hash key tracking outstanding (not-yet-completed) sessions.
    pub pending_tasks_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 6379,
            db: 0,
            tasks_queue_high: "pulse:tasks:high".to_owned(),
            tasks_queue_low: "pulse:tasks:low".to_owned(),
            results_queue: "pulse:results".to_owned(),
            pending_tasks_key: "pulse:pending_tasks".to_owned(),
        }
    }
}

/// HTTP/WebSocket bind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

/// Scraper session retry/timeout knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Maximum retry attempts before a session is abandoned.
    pub max_attempts: u32,
    /// Floor on session deadline regardless of batch size.
    #[serde(with = "duration_millis")]
    pub min_timeout: Duration,
    /// Per-code budget added to the deadline (`min_timeout.max(per_code * n)`).
    #[serde(with = "duration_millis")]
    pub per_code_budget: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_timeout: Duration::from_secs(10),
            per_code_budget: Duration::from_millis(1_500),
        }
    }
}

/// Interest-set TTL configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Entries older than this (no enqueue) are evicted along with their quote.
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// How often the pool-maintenance loop runs apply+evict.
    #[serde(with = "duration_secs")]
    pub maintenance_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7_200),
            maintenance_interval: Duration::from_secs(5),
        }
    }
}

/// Root configuration for the Pulse engine and server, loaded once at
/// startup. The `database` field is carried but not consumed by the
/// core — it configures the out-of-scope historical-data HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Connection string for the historical-data store (external collaborator).
    pub database: Option<String>,
    /// HTTP/WS bind address.
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-source configuration, keyed by source name (`fast`, `slow`, `scrape`).
    pub data_sources: BTreeMap<String, SourceConfig>,
    /// Optional message bus configuration for the scraper coordinator.
    pub queues: Option<QueueConfig>,
    /// Scraper session retry/timeout knobs.
    #[serde(default)]
    pub scraper: ScraperConfig,
    /// Interest-set TTL and maintenance cadence.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Path to the watch-list file (external collaborator).
    pub watchlist_path: Option<String>,
}

impl EngineConfig {
    /// Validate cross-field invariants not expressible in the type alone.
    ///
    /// # Errors
    /// Returns a descriptive string (wrapped by callers into
    /// `EngineError::ConfigInvalid`) when a required source is missing or a
    /// TTL value exceeds the configured maximum.
    pub fn validate(&self) -> Result<(), String> {
        for name in ["fast", "slow", "scrape"] {
            if !self.data_sources.contains_key(name) {
                return Err(format!("missing data_sources.{name} configuration"));
            }
        }
        const MAX_TTL: Duration = Duration::from_secs(14_400);
        if self.pool.ttl > MAX_TTL {
            return Err(format!(
                "pool.ttl {:?} exceeds maximum of {MAX_TTL:?}",
                self.pool.ttl
            ));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}
