use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_types::{QueueConfig, StockCode};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScraperError;
use crate::session::Priority;

/// Wire envelope pushed onto a priority queue, mirroring the original
/// scrape worker's task schema (`task_id`, `stocks`, `timestamp`,
/// `priority`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeTask {
    /// Session identifier, echoed back on the matching result.
    pub task_id: Uuid,
    /// Codes this worker should fetch.
    pub stocks: Vec<StockCode>,
    /// When the task was (most recently) issued; used for timeout sweeps.
    pub timestamp: DateTime<Utc>,
    /// `2` for high priority, `1` for low, matching the original numeric
    /// convention.
    pub priority: u8,
}

impl ScrapeTask {
    /// Build a new task for `stocks` at `priority`, timestamped now.
    #[must_use]
    pub fn new(task_id: Uuid, stocks: Vec<StockCode>, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            stocks,
            timestamp: now,
            priority: if priority == Priority::High { 2 } else { 1 },
        }
    }
}

/// One code's reading as reported by a scrape worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedQuote {
    /// The code this reading is for.
    pub code: StockCode,
    /// Last traded price.
    pub price: Decimal,
    /// Previous close, when the worker could read it.
    pub prev_close: Option<Decimal>,
    /// Vendor-computed percent change, when available.
    pub change_pct: Option<Decimal>,
}

/// Outcome of one scrape task, popped from the results queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Matches the originating [`ScrapeTask::task_id`].
    pub task_id: Uuid,
    /// Whether the worker succeeded.
    pub status: ResultStatus,
    /// Readings obtained, possibly a subset of the requested codes.
    #[serde(default)]
    pub data: Vec<ScrapedQuote>,
    /// Set on the final message of a session's reply stream: the worker has
    /// no more batches coming, whether or not every code was delivered.
    #[serde(default)]
    pub done: bool,
}

/// Success/failure tag on a [`ScrapeResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// The worker completed and `data` reflects what it found.
    Success,
    /// The worker failed outright; `data` is empty.
    Failure,
}

/// Bus operations the coordinator needs, independent of the transport.
/// Exists so the coordinator can be tested against an in-memory fake
/// without a live Redis instance.
#[async_trait]
pub trait ScraperBus: Send + Sync {
    /// Push `task` onto the appropriate priority queue and record it as
    /// pending.
    async fn submit(&self, task: &ScrapeTask) -> Result<(), ScraperError>;

    /// Non-blocking pop of the next available result, if any.
    async fn poll_result(&self) -> Result<Option<ScrapeResult>, ScraperError>;

    /// Remove `task_id` from the pending-tasks hash once its session
    /// reaches a terminal state.
    async fn clear_pending(&self, task_id: Uuid) -> Result<(), ScraperError>;

    /// Return every pending task older than `max_age`, for the
    /// timeout-requeue sweep.
    async fn timed_out_pending(&self, max_age: chrono::Duration) -> Result<Vec<ScrapeTask>, ScraperError>;
}

/// Redis-backed implementation of [`ScraperBus`], modeled directly on the
/// original worker pool's protocol: `LPUSH` onto `tasks_queue_high`/`_low`,
/// an `HSET` into a `pending_tasks` hash for outstanding-session tracking,
/// and `RPOP` from a single `results_queue`.
pub struct RedisBus {
    conn: ConnectionManager,
    config: QueueConfig,
}

impl RedisBus {
    /// Connect to Redis using `config`.
    ///
    /// # Errors
    /// Returns [`ScraperError::Redis`] if the connection cannot be
    /// established.
    pub async fn connect(config: QueueConfig) -> Result<Self, ScraperError> {
        let url = format!("redis://{}:{}/{}", config.host, config.port, config.db);
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, config })
    }

    fn queue_for(&self, priority: u8) -> &str {
        if priority > 1 {
            &self.config.tasks_queue_high
        } else {
            &self.config.tasks_queue_low
        }
    }
}

#[async_trait]
impl ScraperBus for RedisBus {
    async fn submit(&self, task: &ScrapeTask) -> Result<(), ScraperError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(task)?;
        let queue = self.queue_for(task.priority).to_owned();
        conn.lpush::<_, _, ()>(&queue, &payload).await?;
        conn.hset::<_, _, _, ()>(&self.config.pending_tasks_key, task.task_id.to_string(), &payload)
            .await?;
        Ok(())
    }

    async fn poll_result(&self) -> Result<Option<ScrapeResult>, ScraperError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.rpop(&self.config.results_queue, None).await?;
        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn clear_pending(&self, task_id: Uuid) -> Result<(), ScraperError> {
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(&self.config.pending_tasks_key, task_id.to_string())
            .await?;
        Ok(())
    }

    async fn timed_out_pending(&self, max_age: chrono::Duration) -> Result<Vec<ScrapeTask>, ScraperError> {
        let mut conn = self.conn.clone();
        let entries: Vec<(String, String)> = conn.hgetall(&self.config.pending_tasks_key).await?;
        let now = Utc::now();
        let mut timed_out = Vec::new();
        for (_, payload) in entries {
            let task: ScrapeTask = serde_json::from_str(&payload)?;
            if now.signed_duration_since(task.timestamp) > max_age {
                timed_out.push(task);
            }
        }
        Ok(timed_out)
    }
}
