use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use pulse_core::RawReading;
use pulse_types::{EngineError, ScraperConfig, StockCode};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::bus::{ScrapeTask, ScraperBus};
use crate::session::{FetchSession, Priority, SessionState};

/// Coordinates outstanding scrape sessions against a [`ScraperBus`].
///
/// Tolerates duplicate and out-of-order result delivery: a code already
/// marked received on a session is simply ignored if it reappears, and a
/// result for an unknown (already completed/expired) `task_id` is dropped
/// silently rather than treated as an error.
pub struct Coordinator {
    bus: Arc<dyn ScraperBus>,
    config: ScraperConfig,
    sessions: Mutex<HashMap<Uuid, FetchSession>>,
}

impl Coordinator {
    /// Build a coordinator over `bus` using `config` for session timing.
    #[must_use]
    pub fn new(bus: Arc<dyn ScraperBus>, config: ScraperConfig) -> Self {
        Self {
            bus,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a new scrape session for `codes` at `priority`.
    ///
    /// # Errors
    /// Returns an error if the task cannot be pushed onto the bus.
    pub async fn issue(&self, codes: &[StockCode], priority: Priority) -> Result<Uuid, EngineError> {
        let now = Instant::now();
        let session = FetchSession::new(codes, priority, &self.config, now);
        let id = session.id;
        let task = ScrapeTask::new(id, codes.to_vec(), priority, Utc::now());
        self.bus.submit(&task).await?;
        self.sessions.lock().await.insert(id, session);
        Ok(id)
    }

    /// Drain one available result from the bus and merge it into its
    /// session, returning any newly-completed readings.
    ///
    /// A session is satisfied once `codes_remaining` is empty or the
    /// batch carries the `done` completion marker, whichever comes first.
    /// If neither holds but the session's deadline has already passed by
    /// this batch boundary, retry is evaluated immediately rather than
    /// waiting for the next [`sweep_expired`](Self::sweep_expired) pass.
    ///
    /// Returns an empty vector when the bus has no result waiting, when the
    /// result's `task_id` is unknown, or when the session is still waiting
    /// on more codes.
    ///
    /// # Errors
    /// Returns an error if the bus read itself fails (not if the result is
    /// simply absent), or if resubmitting a retried task fails.
    pub async fn drain_one(&self) -> Result<Vec<RawReading>, EngineError> {
        let Some(result) = self.bus.poll_result().await? else {
            return Ok(Vec::new());
        };
        let task_id = result.task_id;
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(&task_id) else {
            tracing::debug!(%task_id, "scrape result for unknown or already-closed session");
            return Ok(Vec::new());
        };
        let codes: Vec<StockCode> = result.data.iter().map(|q| q.code).collect();
        session.mark_received(&codes);
        if result.done {
            session.mark_done();
        }
        let readings = result
            .data
            .into_iter()
            .map(|q| RawReading {
                code: q.code,
                price: q.price,
                prev_close: q.prev_close,
                change_pct: q.change_pct,
            })
            .collect();
        let terminal = session.is_terminal();
        let expired = !terminal && session.is_expired(Instant::now());

        if terminal {
            sessions.remove(&task_id);
            drop(sessions);
            self.bus.clear_pending(task_id).await?;
        } else if expired {
            match decide_retry(sessions.get_mut(&task_id).expect("just checked present"), &self.config, Instant::now()) {
                RetryOutcome::Retried { remaining, priority } => {
                    let missing = remaining.len();
                    let task = ScrapeTask::new(task_id, remaining, priority, Utc::now());
                    self.bus.submit(&task).await?;
                    tracing::debug!(session = %task_id, missing, "retried scrape session at batch boundary");
                }
                RetryOutcome::Expired { missing } => {
                    sessions.remove(&task_id);
                    drop(sessions);
                    tracing::warn!(session = %task_id, missing, "scrape session abandoned after max retries at batch boundary");
                    drop_pending(&self.bus, task_id).await;
                }
            }
        }
        Ok(readings)
    }

    /// Sweep sessions whose current-attempt deadline has passed: retry
    /// (resubmitting only `codes_remaining`) if budget allows, otherwise
    /// drop the session and report it expired.
    ///
    /// # Errors
    /// Returns an error if resubmitting a retried task to the bus fails.
    pub async fn sweep_expired(&self) -> Result<Vec<EngineError>, EngineError> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let expired_ids: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| !s.is_terminal() && s.is_expired(now))
            .map(|(id, _)| *id)
            .collect();

        let mut failures = Vec::new();
        for id in expired_ids {
            let Some(session) = sessions.get_mut(&id) else {
                continue;
            };
            match decide_retry(session, &self.config, now) {
                RetryOutcome::Retried { remaining, priority } => {
                    let missing = remaining.len();
                    let task = ScrapeTask::new(id, remaining, priority, Utc::now());
                    self.bus.submit(&task).await?;
                    tracing::debug!(session = %id, missing, "retried scrape session");
                }
                RetryOutcome::Expired { missing } => {
                    sessions.remove(&id);
                    drop_pending(&self.bus, id).await;
                    failures.push(EngineError::ScrapeSessionIncomplete {
                        session_id: id.to_string(),
                        missing,
                    });
                }
            }
        }
        Ok(failures)
    }

    /// Number of sessions not yet in a terminal state, for metrics/logging.
    pub async fn outstanding(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|s| !matches!(s.state, SessionState::Completed | SessionState::Expired))
            .count()
    }
}

async fn drop_pending(bus: &Arc<dyn ScraperBus>, id: Uuid) {
    if let Err(e) = bus.clear_pending(id).await {
        tracing::warn!(session = %id, error = %e, "failed to clear pending entry for expired session");
    }
}

/// What to do about one session found past its deadline.
enum RetryOutcome {
    /// Retry budget remains; resubmit `remaining` at `priority`.
    Retried { remaining: Vec<StockCode>, priority: Priority },
    /// Retry budget exhausted; the session is abandoned with `missing`
    /// codes never received.
    Expired { missing: usize },
}

fn decide_retry(session: &mut FetchSession, config: &ScraperConfig, now: Instant) -> RetryOutcome {
    if session.retry(config, now) {
        RetryOutcome::Retried {
            remaining: session.codes_remaining.iter().copied().collect(),
            priority: session.priority,
        }
    } else {
        RetryOutcome::Expired {
            missing: session.codes_remaining.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ResultStatus, ScrapeResult, ScrapedQuote};
    use crate::error::ScraperError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct FakeBus {
        submitted: TokioMutex<Vec<ScrapeTask>>,
        results: TokioMutex<Vec<ScrapeResult>>,
        cleared: TokioMutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl ScraperBus for FakeBus {
        async fn submit(&self, task: &ScrapeTask) -> Result<(), ScraperError> {
            self.submitted.lock().await.push(task.clone());
            Ok(())
        }

        async fn poll_result(&self) -> Result<Option<ScrapeResult>, ScraperError> {
            Ok(self.results.lock().await.pop())
        }

        async fn clear_pending(&self, task_id: Uuid) -> Result<(), ScraperError> {
            self.cleared.lock().await.push(task_id);
            Ok(())
        }

        async fn timed_out_pending(&self, _max_age: chrono::Duration) -> Result<Vec<ScrapeTask>, ScraperError> {
            Ok(Vec::new())
        }
    }

    fn code(s: &str) -> StockCode {
        StockCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn issue_then_drain_completes_session() {
        let bus = Arc::new(FakeBus::default());
        let coordinator = Coordinator::new(bus.clone(), ScraperConfig::default());
        let codes = [code("000001")];
        let id = coordinator.issue(&codes, Priority::High).await.unwrap();

        bus.results.lock().await.push(ScrapeResult {
            task_id: id,
            status: ResultStatus::Success,
            data: vec![ScrapedQuote {
                code: codes[0],
                price: dec!(10.50),
                prev_close: Some(dec!(10.00)),
                change_pct: None,
            }],
            done: false,
        });

        let readings = coordinator.drain_one().await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(coordinator.outstanding().await, 0);
        assert_eq!(bus.cleared.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn completion_marker_closes_session_with_codes_still_missing() {
        let bus = Arc::new(FakeBus::default());
        let coordinator = Coordinator::new(bus.clone(), ScraperConfig::default());
        let codes = [code("000001"), code("600519")];
        let id = coordinator.issue(&codes, Priority::Low).await.unwrap();

        bus.results.lock().await.push(ScrapeResult {
            task_id: id,
            status: ResultStatus::Success,
            data: vec![ScrapedQuote {
                code: codes[0],
                price: dec!(10.50),
                prev_close: None,
                change_pct: None,
            }],
            done: true,
        });

        let readings = coordinator.drain_one().await.unwrap();
        assert_eq!(readings.len(), 1, "only the one delivered reading is reported");
        assert_eq!(coordinator.outstanding().await, 0, "the done marker closes the session early");
        assert_eq!(bus.cleared.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_task_id_is_dropped_silently() {
        let bus = Arc::new(FakeBus::default());
        let coordinator = Coordinator::new(bus.clone(), ScraperConfig::default());
        bus.results.lock().await.push(ScrapeResult {
            task_id: Uuid::new_v4(),
            status: ResultStatus::Success,
            data: vec![],
            done: false,
        });
        let readings = coordinator.drain_one().await.unwrap();
        assert!(readings.is_empty());
    }
}
