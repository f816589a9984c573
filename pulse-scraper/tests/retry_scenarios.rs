//! End-to-end scrape-session retry scenario against an in-memory bus,
//! exercising `Coordinator::issue` → `sweep_expired` → `drain_one` the way
//! `pulse-engine`'s scrape-drain loop does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_scraper::{Coordinator, Priority, ResultStatus, ScrapeResult, ScrapeTask, ScrapedQuote, ScraperBus, ScraperError};
use pulse_types::{ScraperConfig, StockCode};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct InMemoryBus {
    submitted: Mutex<Vec<ScrapeTask>>,
    results: Mutex<Vec<ScrapeResult>>,
    cleared: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl ScraperBus for InMemoryBus {
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

/// A session missing one code at its deadline gets retried with only the
/// missing code, and completes once that retry's result arrives.
#[tokio::test]
async fn missing_code_is_retried_and_then_completes() {
    let bus = Arc::new(InMemoryBus::default());
    let config = ScraperConfig {
        max_attempts: 3,
        min_timeout: Duration::from_millis(40),
        per_code_budget: Duration::from_millis(0),
    };
    let coordinator = Coordinator::new(Arc::clone(&bus) as Arc<dyn ScraperBus>, config);

    let codes = [code("000001"), code("600519")];
    let id = coordinator.issue(&codes, Priority::High).await.unwrap();
    assert_eq!(bus.submitted.lock().await.len(), 1);

    bus.results.lock().await.push(ScrapeResult {
        task_id: id,
        status: ResultStatus::Success,
        data: vec![ScrapedQuote {
            code: codes[0],
            price: rust_decimal::Decimal::ONE,
            prev_close: None,
            change_pct: None,
        }],
        done: false,
    });
    let first_readings = coordinator.drain_one().await.unwrap();
    assert_eq!(first_readings.len(), 1);
    assert_eq!(coordinator.outstanding().await, 1, "session still waits on the second code");
    assert_eq!(bus.submitted.lock().await.len(), 1, "deadline not yet passed, no retry at this batch boundary");

    // The deadline has now passed; the next sweep resubmits the missing code.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let failures = coordinator.sweep_expired().await.unwrap();
    assert!(failures.is_empty(), "a retriable session must not report a failure yet");
    assert_eq!(bus.submitted.lock().await.len(), 2, "retry resubmits only the missing code");
    let retried = bus.submitted.lock().await[1].clone();
    assert_eq!(retried.stocks, vec![codes[1]]);

    bus.results.lock().await.push(ScrapeResult {
        task_id: id,
        status: ResultStatus::Success,
        data: vec![ScrapedQuote {
            code: codes[1],
            price: rust_decimal::Decimal::TWO,
            prev_close: None,
            change_pct: None,
        }],
        done: false,
    });
    let second_readings = coordinator.drain_one().await.unwrap();
    assert_eq!(second_readings.len(), 1);
    assert_eq!(coordinator.outstanding().await, 0);
    assert_eq!(bus.cleared.lock().await.len(), 1);
}

/// A batch arriving after the deadline has already passed triggers a retry
/// immediately, without waiting for the next `sweep_expired` pass.
#[tokio::test]
async fn late_batch_retries_at_the_batch_boundary_not_the_next_sweep() {
    let bus = Arc::new(InMemoryBus::default());
    let config = ScraperConfig {
        max_attempts: 3,
        min_timeout: Duration::from_millis(20),
        per_code_budget: Duration::from_millis(0),
    };
    let coordinator = Coordinator::new(Arc::clone(&bus) as Arc<dyn ScraperBus>, config);

    let codes = [code("000001"), code("600519")];
    let id = coordinator.issue(&codes, Priority::High).await.unwrap();

    // Let the deadline pass before the first batch shows up at all.
    tokio::time::sleep(Duration::from_millis(30)).await;
    bus.results.lock().await.push(ScrapeResult {
        task_id: id,
        status: ResultStatus::Success,
        data: vec![ScrapedQuote {
            code: codes[0],
            price: rust_decimal::Decimal::ONE,
            prev_close: None,
            change_pct: None,
        }],
        done: false,
    });
    coordinator.drain_one().await.unwrap();

    assert_eq!(
        bus.submitted.lock().await.len(),
        2,
        "the overdue batch boundary should have resubmitted the missing code itself"
    );
    assert_eq!(coordinator.outstanding().await, 1);
}

/// A session that never receives its remaining code across every retry
/// attempt is abandoned and reported as a failure exactly once.
#[tokio::test]
async fn session_exhausting_retries_is_reported_as_incomplete() {
    let bus = Arc::new(InMemoryBus::default());
    let config = ScraperConfig {
        max_attempts: 1,
        min_timeout: Duration::from_millis(0),
        per_code_budget: Duration::from_millis(0),
    };
    let coordinator = Coordinator::new(Arc::clone(&bus) as Arc<dyn ScraperBus>, config);

    let codes = [code("300750")];
    coordinator.issue(&codes, Priority::Low).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let failures = coordinator.sweep_expired().await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(coordinator.outstanding().await, 0);
    assert_eq!(bus.cleared.lock().await.len(), 1);

    // A further sweep finds nothing left to expire.
    let second_sweep = coordinator.sweep_expired().await.unwrap();
    assert!(second_sweep.is_empty());
}
