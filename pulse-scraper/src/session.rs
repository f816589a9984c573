use std::collections::HashSet;
use std::time::{Duration, Instant};

use pulse_types::{ScraperConfig, StockCode};
use uuid::Uuid;

/// Relative urgency of a scrape batch; maps to the bus's two priority
/// queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Codes requested via a live refresh or watchlist path.
    High,
    /// Background/bootstrap scrape traffic.
    Low,
}

/// Lifecycle state of a [`FetchSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Task pushed to the bus; no results seen yet.
    Issued,
    /// At least one code has been received; others still outstanding.
    Receiving,
    /// The session timed out and was resubmitted with its remaining codes.
    Retrying,
    /// Every requested code was received.
    Completed,
    /// The session exhausted its retry budget without completing.
    Expired,
}

/// Tracks one outstanding scrape request across possibly multiple retries.
///
/// Only `codes_remaining` is ever resubmitted on retry — codes already
/// received are never re-requested. The deadline is
/// `max(min_timeout, per_code_budget * codes_total)`, floored so that small
/// batches still get a reasonable timeout.
#[derive(Debug, Clone)]
pub struct FetchSession {
    /// Unique identifier shared with the bus task/result envelope.
    pub id: Uuid,
    /// Priority this session (and any retries) is submitted under.
    pub priority: Priority,
    /// Codes originally requested.
    pub codes_total: usize,
    /// Codes not yet received for the current attempt.
    pub codes_remaining: HashSet<StockCode>,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Retry attempts made so far (0 on first issue).
    pub attempt: u32,
    /// Deadline for the current attempt.
    pub deadline: Instant,
}

impl FetchSession {
    /// Start a new session for `codes` at `priority`, timestamped `now`.
    #[must_use]
    pub fn new(codes: &[StockCode], priority: Priority, config: &ScraperConfig, now: Instant) -> Self {
        let codes_remaining: HashSet<StockCode> = codes.iter().copied().collect();
        let deadline = now + Self::budget(codes_remaining.len(), config);
        Self {
            id: Uuid::new_v4(),
            priority,
            codes_total: codes_remaining.len(),
            codes_remaining,
            state: SessionState::Issued,
            attempt: 0,
            deadline,
        }
    }

    fn budget(code_count: usize, config: &ScraperConfig) -> Duration {
        config
            .min_timeout
            .max(config.per_code_budget.saturating_mul(u32::try_from(code_count).unwrap_or(u32::MAX)))
    }

    /// Record that `codes` were received; transitions to
    /// [`SessionState::Receiving`] or [`SessionState::Completed`].
    ///
    /// Codes not present in `codes_remaining` (duplicates, already-received,
    /// or out-of-order arrivals from a prior attempt) are ignored.
    pub fn mark_received(&mut self, codes: &[StockCode]) {
        for code in codes {
            self.codes_remaining.remove(code);
        }
        self.state = if self.codes_remaining.is_empty() {
            SessionState::Completed
        } else {
            SessionState::Receiving
        };
    }

    /// Record that the worker's completion marker arrived for this attempt:
    /// no more batches are coming, so the session is satisfied regardless
    /// of any codes still outstanding.
    pub fn mark_done(&mut self) {
        self.state = SessionState::Completed;
    }

    /// Whether the session's current-attempt deadline has passed.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Attempt to retry the session for its still-outstanding codes.
    ///
    /// Returns `true` if a retry was issued (caller must resubmit
    /// `codes_remaining` to the bus); returns `false` and transitions to
    /// [`SessionState::Expired`] once `max_attempts` is exhausted.
    pub fn retry(&mut self, config: &ScraperConfig, now: Instant) -> bool {
        if self.attempt + 1 >= config.max_attempts {
            self.state = SessionState::Expired;
            return false;
        }
        self.attempt += 1;
        self.state = SessionState::Retrying;
        self.deadline = now + Self::budget(self.codes_remaining.len(), config);
        true
    }

    /// Whether this session is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Completed | SessionState::Expired)
    }
}
