use std::sync::Mutex;
use std::time::{Duration, Instant};

use pulse_types::EngineError;

/// Pacing strategy a [`QuotaGate`] enforces.
#[derive(Debug, Clone, Copy)]
pub enum QuotaStrategy {
    /// Minimum gap between consecutive calls (the `fast` source's
    /// `rate_limit` knob).
    Interval(Duration),
    /// A fixed budget of calls per rolling window (the `slow` source's
    /// `limits.per_minute` knob).
    PerWindow {
        /// Calls allowed per window.
        limit: u32,
        /// Window length.
        window: Duration,
    },
}

struct GateState {
    last_call: Option<Instant>,
    window_start: Instant,
    calls_in_window: u32,
}

/// Rate limiter guarding one source's outbound calls.
///
/// Mirrors the upstream quota-aware connector pattern: a call site asks
/// [`try_acquire`](Self::try_acquire) before issuing a request and backs off
/// on [`EngineError::TransientUpstream`] rather than treating it as a
/// fetch failure.
pub struct QuotaGate {
    name: &'static str,
    strategy: QuotaStrategy,
    state: Mutex<GateState>,
}

impl QuotaGate {
    /// Build a gate for `name` (used in the error message) under `strategy`.
    #[must_use]
    pub fn new(name: &'static str, strategy: QuotaStrategy) -> Self {
        Self {
            name,
            strategy,
            state: Mutex::new(GateState {
                last_call: None,
                window_start: Instant::now(),
                calls_in_window: 0,
            }),
        }
    }

    /// Attempt to consume one unit of quota.
    ///
    /// # Errors
    /// Returns [`EngineError::TransientUpstream`] when the call would
    /// violate the configured pacing or window budget; the caller should
    /// retry on its next scheduled tick rather than immediately.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned by an earlier panic.
    pub fn try_acquire(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("quota gate mutex poisoned");
        let now = Instant::now();
        match self.strategy {
            QuotaStrategy::Interval(min_gap) => {
                if let Some(last) = state.last_call
                    && now.duration_since(last) < min_gap
                {
                    return Err(EngineError::transient(
                        self.name,
                        format!("interval {min_gap:?} not yet elapsed"),
                    ));
                }
                state.last_call = Some(now);
                Ok(())
            }
            QuotaStrategy::PerWindow { limit, window } => {
                if now.duration_since(state.window_start) >= window {
                    state.window_start = now;
                    state.calls_in_window = 0;
                }
                if state.calls_in_window >= limit {
                    return Err(EngineError::transient(
                        self.name,
                        format!("window quota of {limit} calls exhausted"),
                    ));
                }
                state.calls_in_window += 1;
                Ok(())
            }
        }
    }
}
