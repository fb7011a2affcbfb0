//! Endpoint health and escalating backoff
//!
//! One [`HealthTracker`] per scoring endpoint, shared by every call. After a run
//! of failures, new attempts are gated by a wait that grows with the failure
//! count: 30s up to two failures, 120s up to five, 300s beyond.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Snapshot of the endpoint's health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHealthState {
    pub available: bool,
    /// When the last attempt (successful or not) completed; `None` before the first
    pub last_attempt: Option<Instant>,
    pub consecutive_failures: u32,
}

impl Default for ClientHealthState {
    fn default() -> Self {
        Self {
            available: true,
            last_attempt: None,
            consecutive_failures: 0,
        }
    }
}

/// Wait required after `failures` consecutive failures before trying again
pub fn backoff_for(failures: u32) -> Duration {
    match failures {
        0..=2 => Duration::from_secs(30),
        3..=5 => Duration::from_secs(120),
        _ => Duration::from_secs(300),
    }
}

fn window_elapsed(state: &ClientHealthState, now: Instant) -> bool {
    match state.last_attempt {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= backoff_for(state.consecutive_failures),
    }
}

/// Shared health state for one endpoint
#[derive(Debug, Default)]
pub struct HealthTracker {
    state: Mutex<ClientHealthState>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection_result(&self, success: bool) {
        self.record_connection_result_at(success, Instant::now());
    }

    /// Record an attempt outcome. A success resets the failure count.
    pub fn record_connection_result_at(&self, success: bool, now: Instant) {
        let mut state = self.state.lock();
        state.last_attempt = Some(now);

        if success {
            if !state.available {
                info!(
                    after_failures = state.consecutive_failures,
                    "Scoring service available again"
                );
            }
            state.available = true;
            state.consecutive_failures = 0;
        } else {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            if state.available {
                warn!("Scoring service degraded, using fallback scores");
            }
            state.available = false;
        }
    }

    pub fn should_attempt_connection(&self) -> bool {
        self.should_attempt_connection_at(Instant::now())
    }

    /// Whether the backoff window since the last attempt has elapsed
    pub fn should_attempt_connection_at(&self, now: Instant) -> bool {
        window_elapsed(&self.state.lock(), now)
    }

    /// Gate used per request: always open while no failure is outstanding
    pub fn allows_attempt_at(&self, now: Instant) -> bool {
        let state = self.state.lock();
        state.consecutive_failures == 0 || window_elapsed(&state, now)
    }

    pub fn snapshot(&self) -> ClientHealthState {
        *self.state.lock()
    }
}
