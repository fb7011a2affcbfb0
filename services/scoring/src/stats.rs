//! Client counters
//!
//! Lock-free counters updated on every call; the host adapter takes a
//! [`ScoringStatsSnapshot`] whenever it wants to log them.

use crate::error::FailureKind;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ScoringStats {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    remote_successes: AtomicU64,
    fallbacks: AtomicU64,
    breaker_skips: AtomicU64,

    connect_failures: AtomicU64,
    pool_exhausted: AtomicU64,
    send_failures: AtomicU64,
    recv_timeouts: AtomicU64,
    recv_short: AtomicU64,
    decode_failures: AtomicU64,
    invalid_scores: AtomicU64,
}

/// Point-in-time copy of [`ScoringStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringStatsSnapshot {
    pub requests: u64,
    pub cache_hits: u64,
    pub remote_successes: u64,
    pub fallbacks: u64,
    /// Calls answered with the fallback because the backoff window was still open
    pub breaker_skips: u64,
    pub connect_failures: u64,
    pub pool_exhausted: u64,
    pub send_failures: u64,
    pub recv_timeouts: u64,
    pub recv_short: u64,
    pub decode_failures: u64,
    pub invalid_scores: u64,
}

impl ScoringStatsSnapshot {
    /// Remote attempts that ended in failure
    pub fn failures(&self) -> u64 {
        self.connect_failures
            + self.pool_exhausted
            + self.send_failures
            + self.recv_timeouts
            + self.recv_short
            + self.decode_failures
            + self.invalid_scores
    }

    /// Calls that actually tried to reach the service
    pub fn remote_attempts(&self) -> u64 {
        self.remote_successes + self.failures()
    }
}

impl ScoringStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_remote_success(&self) {
        self.remote_successes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_breaker_skip(&self) {
        self.breaker_skips.fetch_add(1, Ordering::Relaxed);
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed attempt by class; the call falls back
    #[inline]
    pub fn record_failure(&self, kind: FailureKind) {
        let counter = match kind {
            FailureKind::Connect => &self.connect_failures,
            FailureKind::PoolExhausted => &self.pool_exhausted,
            FailureKind::Send => &self.send_failures,
            FailureKind::RecvTimeout => &self.recv_timeouts,
            FailureKind::RecvShort => &self.recv_short,
            FailureKind::Decode => &self.decode_failures,
            FailureKind::InvalidScore => &self.invalid_scores,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScoringStatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        ScoringStatsSnapshot {
            requests: load(&self.requests),
            cache_hits: load(&self.cache_hits),
            remote_successes: load(&self.remote_successes),
            fallbacks: load(&self.fallbacks),
            breaker_skips: load(&self.breaker_skips),
            connect_failures: load(&self.connect_failures),
            pool_exhausted: load(&self.pool_exhausted),
            send_failures: load(&self.send_failures),
            recv_timeouts: load(&self.recv_timeouts),
            recv_short: load(&self.recv_short),
            decode_failures: load(&self.decode_failures),
            invalid_scores: load(&self.invalid_scores),
        }
    }
}
