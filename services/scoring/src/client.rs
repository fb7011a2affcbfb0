//! Resilient Scoring Client
//!
//! Obtains a risk score for a trade from the remote scoring service and never
//! fails: every error class ends in the configured fallback score within the
//! connect, send and receive timeouts.
//!
//! Call flow for [`ResilientScoringClient::get_score`]:
//!
//! ```text
//! fingerprint ─► cache hit? ──yes──► cached score
//!                   │ no
//!                   ▼
//!            backoff window open? ──no──► fallback
//!                   │ yes
//!                   ▼
//!   checkout ─► send frame ─► read frame ─► decode ─► validate [0,1]
//!                   │ any failure                          │ ok
//!                   ▼                                      ▼
//!         record failure, fallback         record success, cache, score
//! ```
//!
//! A connection is discarded after a send or receive failure, since unread
//! response bytes may remain on it. After a decode or range failure the frame
//! was consumed in full and the connection goes back to the pool.

use crate::cache::ScoreCache;
use crate::error::{ScoringError, ScoringResult};
use crate::health::{ClientHealthState, HealthTracker};
use crate::stats::{ScoringStats, ScoringStatsSnapshot};
use codec::{build_scoring_request, fingerprint, ScoringResponse};
use config::{ConfigError, ConfigResult, ScoringClientConfig};
use network::{read_framed, write_framed, ConnectionPool, Connector, PoolStats, TcpConnector};
use std::time::Instant;
use tracing::{debug, warn};
use types::{route, RoutingOutcome, RoutingThresholds, TradeFeatures};

/// Response bytes included in malformed-response logs
const PREVIEW_BYTES: usize = 32;

pub struct ResilientScoringClient<C: Connector = TcpConnector> {
    config: ScoringClientConfig,
    pool: ConnectionPool<C>,
    cache: ScoreCache,
    health: HealthTracker,
    stats: ScoringStats,
}

impl ResilientScoringClient<TcpConnector> {
    /// Validate `config` and build a client speaking TCP to `config.endpoint`.
    ///
    /// The endpoint is resolved here so requests never wait on a name lookup.
    /// No connection is opened until the first request.
    pub fn new(config: ScoringClientConfig) -> ConfigResult<Self> {
        config.validate()?;
        let connector = TcpConnector::new(config.endpoint.clone(), config.connect_timeout())
            .map_err(|e| ConfigError::Invalid {
                field: "endpoint",
                message: format!("cannot resolve {}: {}", config.endpoint, e),
            })?;
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> ResilientScoringClient<C> {
    pub fn with_connector(config: ScoringClientConfig, connector: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            pool: ConnectionPool::new(connector, config.pool_size),
            cache: ScoreCache::new(config.cache_ttl(), config.cache_max_size),
            health: HealthTracker::new(),
            stats: ScoringStats::new(),
            config,
        })
    }

    /// Score a trade. Always returns a value in [0, 1].
    pub fn get_score(&self, features: &TradeFeatures) -> f32 {
        self.get_score_at(features, Instant::now())
    }

    /// [`get_score`](Self::get_score) with cache expiry and backoff evaluated at `now`
    pub fn get_score_at(&self, features: &TradeFeatures, now: Instant) -> f32 {
        self.stats.record_request();
        let key = fingerprint(features);

        if let Some(score) = self.cache.get_at(&key, now) {
            self.stats.record_cache_hit();
            debug!(fingerprint = %key, score, "Score served from cache");
            return score;
        }

        if !self.health.allows_attempt_at(now) {
            self.stats.record_breaker_skip();
            debug!(
                fingerprint = %key,
                failures = self.health.snapshot().consecutive_failures,
                "Backoff window open, using fallback score"
            );
            return self.config.fallback_score;
        }

        match self.try_remote_score(features) {
            Ok(score) => {
                self.health.record_connection_result_at(true, now);
                self.stats.record_remote_success();
                self.cache.put_at(key, score, now);
                score
            }
            Err(e) => {
                self.health.record_connection_result_at(false, now);
                self.stats.record_failure(e.kind());
                warn!(
                    endpoint = self.pool.endpoint(),
                    error = %e,
                    failures = self.health.snapshot().consecutive_failures,
                    fallback = self.config.fallback_score,
                    "Remote scoring failed"
                );
                self.config.fallback_score
            }
        }
    }

    /// One remote round-trip with no caching, backoff or fallback
    pub fn try_remote_score(&self, features: &TradeFeatures) -> ScoringResult<f32> {
        let mut conn = self.pool.checkout()?;
        debug!(slot = conn.slot(), "Checked out scoring connection");

        let request = build_scoring_request(features).encode();
        if let Err(e) = write_framed(&mut conn, &request, self.config.send_timeout()) {
            conn.discard();
            return Err(ScoringError::Send(e));
        }

        let body = match read_framed(
            &mut conn,
            self.config.recv_timeout(),
            self.config.max_frame_size,
        ) {
            Ok(body) => body,
            Err(e) => {
                conn.discard();
                return Err(e.into());
            }
        };
        conn.release();

        self.parse_score(&body)
    }

    fn parse_score(&self, body: &[u8]) -> ScoringResult<f32> {
        let schema = &self.config.response;
        let response = ScoringResponse::decode(body, schema).inspect_err(|e| {
            warn!(error = %e, bytes = body.len(), preview = %preview(body), "Malformed scoring response");
        })?;

        if let Some(warnings) = response.warnings.as_deref().filter(|w| !w.is_empty()) {
            warn!(warnings, "Scoring service returned warnings");
        }

        let score = match response.score {
            Some(score) => score,
            None => {
                warn!(
                    field = schema.score_field,
                    preview = %preview(body),
                    "Scoring response has no score field"
                );
                return Err(ScoringError::ScoreMissing {
                    field: schema.score_field,
                });
            }
        };

        // NaN fails the range check
        if !(0.0..=1.0).contains(&score) {
            warn!(score, "Score outside [0, 1]");
            return Err(ScoringError::ScoreOutOfRange { score });
        }

        debug!(score, "Received remote score");
        Ok(score)
    }

    /// Score a trade and route it against its instrument group's threshold
    pub fn route_trade(
        &self,
        features: &TradeFeatures,
        group: &str,
        thresholds: &RoutingThresholds,
    ) -> RoutingOutcome {
        let outcome = route(self.get_score(features), group, thresholds);
        debug!(
            user_id = %features.user_id,
            symbol = %features.symbol,
            group = %outcome.group,
            score = outcome.score,
            threshold = outcome.threshold,
            decision = %outcome.decision,
            "Routed trade"
        );
        outcome
    }

    pub fn config(&self) -> &ScoringClientConfig {
        &self.config
    }

    pub fn stats(&self) -> ScoringStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn health(&self) -> ClientHealthState {
        self.health.snapshot()
    }

    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    /// Close every idle pooled connection; connections in use close when returned.
    /// Afterwards uncached trades get the fallback score without any connect.
    pub fn shutdown(&self) {
        self.pool.close_all();
    }
}

fn preview(body: &[u8]) -> String {
    let shown = &body[..body.len().min(PREVIEW_BYTES)];
    if body.len() > PREVIEW_BYTES {
        format!("{}…", hex::encode(shown))
    } else {
        hex::encode(shown)
    }
}
