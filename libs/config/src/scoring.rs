//! Scoring client settings

use crate::error::{ConfigError, ConfigResult};
use codec::{FieldNumber, ResponseSchema};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for one resilient scoring client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringClientConfig {
    /// `host:port` of the scoring service
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub recv_timeout_ms: u64,
    /// Score returned whenever the service cannot produce one
    pub fallback_score: f32,
    pub pool_size: usize,
    pub cache_ttl_seconds: u64,
    pub cache_max_size: usize,
    /// Largest response body accepted, in bytes
    pub max_frame_size: usize,
    pub response: ResponseSchema,
}

impl Default for ScoringClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:50051".to_string(),
            connect_timeout_ms: 2_000,
            send_timeout_ms: 5_000,
            recv_timeout_ms: 5_000,
            fallback_score: 0.0,
            pool_size: 4,
            cache_ttl_seconds: 300,
            cache_max_size: 1_000,
            max_frame_size: 1024 * 1024,
            response: ResponseSchema::default(),
        }
    }
}

impl ScoringClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("endpoint", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.fallback_score) {
            return Err(ConfigError::invalid(
                "fallback_score",
                format!("{} is outside [0, 1]", self.fallback_score),
            ));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::invalid("pool_size", "must be at least 1"));
        }
        if self.cache_max_size == 0 {
            return Err(ConfigError::invalid("cache_max_size", "must be at least 1"));
        }
        if self.max_frame_size == 0 {
            return Err(ConfigError::invalid("max_frame_size", "must be at least 1"));
        }

        for (field, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("send_timeout_ms", self.send_timeout_ms),
            ("recv_timeout_ms", self.recv_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }

        for (field, number) in [
            ("response.score_field", self.response.score_field),
            ("response.warnings_field", self.response.warnings_field),
        ] {
            FieldNumber::new(number).map_err(|e| ConfigError::invalid(field, e.to_string()))?;
        }
        if self.response.score_field == self.response.warnings_field {
            return Err(ConfigError::invalid(
                "response.warnings_field",
                "must differ from response.score_field",
            ));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}
