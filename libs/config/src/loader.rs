//! Gateway configuration loading
//!
//! A TOML file layered with environment overrides. Nested keys use a double
//! underscore, e.g. `GATEWAY_SCORING__ENDPOINT=10.0.0.5:50051` or
//! `GATEWAY_THRESHOLDS__FOREX=0.12`.

use crate::scoring::ScoringClientConfig;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use types::RoutingThresholds;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "GATEWAY";

/// Everything the host adapter needs to score and route trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub scoring: ScoringClientConfig,
    /// Instrument group → threshold; must contain `Other`
    pub thresholds: RoutingThresholds,
}

impl GatewayConfig {
    /// Load from a TOML file, then apply `GATEWAY_` environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading gateway config: {:?}", path);

        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let gateway: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        gateway.validate()?;
        Ok(gateway)
    }

    /// Parse a TOML document without environment overrides
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let gateway: Self = toml::from_str(source).context("Failed to parse gateway TOML")?;
        gateway.validate()?;
        Ok(gateway)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring
            .validate()
            .context("Invalid scoring client configuration")?;
        debug!(
            endpoint = %self.scoring.endpoint,
            groups = self.thresholds.groups().count(),
            "Gateway configuration validated"
        );
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize gateway configuration")
    }
}
