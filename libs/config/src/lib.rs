//! # Scoring Configuration
//!
//! Typed configuration for the resilient scoring client and the routing
//! threshold table.
//!
//! - [`ScoringClientConfig`]: endpoint, timeouts, fallback score, pool and cache sizing
//! - [`GatewayConfig`]: the client settings plus per-group thresholds, loadable
//!   from TOML with `GATEWAY_`-prefixed environment overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::GatewayConfig;
//!
//! let gateway = GatewayConfig::load("config/gateway.toml")?;
//! gateway.scoring.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod error;
pub mod loader;
pub mod scoring;

pub use error::{ConfigError, ConfigResult};
pub use loader::{GatewayConfig, ENV_PREFIX};
pub use scoring::ScoringClientConfig;
