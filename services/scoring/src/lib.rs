//! # Resilient Scoring Client
//!
//! Scores every incoming market order against a remote scoring service and routes
//! it to the A-book or B-book, degrading to a fixed fallback score whenever the
//! service is slow, unreachable or returns something unusable.
//!
//! ## Components
//!
//! - [`ResilientScoringClient`]: cache → backoff gate → pooled round-trip → validation
//! - [`ScoreCache`]: TTL and size bounded fingerprint → score map
//! - [`HealthTracker`]: consecutive-failure count and escalating backoff
//! - [`ScoringStats`]: per-class failure counters for the host adapter to log
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::ScoringClientConfig;
//! use scoring::ResilientScoringClient;
//! use types::{RoutingThresholds, TradeFeatures};
//!
//! let client = ResilientScoringClient::new(
//!     ScoringClientConfig::default().with_endpoint("10.0.0.5:50051"),
//! )?;
//! let thresholds = RoutingThresholds::new(0.08)?.with_group("Forex", 0.12)?;
//!
//! let trade = TradeFeatures {
//!     user_id: "100234".into(),
//!     symbol: "EURUSD".into(),
//!     ..Default::default()
//! };
//! let outcome = client.route_trade(&trade, "Forex", &thresholds);
//! println!("{} (score {:.3})", outcome.decision, outcome.score);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod health;
pub mod stats;

pub use cache::ScoreCache;
pub use client::ResilientScoringClient;
pub use error::{FailureKind, ScoringError, ScoringResult};
pub use health::{backoff_for, ClientHealthState, HealthTracker};
pub use stats::{ScoringStats, ScoringStatsSnapshot};

// Re-export routing types so the host adapter needs a single dependency
pub use types::{decide, BookRoute, RoutingOutcome, RoutingThresholds, TradeFeatures};
