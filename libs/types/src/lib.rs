//! # Scoring Types
//!
//! Plain data exchanged between the host routing adapter and the scoring client.
//!
//! ## Contents
//!
//! - [`TradeFeatures`]: the trade, account and profile attributes the host extracts from
//!   an incoming market order
//! - [`RoutingThresholds`]: per instrument-group score thresholds with the `"Other"` fallback
//! - [`BookRoute`] / [`RoutingOutcome`]: the routing verdict handed back to the host
//!
//! ## What This Crate Does NOT Contain
//! - Wire encoding (belongs in `codec`)
//! - Sockets or pooling (belongs in `network`)
//! - Configuration file handling (belongs in `config`)

pub mod features;
pub mod routing;

pub use features::{TradeFeatures, TradeSide};
pub use routing::{
    decide, route, BookRoute, RoutingOutcome, RoutingThresholds, ThresholdError, FALLBACK_GROUP,
};
