//! Trade feature record supplied by the host adapter for every market order.

use serde::{Deserialize, Serialize};

/// Direction of the incoming order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    #[default]
    Buy,
    Sell,
}

impl TradeSide {
    /// Wire representation agreed with the scoring service
    pub fn as_wire(self) -> u64 {
        match self {
            TradeSide::Buy => 0,
            TradeSide::Sell => 1,
        }
    }
}

/// Trade, account and profile attributes for one order
///
/// Every attribute is optional from the host's point of view: blank strings and
/// zero numbers mean "not available" and are replaced by safe defaults when the
/// scoring request is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeFeatures {
    // Identity and instrument
    pub user_id: String,
    pub symbol: String,
    pub platform: String,

    // Order
    pub side: TradeSide,
    pub open_price: f32,
    pub stop_loss: f32,
    pub take_profit: f32,
    pub volume_lots: f32,
    pub open_time_unix: i64,

    // Account
    pub account_balance: f32,
    pub account_equity: f32,
    pub leverage: u32,
    pub account_age_days: i64,

    // Trading history
    pub win_ratio: f32,
    pub profit_factor: f32,
    pub avg_holding_minutes: f32,
    pub trades_last_30d: u64,

    // Profile
    pub country: String,
    pub occupation: String,
    pub experience_level: String,
}
