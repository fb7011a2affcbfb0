//! Feature vector construction
//!
//! Maps a [`TradeFeatures`] record onto the current request schema. Building never
//! fails: non-finite numbers become 0 and blank categorical attributes become
//! `"unknown"`, so the service always receives every field it expects.

use crate::schema::{v1, FieldSpec};
use crate::wire::{FieldValue, WireMessage};
use types::TradeFeatures;

/// Placeholder for categorical attributes the host could not supply
pub const UNKNOWN: &str = "unknown";

/// Build the scoring request for one trade
pub fn build_scoring_request(features: &TradeFeatures) -> WireMessage {
    let mut message = WireMessage::with_capacity(v1::FIELDS.len());

    push(&mut message, v1::OPEN_PRICE, float(features.open_price));
    push(&mut message, v1::STOP_LOSS, float(features.stop_loss));
    push(&mut message, v1::TAKE_PROFIT, float(features.take_profit));
    push(&mut message, v1::VOLUME_LOTS, float(features.volume_lots));
    push(&mut message, v1::SIDE, FieldValue::VarInt(features.side.as_wire()));
    push(&mut message, v1::OPEN_TIME_UNIX, FieldValue::signed(features.open_time_unix));

    push(&mut message, v1::ACCOUNT_BALANCE, float(features.account_balance));
    push(&mut message, v1::ACCOUNT_EQUITY, float(features.account_equity));
    push(&mut message, v1::LEVERAGE, FieldValue::VarInt(features.leverage.into()));
    push(&mut message, v1::ACCOUNT_AGE_DAYS, FieldValue::signed(features.account_age_days));

    push(&mut message, v1::WIN_RATIO, float(features.win_ratio));
    push(&mut message, v1::PROFIT_FACTOR, float(features.profit_factor));
    push(&mut message, v1::AVG_HOLDING_MINUTES, float(features.avg_holding_minutes));
    push(&mut message, v1::TRADES_LAST_30D, FieldValue::VarInt(features.trades_last_30d));

    push(&mut message, v1::SYMBOL, text(&features.symbol));
    push(&mut message, v1::PLATFORM, text(&features.platform));
    push(&mut message, v1::COUNTRY, text(&features.country));
    push(&mut message, v1::OCCUPATION, text(&features.occupation));
    push(&mut message, v1::EXPERIENCE_LEVEL, text(&features.experience_level));
    push(&mut message, v1::USER_ID, text(&features.user_id));

    message
}

/// Cache key built from the attributes that move the score most:
/// user, symbol, price rounded to 5 decimals and volume rounded to 2
pub fn fingerprint(features: &TradeFeatures) -> String {
    format!(
        "{}|{}|{:.5}|{:.2}",
        category(&features.user_id),
        category(&features.symbol),
        finite_or_zero(features.open_price),
        finite_or_zero(features.volume_lots),
    )
}

fn push(message: &mut WireMessage, spec: FieldSpec, value: FieldValue) {
    debug_assert_eq!(
        spec.kind.wire_type(),
        value.wire_type(),
        "{} pushed with the wrong kind",
        spec.name
    );
    message.push(spec.number, value);
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn float(value: f32) -> FieldValue {
    FieldValue::Float32(finite_or_zero(value))
}

fn category(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN
    } else {
        trimmed
    }
}

fn text(value: &str) -> FieldValue {
    FieldValue::Utf8String(category(value).to_string())
}
