//! # Scoring Service Schema
//!
//! Field-number tables shared with the remote scoring service. These numbers are a
//! fixed external contract: changing a number or a kind here without the same change
//! on the service side silently corrupts every score.
//!
//! Each table is a `const` array checked during compilation: every field number must
//! lie in 1..=2^29-1 and numbers must be unique within a table.

use crate::wire::{FieldNumber, WireType};
use serde::{Deserialize, Serialize};

/// Value kind a schema field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Float32,
    VarInt,
    Utf8String,
}

impl FieldKind {
    pub const fn wire_type(self) -> WireType {
        match self {
            FieldKind::Float32 => WireType::Fixed32,
            FieldKind::VarInt => WireType::Varint,
            FieldKind::Utf8String => WireType::LengthDelimited,
        }
    }
}

/// One row of a schema table: name → number → kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub number: FieldNumber,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, number: u32, kind: FieldKind) -> Self {
        Self {
            name,
            number: FieldNumber::new_const(number),
            kind,
        }
    }
}

/// Versioned request table
#[derive(Debug, Clone, Copy)]
pub struct RequestSchema {
    pub version: u32,
    pub fields: &'static [FieldSpec],
}

impl RequestSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn by_number(&self, number: u32) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.number.get() == number)
    }
}

const fn assert_unique_numbers(fields: &[FieldSpec]) {
    let mut i = 0;
    while i < fields.len() {
        let mut j = i + 1;
        while j < fields.len() {
            assert!(
                fields[i].number.get() != fields[j].number.get(),
                "duplicate field number in schema table"
            );
            j += 1;
        }
        i += 1;
    }
}

/// Request table, version 1
pub mod v1 {
    use super::{FieldKind::*, FieldSpec};

    // Order
    pub const OPEN_PRICE: FieldSpec = FieldSpec::new("open_price", 1, Float32);
    pub const STOP_LOSS: FieldSpec = FieldSpec::new("stop_loss", 2, Float32);
    pub const TAKE_PROFIT: FieldSpec = FieldSpec::new("take_profit", 3, Float32);
    pub const VOLUME_LOTS: FieldSpec = FieldSpec::new("volume_lots", 4, Float32);
    pub const SIDE: FieldSpec = FieldSpec::new("side", 5, VarInt);
    pub const OPEN_TIME_UNIX: FieldSpec = FieldSpec::new("open_time_unix", 6, VarInt);

    // Account
    pub const ACCOUNT_BALANCE: FieldSpec = FieldSpec::new("account_balance", 10, Float32);
    pub const ACCOUNT_EQUITY: FieldSpec = FieldSpec::new("account_equity", 11, Float32);
    pub const LEVERAGE: FieldSpec = FieldSpec::new("leverage", 12, VarInt);
    pub const ACCOUNT_AGE_DAYS: FieldSpec = FieldSpec::new("account_age_days", 13, VarInt);

    // Trading history
    pub const WIN_RATIO: FieldSpec = FieldSpec::new("win_ratio", 20, Float32);
    pub const PROFIT_FACTOR: FieldSpec = FieldSpec::new("profit_factor", 21, Float32);
    pub const AVG_HOLDING_MINUTES: FieldSpec =
        FieldSpec::new("avg_holding_minutes", 22, Float32);
    pub const TRADES_LAST_30D: FieldSpec = FieldSpec::new("trades_last_30d", 23, VarInt);

    // Categorical
    pub const SYMBOL: FieldSpec = FieldSpec::new("symbol", 30, Utf8String);
    pub const PLATFORM: FieldSpec = FieldSpec::new("platform", 31, Utf8String);
    pub const COUNTRY: FieldSpec = FieldSpec::new("country", 40, Utf8String);
    pub const OCCUPATION: FieldSpec = FieldSpec::new("occupation", 41, Utf8String);
    pub const EXPERIENCE_LEVEL: FieldSpec = FieldSpec::new("experience_level", 42, Utf8String);
    pub const USER_ID: FieldSpec = FieldSpec::new("user_id", 51, Utf8String);

    pub const FIELDS: &[FieldSpec] = &[
        OPEN_PRICE,
        STOP_LOSS,
        TAKE_PROFIT,
        VOLUME_LOTS,
        SIDE,
        OPEN_TIME_UNIX,
        ACCOUNT_BALANCE,
        ACCOUNT_EQUITY,
        LEVERAGE,
        ACCOUNT_AGE_DAYS,
        WIN_RATIO,
        PROFIT_FACTOR,
        AVG_HOLDING_MINUTES,
        TRADES_LAST_30D,
        SYMBOL,
        PLATFORM,
        COUNTRY,
        OCCUPATION,
        EXPERIENCE_LEVEL,
        USER_ID,
    ];

    const _: () = super::assert_unique_numbers(FIELDS);
}

pub const REQUEST_SCHEMA_V1: RequestSchema = RequestSchema {
    version: 1,
    fields: v1::FIELDS,
};

/// Request table the builder emits
pub const CURRENT_REQUEST_SCHEMA: RequestSchema = REQUEST_SCHEMA_V1;

/// Response field numbers
///
/// Which number carries the score differs between service deployments, so the
/// response side is configured rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSchema {
    /// Float32 score in [0, 1]
    pub score_field: u32,
    /// Optional UTF-8 warnings text
    pub warnings_field: u32,
}

impl Default for ResponseSchema {
    fn default() -> Self {
        Self {
            score_field: 1,
            warnings_field: 2,
        }
    }
}
