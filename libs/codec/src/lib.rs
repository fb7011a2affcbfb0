//! # Scoring Codec
//!
//! ## Purpose
//!
//! Encoding rules for the remote scoring service:
//! - Restricted protobuf-compatible wire format (varint, length-delimited, fixed32)
//! - Versioned request field-number table checked at compile time
//! - Feature vector construction from [`types::TradeFeatures`]
//! - Score response extraction and cache fingerprinting
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → network/ → scoring client
//!     ↑           ↓          ↓
//! TradeFeatures  Wire bytes  Framed sockets
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Framing or socket handling (belongs in network/)
//! - Retry, caching or fallback policy (belongs in the scoring service)
//! - A general protobuf compiler: only the field kinds used by the service exist

pub mod error;
pub mod features;
pub mod response;
pub mod schema;
pub mod wire;

pub use error::{DecodeError, DecodeResult, EncodeError};
pub use features::{build_scoring_request, fingerprint, UNKNOWN};
pub use response::ScoringResponse;
pub use schema::{
    FieldKind, FieldSpec, RequestSchema, ResponseSchema, CURRENT_REQUEST_SCHEMA,
    REQUEST_SCHEMA_V1,
};
pub use wire::{
    decode_fields, decode_varint, encode_float32, encode_string, encode_tag, encode_varint,
    encode_varint_field, varint_len, DecodedField, FieldDecoder, FieldNumber, FieldValue,
    RawValue, WireMessage, WireType, MAX_FIELD_NUMBER, MAX_VARINT_LEN,
};
