//! Wire codec errors
//!
//! Decoding never panics on malformed input; every failure is reported with the
//! byte offset at which it was detected.

use thiserror::Error;

/// Errors raised while decoding wire bytes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the current field requires
    #[error("Truncated input: need {need} bytes at offset {offset}, {remaining} remain")]
    TruncatedInput {
        need: usize,
        remaining: usize,
        offset: usize,
    },

    /// Varint runs past ten bytes or overflows 64 bits
    #[error("Malformed varint at offset {offset}")]
    VarintOverflow { offset: usize },

    /// Tag carries field number 0 or one above 2^29-1
    #[error("Invalid field number {field_number} at offset {offset}")]
    InvalidFieldNumber { field_number: u64, offset: usize },

    /// Wire type outside {0, 2, 5}
    #[error("Unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType { wire_type: u8, offset: usize },

    /// Length-delimited string field is not valid UTF-8
    #[error("Field {field_number} is not valid UTF-8")]
    InvalidUtf8 { field_number: u32 },
}

/// Errors raised while constructing messages outside the constant schema tables
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Field number {0} is outside 1..=536870911")]
    InvalidFieldNumber(u32),
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
