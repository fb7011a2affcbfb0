//! # Wire Primitives
//!
//! Encoding and decoding of the restricted protobuf-compatible format spoken by the
//! scoring service. Only three wire types exist:
//!
//! | Wire type | Value | Payload |
//! |-----------|-------|---------|
//! | `Varint` | 0 | little-endian base-128 groups, continuation bit on all but the last |
//! | `LengthDelimited` | 2 | varint length followed by that many bytes |
//! | `Fixed32` | 5 | four little-endian bytes (IEEE-754 `f32`) |
//!
//! A field is `tag || payload` where `tag = (field_number << 3) | wire_type`, itself a varint.
//!
//! Decoding is a lazy pass over a complete buffer: [`FieldDecoder`] yields one field at a
//! time, never assumes ordering, and lets callers skip fields they do not know by wire
//! type alone. The decoder stops at the first error; start over by decoding the buffer
//! again from offset 0.

use crate::error::{DecodeError, DecodeResult, EncodeError};
use bytes::{BufMut, Bytes, BytesMut};

/// Largest field number representable in a tag
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// A 64-bit varint never takes more than ten bytes
pub const MAX_VARINT_LEN: usize = 10;

/// Tag discriminator stored in the low three bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl WireType {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(WireType::Varint),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// Field number in 1..=2^29-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldNumber(u32);

impl FieldNumber {
    pub fn new(number: u32) -> Result<Self, EncodeError> {
        if (1..=MAX_FIELD_NUMBER).contains(&number) {
            Ok(Self(number))
        } else {
            Err(EncodeError::InvalidFieldNumber(number))
        }
    }

    /// Constructor for constant tables; an out-of-range number fails const evaluation
    pub const fn new_const(number: u32) -> Self {
        assert!(
            number >= 1 && number <= MAX_FIELD_NUMBER,
            "field number out of range"
        );
        Self(number)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FieldNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed value carried by one field
///
/// Signed integers use the plain two's complement varint form (protobuf `int64`),
/// so negative values always take ten bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float32(f32),
    VarInt(u64),
    Utf8String(String),
}

impl FieldValue {
    pub fn signed(value: i64) -> Self {
        FieldValue::VarInt(value as u64)
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Float32(_) => WireType::Fixed32,
            FieldValue::VarInt(_) => WireType::Varint,
            FieldValue::Utf8String(_) => WireType::LengthDelimited,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FieldValue::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::VarInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_u64().map(|v| v as i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Utf8String(s) => Some(s),
            _ => None,
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            FieldValue::Float32(_) => 4,
            FieldValue::VarInt(v) => varint_len(*v),
            FieldValue::Utf8String(s) => varint_len(s.len() as u64) + s.len(),
        }
    }
}

/// Number of bytes `encode_varint` produces for `value`
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Append `value` as a base-128 varint
pub fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Append a field tag
pub fn encode_tag(field: FieldNumber, wire_type: WireType, buf: &mut impl BufMut) {
    encode_varint(((field.get() as u64) << 3) | wire_type as u64, buf);
}

pub fn encode_float32(field: FieldNumber, value: f32, buf: &mut impl BufMut) {
    encode_tag(field, WireType::Fixed32, buf);
    buf.put_f32_le(value);
}

pub fn encode_varint_field(field: FieldNumber, value: u64, buf: &mut impl BufMut) {
    encode_tag(field, WireType::Varint, buf);
    encode_varint(value, buf);
}

/// Append a length-delimited string field. Empty strings still emit tag and zero length.
pub fn encode_string(field: FieldNumber, value: &str, buf: &mut impl BufMut) {
    encode_tag(field, WireType::LengthDelimited, buf);
    encode_varint(value.len() as u64, buf);
    buf.put_slice(value.as_bytes());
}

/// Read one varint starting at `offset`, returning the value and the bytes consumed
pub fn decode_varint(buf: &[u8], offset: usize) -> DecodeResult<(u64, usize)> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = buf.get(offset + i) else {
            return Err(DecodeError::TruncatedInput {
                need: i + 1,
                remaining: buf.len().saturating_sub(offset),
                offset,
            });
        };
        // The tenth byte may only contribute the single remaining bit
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(DecodeError::VarintOverflow { offset });
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(DecodeError::VarintOverflow { offset })
}

/// Undecoded payload of one field, borrowing from the input buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Varint(u64),
    Fixed32(u32),
    Bytes(&'a [u8]),
}

/// One field read off the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedField<'a> {
    pub field_number: u32,
    pub wire_type: WireType,
    pub value: RawValue<'a>,
}

impl DecodedField<'_> {
    /// Interpret the payload as a typed value
    pub fn to_field_value(&self) -> DecodeResult<FieldValue> {
        match self.value {
            RawValue::Varint(v) => Ok(FieldValue::VarInt(v)),
            RawValue::Fixed32(bits) => Ok(FieldValue::Float32(f32::from_bits(bits))),
            RawValue::Bytes(bytes) => std::str::from_utf8(bytes)
                .map(|s| FieldValue::Utf8String(s.to_string()))
                .map_err(|_| DecodeError::InvalidUtf8 {
                    field_number: self.field_number,
                }),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self.value {
            RawValue::Fixed32(bits) => Some(f32::from_bits(bits)),
            _ => None,
        }
    }
}

/// Lazy field-by-field decoder over a complete message body
#[derive(Debug, Clone)]
pub struct FieldDecoder<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> FieldDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            failed: false,
        }
    }

    /// Current read position
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read the next tag and its payload. `None` at end of buffer.
    pub fn decode_next_field(&mut self) -> Option<DecodeResult<DecodedField<'a>>> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }
        let result = self.read_field();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    fn read_field(&mut self) -> DecodeResult<DecodedField<'a>> {
        let tag_offset = self.offset;
        let (tag, tag_len) = decode_varint(self.buf, tag_offset)?;

        let field_number = tag >> 3;
        if field_number == 0 || field_number > MAX_FIELD_NUMBER as u64 {
            return Err(DecodeError::InvalidFieldNumber {
                field_number,
                offset: tag_offset,
            });
        }
        let wire_bits = (tag & 0x07) as u8;
        let wire_type =
            WireType::from_bits(wire_bits).ok_or(DecodeError::UnsupportedWireType {
                wire_type: wire_bits,
                offset: tag_offset,
            })?;

        let mut pos = tag_offset + tag_len;
        let value = match wire_type {
            WireType::Varint => {
                let (v, len) = decode_varint(self.buf, pos)?;
                pos += len;
                RawValue::Varint(v)
            }
            WireType::Fixed32 => {
                let bytes = self.take_bytes(pos, 4)?;
                pos += 4;
                RawValue::Fixed32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            WireType::LengthDelimited => {
                let (len, len_len) = decode_varint(self.buf, pos)?;
                pos += len_len;
                let len = usize::try_from(len).map_err(|_| DecodeError::TruncatedInput {
                    need: usize::MAX,
                    remaining: self.buf.len() - pos,
                    offset: pos,
                })?;
                let bytes = self.take_bytes(pos, len)?;
                pos += len;
                RawValue::Bytes(bytes)
            }
        };

        self.offset = pos;
        Ok(DecodedField {
            field_number: field_number as u32,
            wire_type,
            value,
        })
    }

    fn take_bytes(&self, pos: usize, len: usize) -> DecodeResult<&'a [u8]> {
        let remaining = self.buf.len().saturating_sub(pos);
        if len > remaining {
            return Err(DecodeError::TruncatedInput {
                need: len,
                remaining,
                offset: pos,
            });
        }
        Ok(&self.buf[pos..pos + len])
    }
}

impl<'a> Iterator for FieldDecoder<'a> {
    type Item = DecodeResult<DecodedField<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next_field()
    }
}

/// Start a lazy decode of `buf` from offset 0
pub fn decode_fields(buf: &[u8]) -> FieldDecoder<'_> {
    FieldDecoder::new(buf)
}

/// Ordered sequence of fields forming one request or response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMessage {
    fields: Vec<(FieldNumber, FieldValue)>,
}

impl WireMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field; encoding follows insertion order
    pub fn push(&mut self, field: FieldNumber, value: FieldValue) -> &mut Self {
        self.fields.push((field, value));
        self
    }

    pub fn fields(&self) -> &[(FieldNumber, FieldValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Last value carried under `field`, matching protobuf's last-one-wins rule
    pub fn get(&self, field: FieldNumber) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|(number, _)| *number == field)
            .map(|(_, value)| value)
    }

    pub fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(number, value)| {
                varint_len(((number.get() as u64) << 3) | value.wire_type() as u64)
                    + value.encoded_len()
            })
            .sum()
    }

    pub fn encode_to(&self, buf: &mut impl BufMut) {
        for (number, value) in &self.fields {
            match value {
                FieldValue::Float32(v) => encode_float32(*number, *v, buf),
                FieldValue::VarInt(v) => encode_varint_field(*number, *v, buf),
                FieldValue::Utf8String(s) => encode_string(*number, s, buf),
            }
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }

    /// Decode every field of `buf`, preserving wire order
    pub fn decode(buf: &[u8]) -> DecodeResult<Self> {
        let mut message = WireMessage::new();
        for field in decode_fields(buf) {
            let field = field?;
            // Field numbers coming off the decoder are already range checked
            message
                .fields
                .push((FieldNumber(field.field_number), field.to_field_value()?));
        }
        Ok(message)
    }
}
