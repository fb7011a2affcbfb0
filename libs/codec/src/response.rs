//! Scoring response decoding

use crate::error::DecodeResult;
use crate::schema::ResponseSchema;
use crate::wire::{decode_fields, RawValue};
use tracing::trace;

/// Fields of interest extracted from a response body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringResponse {
    /// Last Float32 value under the score field, if any
    pub score: Option<f32>,
    pub warnings: Option<String>,
}

impl ScoringResponse {
    /// Extract score and warnings, skipping every other field by wire type
    ///
    /// A score field carried under a non-Fixed32 wire type is treated as absent.
    pub fn decode(body: &[u8], schema: &ResponseSchema) -> DecodeResult<Self> {
        let mut response = ScoringResponse::default();

        for field in decode_fields(body) {
            let field = field?;
            match (field.field_number, field.value) {
                (n, RawValue::Fixed32(bits)) if n == schema.score_field => {
                    response.score = Some(f32::from_bits(bits));
                }
                (n, RawValue::Bytes(bytes)) if n == schema.warnings_field => {
                    response.warnings = Some(String::from_utf8_lossy(bytes).into_owned());
                }
                (n, _) => {
                    trace!(
                        field_number = n,
                        wire_type = ?field.wire_type,
                        "Skipping response field"
                    );
                }
            }
        }

        Ok(response)
    }
}
