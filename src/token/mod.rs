//! Continuation tokens for resumable paged reads.
//!
//! Every token is a flat JSON object. Decoding is tolerant of key order and of
//! unknown keys, but each required key must be present with the right type.
//! Decoding never panics: tokens are routinely handed back by callers that
//! stored them somewhere, so the input is treated as untrusted.
//!
//! - `offset.rs` - remaining OFFSET skip count + inner token
//! - `take.rs` - remaining LIMIT count + inner token

pub mod offset;
pub mod take;

pub use offset::OffsetContinuationToken;
pub use take::TakeContinuationToken;

use crate::core::TokenParseError;
use serde_json::{Map, Value as JsonValue};

/// Common surface of every continuation token codec.
pub trait ContinuationToken: Sized {
    /// Serialize into the textual form handed to callers.
    fn encode(&self) -> String;

    /// Parse a token previously produced by [`ContinuationToken::encode`].
    fn try_parse(text: &str) -> Result<Self, TokenParseError>;
}

/// Layered view of an OFFSET/LIMIT continuation, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenLayers {
    pub limit_count: Option<u64>,
    pub offset: Option<u64>,
    pub source_token: Option<String>,
}

/// Peel `take -> offset -> source` layers off a continuation.
///
/// Layers that do not parse are treated as the opaque source token, so this
/// is only suitable for diagnostics, never for resuming a query.
pub fn describe(text: &str) -> TokenLayers {
    let mut layers = TokenLayers::default();

    let inner = match TakeContinuationToken::try_parse(text) {
        Ok(take) => {
            layers.limit_count = Some(take.limit_count());
            take.into_source_token()
        }
        Err(_) => Some(text.to_string()),
    };

    layers.source_token = match inner {
        Some(inner) => match OffsetContinuationToken::try_parse(&inner) {
            Ok(offset) => {
                layers.offset = Some(offset.offset());
                offset.into_source_token()
            }
            Err(_) => Some(inner),
        },
        None => None,
    };

    layers
}

pub(crate) fn parse_object(text: &str) -> Result<Map<String, JsonValue>, TokenParseError> {
    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| TokenParseError::InvalidJson(e.to_string()))?;
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => Err(TokenParseError::NotAnObject),
    }
}

pub(crate) fn required_u64(
    map: &Map<String, JsonValue>,
    field: &'static str,
) -> Result<u64, TokenParseError> {
    let value = map.get(field).ok_or(TokenParseError::MissingField(field))?;
    value.as_u64().ok_or_else(|| TokenParseError::InvalidField {
        field,
        reason: format!("expected a non-negative integer, found {}", value),
    })
}

/// A key that must be present but may hold `null`.
pub(crate) fn required_nullable_string(
    map: &Map<String, JsonValue>,
    field: &'static str,
) -> Result<Option<String>, TokenParseError> {
    match map.get(field) {
        None => Err(TokenParseError::MissingField(field)),
        Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(TokenParseError::InvalidField {
            field,
            reason: format!("expected a string or null, found {}", other),
        }),
    }
}
