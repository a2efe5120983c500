use super::{ContinuationToken, parse_object, required_nullable_string, required_u64};
use crate::core::TokenParseError;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

const OFFSET_KEY: &str = "offset";
const SOURCE_TOKEN_KEY: &str = "sourceToken";

/// Resume point of an OFFSET stage.
///
/// `offset` is how many items must still be skipped before results are
/// emitted; `source_token` is the continuation of the stage below, kept
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetContinuationToken {
    offset: u64,
    source_token: Option<String>,
}

impl OffsetContinuationToken {
    pub fn new(offset: u64, source_token: Option<String>) -> Self {
        Self {
            offset,
            source_token,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn source_token(&self) -> Option<&str> {
        self.source_token.as_deref()
    }

    pub fn into_source_token(self) -> Option<String> {
        self.source_token
    }

    /// Boolean-style parse for call sites that only need to know validity.
    pub fn is_valid(text: &str) -> bool {
        Self::try_parse(text).is_ok()
    }
}

impl ContinuationToken for OffsetContinuationToken {
    fn encode(&self) -> String {
        json!({
            OFFSET_KEY: self.offset,
            SOURCE_TOKEN_KEY: self.source_token,
        })
        .to_string()
    }

    fn try_parse(text: &str) -> Result<Self, TokenParseError> {
        let map = parse_object(text)?;
        let offset = required_u64(&map, OFFSET_KEY)?;
        let source_token = required_nullable_string(&map, SOURCE_TOKEN_KEY)?;
        Ok(Self::new(offset, source_token))
    }
}

impl fmt::Display for OffsetContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for OffsetContinuationToken {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

/// Encode an offset continuation.
pub fn encode(offset: u64, source_token: Option<&str>) -> String {
    OffsetContinuationToken::new(offset, source_token.map(str::to_string)).encode()
}

/// Decode an offset continuation.
pub fn decode(text: &str) -> Result<OffsetContinuationToken, TokenParseError> {
    OffsetContinuationToken::try_parse(text)
}
