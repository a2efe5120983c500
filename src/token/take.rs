use super::{ContinuationToken, parse_object, required_nullable_string, required_u64};
use crate::core::TokenParseError;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

const LIMIT_COUNT_KEY: &str = "limitCount";
const SOURCE_TOKEN_KEY: &str = "sourceToken";

/// Resume point of a LIMIT (or TOP) stage: how many items may still be
/// returned, plus the continuation of the stage below.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TakeContinuationToken {
    limit_count: u64,
    source_token: Option<String>,
}

impl TakeContinuationToken {
    pub fn new(limit_count: u64, source_token: Option<String>) -> Self {
        Self {
            limit_count,
            source_token,
        }
    }

    pub fn limit_count(&self) -> u64 {
        self.limit_count
    }

    pub fn source_token(&self) -> Option<&str> {
        self.source_token.as_deref()
    }

    pub fn into_source_token(self) -> Option<String> {
        self.source_token
    }
}

impl ContinuationToken for TakeContinuationToken {
    fn encode(&self) -> String {
        json!({
            LIMIT_COUNT_KEY: self.limit_count,
            SOURCE_TOKEN_KEY: self.source_token,
        })
        .to_string()
    }

    fn try_parse(text: &str) -> Result<Self, TokenParseError> {
        let map = parse_object(text)?;
        let limit_count = required_u64(&map, LIMIT_COUNT_KEY)?;
        let source_token = required_nullable_string(&map, SOURCE_TOKEN_KEY)?;
        Ok(Self::new(limit_count, source_token))
    }
}

impl fmt::Display for TakeContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for TakeContinuationToken {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}
