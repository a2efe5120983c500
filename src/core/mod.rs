pub mod error;

pub use error::{FeedError, Result, StatusCode, TokenParseError};
