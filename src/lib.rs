// ============================================================================
// docfeed Library
// ============================================================================

//! Resumable paging for document database queries and change feeds.
//!
//! The centerpiece is the continuation-token family: small JSON cursors that
//! let a caller stop reading a paged query and resume later exactly where it
//! left off, even across process restarts.
//!
//! # Examples
//!
//! ```
//! use docfeed::{ContinuationToken, OffsetContinuationToken};
//!
//! let token = OffsetContinuationToken::new(42, Some("asdf".to_string()));
//! let parsed = OffsetContinuationToken::try_parse(&token.encode()).unwrap();
//! assert_eq!(parsed.offset(), 42);
//! assert_eq!(parsed.source_token(), Some("asdf"));
//!
//! assert!(OffsetContinuationToken::try_parse(r#"{"property": "Not a valid token"}"#).is_err());
//! ```

pub mod core;
pub mod token;
pub mod feed;
pub mod query;
pub mod change_feed;
pub mod memory;

// Re-export main types for convenience
pub use self::core::{FeedError, Result, StatusCode, TokenParseError};
pub use token::{ContinuationToken, OffsetContinuationToken, TakeContinuationToken, TokenLayers};

// Re-export paging API
pub use feed::{FeedOptions, FeedPage, FeedPager, FeedSummary, PageSource, QueryMetrics};
pub use query::{OffsetLimit, OffsetLimitPager};
pub use change_feed::{
    ChangeFeedContinuation, ChangeFeedItem, ChangeFeedMode, ChangeFeedOptions, ChangeFeedPage,
    ChangeFeedPager, ChangeFeedRequest, ChangeFeedSource, ChangeFeedStartFrom, ChangeMetadata,
    OperationType,
};
pub use memory::InMemoryContainer;
