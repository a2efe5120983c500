//! Paged query feeds
//!
//! - `options.rs` - request options (page size, parallelism, metrics)
//! - `page.rs` - one page of results with charge and continuation
//! - `pager.rs` - lazy, resumable sequence of pages over a `PageSource`

mod options;
mod page;
mod pager;

pub use options::FeedOptions;
pub use page::{FeedPage, QueryMetrics};
pub use pager::{FeedPager, FeedSummary};

use crate::core::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Anything that can serve pages of documents for a query.
///
/// `continuation` is `None` for the first page and otherwise a token this
/// source returned earlier. A source must reject tokens it cannot interpret
/// with an error rather than restarting from the beginning.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        options: &FeedOptions,
    ) -> Result<FeedPage<JsonValue>>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for &T {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        options: &FeedOptions,
    ) -> Result<FeedPage<JsonValue>> {
        (**self).fetch_page(continuation, options).await
    }
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for Arc<T> {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        options: &FeedOptions,
    ) -> Result<FeedPage<JsonValue>> {
        (**self).fetch_page(continuation, options).await
    }
}
