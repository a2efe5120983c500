use super::{
    ChangeFeedItem, ChangeFeedOptions, ChangeFeedPage, ChangeFeedRequest, ChangeFeedSource,
    ChangeFeedStartFrom,
};
use crate::core::{FeedError, Result};
use tracing::{Instrument, debug, info_span};

/// Pull-style change feed reader.
///
/// Each page moves the read position to the page's continuation, so a reader
/// can stop at any point and persist `continuation()` to pick up later.
pub struct ChangeFeedPager<S> {
    source: S,
    options: ChangeFeedOptions,
    position: ChangeFeedStartFrom,
}

impl<S: ChangeFeedSource> ChangeFeedPager<S> {
    pub fn new(source: S, options: ChangeFeedOptions) -> Self {
        let position = options.start_from.clone();
        Self {
            source,
            options,
            position,
        }
    }

    /// Saved resume point, available once a page has been read
    /// (or when the pager was started from a continuation).
    pub fn continuation(&self) -> Option<&str> {
        match &self.position {
            ChangeFeedStartFrom::Continuation(token) => Some(token),
            _ => None,
        }
    }

    pub async fn next_page(&mut self) -> Result<ChangeFeedPage> {
        self.options.validate().map_err(FeedError::InvalidOptions)?;

        let request = ChangeFeedRequest {
            start_from: self.position.clone(),
            mode: self.options.mode,
            max_item_count: self.options.max_item_count,
        };

        let span = info_span!("change_feed.read", mode = ?request.mode);
        let page = self.source.read_changes(&request).instrument(span).await?;

        debug!(
            items = page.items.len(),
            request_charge = page.request_charge,
            "change feed page read"
        );

        self.position = ChangeFeedStartFrom::Continuation(page.continuation.clone());
        Ok(page)
    }

    /// Read until the feed reports no further changes.
    pub async fn drain(&mut self) -> Result<Vec<ChangeFeedItem>> {
        let mut items = Vec::new();
        loop {
            let page = self.next_page().await?;
            if page.is_not_modified() {
                return Ok(items);
            }
            items.extend(page.items);
        }
    }
}
