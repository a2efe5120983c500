use super::{FeedOptions, FeedPage, PageSource};
use crate::core::{FeedError, Result};
use futures::Stream;
use serde_json::Value as JsonValue;
use tracing::{Instrument, debug, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerState {
    NotStarted,
    InProgress,
    Done,
}

/// Everything a pager produced, drained in one go.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSummary {
    pub items: Vec<JsonValue>,
    pub request_charge: f64,
    pub page_count: usize,
}

/// Lazy sequence of pages over a [`PageSource`].
///
/// Nothing is fetched until the first `next_page` call. The pager can be
/// restarted from any continuation it handed out via `with_continuation`.
pub struct FeedPager<S> {
    source: S,
    options: FeedOptions,
    continuation: Option<String>,
    state: PagerState,
}

impl<S: PageSource> FeedPager<S> {
    pub fn new(source: S, options: FeedOptions) -> Self {
        Self {
            source,
            options,
            continuation: None,
            state: PagerState::NotStarted,
        }
    }

    /// Resume from a continuation returned by an earlier page.
    pub fn with_continuation(mut self, continuation: impl Into<String>) -> Self {
        self.continuation = Some(continuation.into());
        self
    }

    /// Continuation to resume after the last page handed out.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.state == PagerState::Done
    }

    /// Fetch the next page, or `Ok(None)` once the feed is exhausted.
    ///
    /// An error ends the sequence.
    pub async fn next_page(&mut self) -> Result<Option<FeedPage<JsonValue>>> {
        if self.state == PagerState::Done {
            return Ok(None);
        }

        if self.state == PagerState::NotStarted {
            if let Err(e) = self.options.validate() {
                self.state = PagerState::Done;
                return Err(FeedError::InvalidOptions(e));
            }
            self.state = PagerState::InProgress;
        }

        let span = info_span!(
            "feed.fetch_page",
            max_item_count = self.options.max_item_count,
            max_degree_of_parallelism = self.options.max_degree_of_parallelism,
            resumed = self.continuation.is_some()
        );

        let page = match self
            .source
            .fetch_page(self.continuation.as_deref(), &self.options)
            .instrument(span)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "feed page fetch failed");
                self.state = PagerState::Done;
                return Err(e);
            }
        };

        debug!(
            items = page.len(),
            request_charge = page.request_charge,
            has_more = page.has_more_results(),
            "feed page fetched"
        );

        self.continuation = page.continuation.clone();
        if self.continuation.is_none() {
            self.state = PagerState::Done;
        }

        Ok(Some(page))
    }

    /// Turn the pager into a stream of pages.
    ///
    /// Failures are yielded as stream items; the stream ends after one.
    pub fn into_stream(self) -> impl Stream<Item = Result<FeedPage<JsonValue>>> {
        futures::stream::unfold(self, |mut pager| async move {
            match pager.next_page().await {
                Ok(Some(page)) => Some((Ok(page), pager)),
                Ok(None) => None,
                Err(e) => Some((Err(e), pager)),
            }
        })
    }

    /// Drain every remaining page.
    pub async fn collect_all(mut self) -> Result<FeedSummary> {
        let mut summary = FeedSummary {
            items: Vec::new(),
            request_charge: 0.0,
            page_count: 0,
        };

        while let Some(page) = self.next_page().await? {
            summary.request_charge += page.request_charge;
            summary.page_count += 1;
            summary.items.extend(page.results);
        }

        Ok(summary)
    }
}
