use crate::core::{Result, TokenParseError};
use crate::feed::{FeedOptions, FeedPage, FeedPager, PageSource, QueryMetrics};
use crate::token::{ContinuationToken, OffsetContinuationToken, TakeContinuationToken};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// `OFFSET n LIMIT m` clause of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetLimit {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl OffsetLimit {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    pub fn offset_only(offset: u64) -> Self {
        Self {
            offset,
            limit: None,
        }
    }
}

/// Where a resumed query stands.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResumeState {
    remaining_offset: u64,
    remaining_limit: Option<u64>,
    source_token: Option<String>,
}

/// Applies an OFFSET/LIMIT clause on top of an ordered page source.
///
/// Continuations nest: an optional take layer (remaining limit) wraps an
/// offset layer (remaining skip) which wraps the source's own token. Once the
/// remaining skip reaches zero the offset layer keeps `"offset":0` and only
/// the source token drives paging.
pub struct OffsetLimitPager<S> {
    source: S,
    clause: OffsetLimit,
}

impl<S: PageSource> OffsetLimitPager<S> {
    pub fn new(source: S, clause: OffsetLimit) -> Self {
        Self { source, clause }
    }

    /// Wrap into a lazy [`FeedPager`].
    pub fn into_pager(self, options: FeedOptions) -> FeedPager<Self> {
        FeedPager::new(self, options)
    }

    fn resume_state(
        &self,
        continuation: Option<&str>,
    ) -> std::result::Result<ResumeState, TokenParseError> {
        let Some(text) = continuation else {
            return Ok(ResumeState {
                remaining_offset: self.clause.offset,
                remaining_limit: self.clause.limit,
                source_token: None,
            });
        };

        let (remaining_limit, offset_text) = match self.clause.limit {
            Some(limit) => {
                let take = TakeContinuationToken::try_parse(text)?;
                if take.limit_count() > limit {
                    return Err(TokenParseError::InvalidField {
                        field: "limitCount",
                        reason: format!("{} exceeds the query limit {}", take.limit_count(), limit),
                    });
                }
                let inner = take
                    .source_token()
                    .ok_or(TokenParseError::MissingField("sourceToken"))?
                    .to_string();
                (Some(take.limit_count()), inner)
            }
            None => (None, text.to_string()),
        };

        let offset = OffsetContinuationToken::try_parse(&offset_text)?;
        if offset.offset() > self.clause.offset {
            return Err(TokenParseError::InvalidField {
                field: "offset",
                reason: format!(
                    "{} exceeds the query offset {}",
                    offset.offset(),
                    self.clause.offset
                ),
            });
        }

        // A null source would restart the source from its first page.
        let remaining_offset = offset.offset();
        let source_token = offset
            .into_source_token()
            .ok_or_else(|| TokenParseError::InvalidField {
                field: "sourceToken",
                reason: "must not be null".to_string(),
            })?;

        Ok(ResumeState {
            remaining_offset,
            remaining_limit,
            source_token: Some(source_token),
        })
    }

    fn encode_continuation(state: &ResumeState) -> Option<String> {
        let source_token = state.source_token.clone()?;
        if state.remaining_limit == Some(0) {
            return None;
        }

        let offset =
            OffsetContinuationToken::new(state.remaining_offset, Some(source_token)).encode();
        Some(match state.remaining_limit {
            Some(limit) => TakeContinuationToken::new(limit, Some(offset)).encode(),
            None => offset,
        })
    }
}

#[async_trait]
impl<S: PageSource> PageSource for OffsetLimitPager<S> {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        options: &FeedOptions,
    ) -> Result<FeedPage<JsonValue>> {
        let mut state = self.resume_state(continuation).map_err(|e| {
            warn!(error = %e, "rejected offset/limit continuation");
            e
        })?;

        let mut results = Vec::new();
        let mut request_charge = 0.0;
        let mut activity_id = None;
        let mut metrics = QueryMetrics::default();

        loop {
            if state.remaining_limit == Some(0) {
                state.source_token = None;
                break;
            }

            // Past the skip, there is no point asking for more than the limit allows.
            let mut request_options = options.clone();
            if let (0, Some(limit)) = (state.remaining_offset, state.remaining_limit) {
                let limit = usize::try_from(limit).unwrap_or(usize::MAX);
                request_options.max_item_count = request_options.max_item_count.min(limit);
            }

            let page = self
                .source
                .fetch_page(state.source_token.as_deref(), &request_options)
                .await?;

            request_charge += page.request_charge;
            if page.activity_id.is_some() {
                activity_id = page.activity_id.clone();
            }
            let retrieved = page
                .query_metrics
                .map_or(page.len() as u64, |m| m.retrieved_document_count);
            metrics.merge(&QueryMetrics {
                retrieved_document_count: retrieved,
                output_document_count: 0,
            });

            let fetched = page.results.len() as u64;
            let skipped = state.remaining_offset.min(fetched);
            state.remaining_offset -= skipped;

            let mut emitted = 0u64;
            for item in page.results.into_iter().skip(skipped as usize) {
                if let Some(limit) = state.remaining_limit.as_mut() {
                    if *limit == 0 {
                        break;
                    }
                    *limit -= 1;
                }
                results.push(item);
                emitted += 1;
            }

            debug!(
                fetched,
                skipped,
                emitted,
                remaining_offset = state.remaining_offset,
                "offset/limit page"
            );

            state.source_token = page.continuation;
            if !results.is_empty() || state.source_token.is_none() {
                break;
            }
        }

        metrics.output_document_count = results.len() as u64;

        let mut page = FeedPage::new(results, request_charge, Self::encode_continuation(&state));
        page.activity_id = activity_id;
        if options.query_metrics_enabled {
            page.query_metrics = Some(metrics);
        }
        Ok(page)
    }
}
