use crate::core::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Counters reported alongside a page when query metrics are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetrics {
    pub retrieved_document_count: u64,
    pub output_document_count: u64,
}

impl QueryMetrics {
    pub fn merge(&mut self, other: &QueryMetrics) {
        self.retrieved_document_count += other.retrieved_document_count;
        self.output_document_count += other.output_document_count;
    }
}

/// One batch of results plus its response metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage<T> {
    pub results: Vec<T>,
    pub request_charge: f64,
    /// `None` on the last page
    pub continuation: Option<String>,
    pub activity_id: Option<String>,
    pub query_metrics: Option<QueryMetrics>,
}

impl<T> FeedPage<T> {
    pub fn new(results: Vec<T>, request_charge: f64, continuation: Option<String>) -> Self {
        Self {
            results,
            request_charge,
            continuation,
            activity_id: None,
            query_metrics: None,
        }
    }

    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_query_metrics(mut self, metrics: QueryMetrics) -> Self {
        self.query_metrics = Some(metrics);
        self
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn has_more_results(&self) -> bool {
        self.continuation.is_some()
    }
}

impl FeedPage<JsonValue> {
    /// Deserialize every document into `T`, keeping the page metadata.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<FeedPage<T>> {
        let results = self
            .results
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()?;

        Ok(FeedPage {
            results,
            request_charge: self.request_charge,
            continuation: self.continuation,
            activity_id: self.activity_id,
            query_metrics: self.query_metrics,
        })
    }
}
