/// Per-request options for paged queries.
///
/// Mirrors the knobs a document database client exposes on its query
/// request options.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOptions {
    /// Maximum number of items per page
    pub max_item_count: usize,

    /// Degree of parallelism for cross-partition reads.
    /// `0` lets the source decide, negative means unbounded.
    pub max_degree_of_parallelism: i32,

    /// Whether pages should carry query metrics
    pub query_metrics_enabled: bool,
}

impl FeedOptions {
    pub fn new() -> Self {
        Self {
            max_item_count: 100,
            max_degree_of_parallelism: 0,
            query_metrics_enabled: false,
        }
    }

    /// Set the page size
    pub fn max_item_count(mut self, count: usize) -> Self {
        self.max_item_count = count;
        self
    }

    /// Set the degree of parallelism
    pub fn max_degree_of_parallelism(mut self, degree: i32) -> Self {
        self.max_degree_of_parallelism = degree;
        self
    }

    /// Enable or disable query metrics
    pub fn query_metrics_enabled(mut self, enabled: bool) -> Self {
        self.query_metrics_enabled = enabled;
        self
    }

    /// Validate options
    pub fn validate(&self) -> Result<(), String> {
        if self.max_item_count == 0 {
            return Err("max_item_count must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self::new()
    }
}
