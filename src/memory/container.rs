use crate::change_feed::{
    ChangeFeedContinuation, ChangeFeedItem, ChangeFeedMode, ChangeFeedPage, ChangeFeedRequest,
    ChangeFeedSource, ChangeFeedStartFrom, ChangeMetadata, OperationType,
};
use crate::core::{FeedError, Result, StatusCode, TokenParseError};
use crate::feed::{FeedOptions, FeedPage, PageSource, QueryMetrics};
use crate::token::{ContinuationToken, parse_object, required_nullable_string};
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

const BASE_CHARGE: f64 = 2.0;
const PER_ITEM_CHARGE: f64 = 0.25;
const LAST_ID_KEY: &str = "lastId";

struct StoredDocument {
    body: JsonValue,
    lsn: u64,
}

struct ChangeRecord {
    id: String,
    operation: OperationType,
    current: Option<JsonValue>,
    previous: Option<JsonValue>,
    lsn: u64,
    previous_lsn: Option<u64>,
    timestamp: i64,
}

#[derive(Default)]
struct ContainerState {
    documents: BTreeMap<String, StoredDocument>,
    /// Ordered by `lsn`; never compacted, so it grows with every write.
    changes: Vec<ChangeRecord>,
    last_lsn: u64,
    pending_failure: Option<u16>,
}

impl ContainerState {
    fn record(&mut self, operation: OperationType, id: String, current: Option<JsonValue>) {
        self.last_lsn += 1;
        let lsn = self.last_lsn;

        let previous = match &current {
            Some(body) => self.documents.insert(
                id.clone(),
                StoredDocument {
                    body: body.clone(),
                    lsn,
                },
            ),
            None => self.documents.remove(&id),
        };

        self.changes.push(ChangeRecord {
            id,
            operation,
            current,
            previous_lsn: previous.as_ref().map(|doc| doc.lsn),
            previous: previous.map(|doc| doc.body),
            lsn,
            timestamp: chrono::Utc::now().timestamp(),
        });
    }

    fn take_failure(&mut self, activity_id: &str) -> Result<()> {
        match self.pending_failure.take() {
            Some(code) => Err(FeedError::service(code, activity_id, "Injected failure")),
            None => Ok(()),
        }
    }
}

/// Single-partition document container held in memory.
///
/// Serves ordered query pages (by document id) and a change feed with
/// monotonically increasing LSNs. Every response gets a fresh activity id.
pub struct InMemoryContainer {
    id: String,
    state: RwLock<ContainerState>,
}

impl InMemoryContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: RwLock::new(ContainerState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Insert a new document; `409` if the id is taken.
    pub async fn create_item(&self, item: JsonValue) -> Result<JsonValue> {
        let activity_id = new_activity_id();
        let id = document_id(&item, &activity_id)?;
        let mut state = self.state.write().await;

        if state.documents.contains_key(&id) {
            return Err(FeedError::service(
                StatusCode::CONFLICT,
                activity_id,
                format!("Entity with the specified id '{}' already exists", id),
            ));
        }

        state.record(OperationType::Create, id, Some(item.clone()));
        Ok(item)
    }

    /// Insert or overwrite a document.
    pub async fn upsert_item(&self, item: JsonValue) -> Result<JsonValue> {
        let activity_id = new_activity_id();
        let id = document_id(&item, &activity_id)?;
        let mut state = self.state.write().await;

        let operation = if state.documents.contains_key(&id) {
            OperationType::Replace
        } else {
            OperationType::Create
        };
        state.record(operation, id, Some(item.clone()));
        Ok(item)
    }

    /// Upsert many documents, returning how many were written.
    pub async fn upsert_items(&self, items: impl IntoIterator<Item = JsonValue>) -> Result<usize> {
        let mut written = 0;
        for item in items {
            self.upsert_item(item).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Overwrite an existing document; `404` if it does not exist.
    pub async fn replace_item(&self, item: JsonValue) -> Result<JsonValue> {
        let activity_id = new_activity_id();
        let id = document_id(&item, &activity_id)?;
        let mut state = self.state.write().await;

        if !state.documents.contains_key(&id) {
            return Err(not_found(&id, activity_id));
        }

        state.record(OperationType::Replace, id, Some(item.clone()));
        Ok(item)
    }

    pub async fn delete_item(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.documents.contains_key(id) {
            return Err(not_found(id, new_activity_id()));
        }

        state.record(OperationType::Delete, id.to_string(), None);
        Ok(())
    }

    pub async fn read_item(&self, id: &str) -> Result<JsonValue> {
        let state = self.state.read().await;
        state
            .documents
            .get(id)
            .map(|doc| doc.body.clone())
            .ok_or_else(|| not_found(id, new_activity_id()))
    }

    pub async fn item_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// Make the next query or change feed read fail with `status_code`.
    pub async fn fail_next_fetch(&self, status_code: u16) {
        self.state.write().await.pending_failure = Some(status_code);
    }
}

#[async_trait]
impl PageSource for InMemoryContainer {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        options: &FeedOptions,
    ) -> Result<FeedPage<JsonValue>> {
        let activity_id = new_activity_id();
        let mut state = self.state.write().await;
        state.take_failure(&activity_id)?;

        if options.max_item_count == 0 {
            return Err(bad_request(activity_id, "max_item_count must be > 0"));
        }

        let lower = match continuation {
            Some(text) => {
                let last_id = parse_query_token(text).map_err(|e| {
                    bad_request(activity_id.clone(), format!("Invalid continuation token: {}", e))
                })?;
                Bound::Excluded(last_id)
            }
            None => Bound::Unbounded,
        };

        let mut documents = state.documents.range((lower, Bound::Unbounded));
        let mut last_id = None;
        let mut results = Vec::new();
        for (id, doc) in documents.by_ref().take(options.max_item_count) {
            results.push(doc.body.clone());
            last_id = Some(id.clone());
        }
        let has_more = documents.next().is_some();

        let continuation = match (has_more, last_id) {
            (true, Some(id)) => Some(json!({ LAST_ID_KEY: id }).to_string()),
            _ => None,
        };

        debug!(
            container = %self.id,
            items = results.len(),
            max_degree_of_parallelism = options.max_degree_of_parallelism,
            "query page served"
        );

        let request_charge = charge_for(results.len());
        let count = results.len() as u64;
        let mut page =
            FeedPage::new(results, request_charge, continuation).with_activity_id(activity_id);
        if options.query_metrics_enabled {
            page = page.with_query_metrics(QueryMetrics {
                retrieved_document_count: count,
                output_document_count: count,
            });
        }
        Ok(page)
    }
}

#[async_trait]
impl ChangeFeedSource for InMemoryContainer {
    async fn read_changes(&self, request: &ChangeFeedRequest) -> Result<ChangeFeedPage> {
        let activity_id = new_activity_id();
        let mut state = self.state.write().await;
        state.take_failure(&activity_id)?;

        if request.max_item_count == 0 {
            return Err(bad_request(activity_id, "max_item_count must be > 0"));
        }

        let after = match &request.start_from {
            ChangeFeedStartFrom::Beginning if request.mode == ChangeFeedMode::FullFidelity => {
                return Err(bad_request(
                    activity_id,
                    "Full fidelity change feed must start from now or a continuation",
                ));
            }
            ChangeFeedStartFrom::Beginning => 0,
            ChangeFeedStartFrom::Now => state.last_lsn,
            ChangeFeedStartFrom::Continuation(text) => {
                let token = ChangeFeedContinuation::try_parse(text).map_err(|e| {
                    bad_request(activity_id.clone(), format!("Invalid continuation token: {}", e))
                })?;
                if token.lsn > state.last_lsn {
                    return Err(bad_request(
                        activity_id,
                        "Continuation token is ahead of the container",
                    ));
                }
                token.lsn
            }
        };

        let head = state.last_lsn;
        let start = state.changes.partition_point(|change| change.lsn <= after);
        let pending = &state.changes[start..];

        let mut selected: Vec<&ChangeRecord> = match request.mode {
            ChangeFeedMode::FullFidelity => pending.iter().collect(),
            ChangeFeedMode::LatestVersion => {
                let mut latest: HashMap<&str, &ChangeRecord> = HashMap::new();
                for change in pending {
                    latest.insert(change.id.as_str(), change);
                }
                let mut versions: Vec<&ChangeRecord> = latest
                    .into_values()
                    .filter(|change| change.operation != OperationType::Delete)
                    .collect();
                versions.sort_by_key(|change| change.lsn);
                versions
            }
        };

        let truncated = selected.len() > request.max_item_count;
        selected.truncate(request.max_item_count);

        let next_lsn = match selected.last() {
            Some(last) if truncated => last.lsn,
            _ => head,
        };

        let items: Vec<ChangeFeedItem> = selected
            .into_iter()
            .map(|change| to_feed_item(change, request.mode))
            .collect();

        debug!(
            container = %self.id,
            items = items.len(),
            from_lsn = after,
            next_lsn,
            "change feed page served"
        );

        Ok(ChangeFeedPage {
            request_charge: charge_for(items.len()),
            items,
            continuation: ChangeFeedContinuation { lsn: next_lsn }.encode(),
            activity_id: Some(activity_id),
        })
    }
}

fn to_feed_item(change: &ChangeRecord, mode: ChangeFeedMode) -> ChangeFeedItem {
    let previous = match mode {
        ChangeFeedMode::FullFidelity => change.previous.clone(),
        ChangeFeedMode::LatestVersion => None,
    };

    ChangeFeedItem {
        current: change.current.clone(),
        previous,
        metadata: ChangeMetadata {
            operation_type: change.operation,
            lsn: change.lsn,
            previous_lsn: change.previous_lsn,
            timestamp: change.timestamp,
            time_to_live_expired: false,
        },
    }
}

fn parse_query_token(text: &str) -> std::result::Result<String, TokenParseError> {
    let map = parse_object(text)?;
    required_nullable_string(&map, LAST_ID_KEY)?.ok_or_else(|| TokenParseError::InvalidField {
        field: LAST_ID_KEY,
        reason: "must not be null".to_string(),
    })
}

fn document_id(item: &JsonValue, activity_id: &str) -> Result<String> {
    item.get("id")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| bad_request(activity_id.to_string(), "Document must contain a string 'id'"))
}

fn charge_for(items: usize) -> f64 {
    BASE_CHARGE + PER_ITEM_CHARGE * items as f64
}

fn new_activity_id() -> String {
    Uuid::new_v4().to_string()
}

fn bad_request(activity_id: String, message: impl Into<String>) -> FeedError {
    FeedError::service(StatusCode::BAD_REQUEST, activity_id, message)
}

fn not_found(id: &str, activity_id: String) -> FeedError {
    FeedError::service(
        StatusCode::NOT_FOUND,
        activity_id,
        format!("Entity with the specified id '{}' does not exist", id),
    )
}
