//! Change feed contract
//!
//! A change feed is an ordered, never-ending stream of document changes. It is
//! read page by page; every page carries a continuation to resume from, and an
//! empty page means the reader has caught up with the container.

mod pager;

pub use pager::ChangeFeedPager;

use crate::core::{Result, StatusCode, TokenParseError};
use crate::token::{ContinuationToken, parse_object, required_u64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

/// Where a change feed read starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeFeedStartFrom {
    Beginning,
    Now,
    Continuation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeFeedMode {
    /// Latest state of each changed document, deletes omitted
    #[default]
    LatestVersion,
    /// Every create, replace and delete with metadata
    FullFidelity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Replace,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMetadata {
    pub operation_type: OperationType,
    pub lsn: u64,
    #[serde(rename = "previousImageLSN", skip_serializing_if = "Option::is_none", default)]
    pub previous_lsn: Option<u64>,
    /// Commit time, seconds since the Unix epoch
    #[serde(rename = "crts")]
    pub timestamp: i64,
    #[serde(default)]
    pub time_to_live_expired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeFeedItem {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous: Option<JsonValue>,
    pub metadata: ChangeMetadata,
}

impl ChangeFeedItem {
    /// Id of the changed document, taken from whichever image is present.
    pub fn document_id(&self) -> Option<&str> {
        self.current
            .as_ref()
            .or(self.previous.as_ref())
            .and_then(|doc| doc.get("id"))
            .and_then(JsonValue::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFeedOptions {
    pub start_from: ChangeFeedStartFrom,
    pub mode: ChangeFeedMode,
    pub max_item_count: usize,
}

impl ChangeFeedOptions {
    pub fn new() -> Self {
        Self {
            start_from: ChangeFeedStartFrom::Now,
            mode: ChangeFeedMode::LatestVersion,
            max_item_count: 100,
        }
    }

    pub fn start_from(mut self, start_from: ChangeFeedStartFrom) -> Self {
        self.start_from = start_from;
        self
    }

    pub fn mode(mut self, mode: ChangeFeedMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn max_item_count(mut self, count: usize) -> Self {
        self.max_item_count = count;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_item_count == 0 {
            return Err("max_item_count must be > 0".to_string());
        }

        if self.mode == ChangeFeedMode::FullFidelity
            && self.start_from == ChangeFeedStartFrom::Beginning
        {
            return Err("full fidelity change feed cannot start from the beginning".to_string());
        }

        Ok(())
    }
}

impl Default for ChangeFeedOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A single read against a change feed source.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFeedRequest {
    pub start_from: ChangeFeedStartFrom,
    pub mode: ChangeFeedMode,
    pub max_item_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFeedPage {
    pub items: Vec<ChangeFeedItem>,
    /// Always present: the change feed never ends
    pub continuation: String,
    pub request_charge: f64,
    pub activity_id: Option<String>,
}

impl ChangeFeedPage {
    /// `304 Not Modified` when the read found no new changes, `200` otherwise.
    pub fn status_code(&self) -> u16 {
        if self.items.is_empty() {
            StatusCode::NOT_MODIFIED
        } else {
            StatusCode::OK
        }
    }

    /// No new changes since the request's start point.
    pub fn is_not_modified(&self) -> bool {
        self.status_code() == StatusCode::NOT_MODIFIED
    }
}

#[async_trait]
pub trait ChangeFeedSource: Send + Sync {
    async fn read_changes(&self, request: &ChangeFeedRequest) -> Result<ChangeFeedPage>;
}

#[async_trait]
impl<T: ChangeFeedSource + ?Sized> ChangeFeedSource for &T {
    async fn read_changes(&self, request: &ChangeFeedRequest) -> Result<ChangeFeedPage> {
        (**self).read_changes(request).await
    }
}

#[async_trait]
impl<T: ChangeFeedSource + ?Sized> ChangeFeedSource for Arc<T> {
    async fn read_changes(&self, request: &ChangeFeedRequest) -> Result<ChangeFeedPage> {
        (**self).read_changes(request).await
    }
}

const LSN_KEY: &str = "lsn";

/// Change feed resume point: every change after `lsn` is still unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFeedContinuation {
    pub lsn: u64,
}

impl ContinuationToken for ChangeFeedContinuation {
    fn encode(&self) -> String {
        json!({ LSN_KEY: self.lsn }).to_string()
    }

    fn try_parse(text: &str) -> std::result::Result<Self, TokenParseError> {
        let map = parse_object(text)?;
        Ok(Self {
            lsn: required_u64(&map, LSN_KEY)?,
        })
    }
}
