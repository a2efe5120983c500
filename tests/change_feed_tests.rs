/// Change feed tests
///
/// Latest-version and full-fidelity change feed reads against an in-memory container.
/// Run with: cargo test --test change_feed_tests
use docfeed::{
    ChangeFeedContinuation, ChangeFeedMode, ChangeFeedOptions, ChangeFeedPager, ChangeFeedRequest,
    ChangeFeedSource, ChangeFeedStartFrom, ContinuationToken, FeedError, InMemoryContainer,
    OperationType, StatusCode,
};
use serde_json::json;

fn ids(items: &[docfeed::ChangeFeedItem]) -> Vec<&str> {
    items.iter().filter_map(|item| item.document_id()).collect()
}

#[tokio::test]
async fn test_latest_version_from_beginning_collapses_history() {
    let container = InMemoryContainer::new("orders");
    container.upsert_item(json!({"id": "a", "v": 1})).await.unwrap();
    container.upsert_item(json!({"id": "b", "v": 1})).await.unwrap();
    container.upsert_item(json!({"id": "a", "v": 2})).await.unwrap();
    container.delete_item("b").await.unwrap();
    container.upsert_item(json!({"id": "c", "v": 1})).await.unwrap();

    let options = ChangeFeedOptions::new().start_from(ChangeFeedStartFrom::Beginning);
    let mut pager = ChangeFeedPager::new(&container, options);
    let page = pager.next_page().await.unwrap();

    assert_eq!(ids(&page.items), vec!["a", "c"]);
    assert_eq!(page.items[0].current, Some(json!({"id": "a", "v": 2})));
    assert_eq!(page.items[0].metadata.operation_type, OperationType::Replace);
    assert!(page.items.iter().all(|item| item.previous.is_none()));

    assert_eq!(page.status_code(), StatusCode::OK);
    let caught_up = pager.next_page().await.unwrap();
    assert!(caught_up.is_not_modified());
    assert_eq!(caught_up.status_code(), StatusCode::NOT_MODIFIED);
    assert_eq!(caught_up.continuation, page.continuation);
}

#[tokio::test]
async fn test_start_from_now_skips_existing_changes() {
    let container = InMemoryContainer::new("orders");
    container.upsert_item(json!({"id": "old"})).await.unwrap();

    let mut pager = ChangeFeedPager::new(&container, ChangeFeedOptions::new());
    assert!(pager.next_page().await.unwrap().is_not_modified());

    container.upsert_item(json!({"id": "new"})).await.unwrap();
    let page = pager.next_page().await.unwrap();
    assert_eq!(ids(&page.items), vec!["new"]);
}

#[tokio::test]
async fn test_resume_from_saved_continuation() {
    let container = InMemoryContainer::new("orders");
    for i in 0..5 {
        container.upsert_item(json!({"id": format!("d{}", i)})).await.unwrap();
    }

    let options = ChangeFeedOptions::new()
        .start_from(ChangeFeedStartFrom::Beginning)
        .max_item_count(2);
    let mut first = ChangeFeedPager::new(&container, options.clone());
    let page = first.next_page().await.unwrap();
    assert_eq!(ids(&page.items), vec!["d0", "d1"]);
    let saved = first.continuation().unwrap().to_string();

    let resumed_options = options.start_from(ChangeFeedStartFrom::Continuation(saved));
    let mut second = ChangeFeedPager::new(&container, resumed_options);
    let rest = second.drain().await.unwrap();
    assert_eq!(ids(&rest), vec!["d2", "d3", "d4"]);
}

#[tokio::test]
async fn test_full_fidelity_reports_every_operation() {
    let container = InMemoryContainer::new("orders");
    let options = ChangeFeedOptions::new().mode(ChangeFeedMode::FullFidelity);
    let mut pager = ChangeFeedPager::new(&container, options);
    assert!(pager.next_page().await.unwrap().is_not_modified());

    container.create_item(json!({"id": "x", "v": 1})).await.unwrap();
    container.replace_item(json!({"id": "x", "v": 2})).await.unwrap();
    container.delete_item("x").await.unwrap();

    let changes = pager.drain().await.unwrap();
    let operations: Vec<OperationType> =
        changes.iter().map(|c| c.metadata.operation_type).collect();
    assert_eq!(
        operations,
        vec![OperationType::Create, OperationType::Replace, OperationType::Delete]
    );

    let replace = &changes[1];
    assert_eq!(replace.previous, Some(json!({"id": "x", "v": 1})));
    assert_eq!(replace.metadata.previous_lsn, Some(changes[0].metadata.lsn));

    let delete = &changes[2];
    assert!(delete.current.is_none());
    assert_eq!(delete.previous, Some(json!({"id": "x", "v": 2})));
    assert_eq!(delete.document_id(), Some("x"));
    assert!(changes.windows(2).all(|w| w[0].metadata.lsn < w[1].metadata.lsn));
}

#[tokio::test]
async fn test_full_fidelity_from_beginning_is_rejected() {
    let container = InMemoryContainer::new("orders");
    let options = ChangeFeedOptions::new()
        .mode(ChangeFeedMode::FullFidelity)
        .start_from(ChangeFeedStartFrom::Beginning);

    let mut pager = ChangeFeedPager::new(&container, options);
    assert!(matches!(pager.next_page().await, Err(FeedError::InvalidOptions(_))));

    let request = ChangeFeedRequest {
        start_from: ChangeFeedStartFrom::Beginning,
        mode: ChangeFeedMode::FullFidelity,
        max_item_count: 10,
    };
    let err = container.read_changes(&request).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_change_feed_continuations() {
    let container = InMemoryContainer::new("orders");
    container.upsert_item(json!({"id": "a"})).await.unwrap();

    for token in [
        "{\"property\": \"Not a valid token\"}".to_string(),
        ChangeFeedContinuation { lsn: 99 }.encode(),
    ] {
        let request = ChangeFeedRequest {
            start_from: ChangeFeedStartFrom::Continuation(token),
            mode: ChangeFeedMode::LatestVersion,
            max_item_count: 10,
        };
        let err = container.read_changes(&request).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_change_feed_failure_keeps_position() {
    let container = InMemoryContainer::new("orders");
    container.upsert_item(json!({"id": "a"})).await.unwrap();

    let options = ChangeFeedOptions::new().start_from(ChangeFeedStartFrom::Beginning);
    let mut pager = ChangeFeedPager::new(&container, options);

    container.fail_next_fetch(StatusCode::GONE).await;
    let err = pager.next_page().await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::GONE);
    assert!(pager.continuation().is_none());

    let page = pager.next_page().await.unwrap();
    assert_eq!(ids(&page.items), vec!["a"]);
}
