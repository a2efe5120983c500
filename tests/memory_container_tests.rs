/// In-memory container tests
///
/// Query paging, typed pages and error reporting of `InMemoryContainer`.
/// Run with: cargo test --test memory_container_tests
use docfeed::{FeedError, FeedOptions, FeedPager, InMemoryContainer, PageSource, StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct Family {
    id: String,
    size: u32,
}

#[tokio::test]
async fn test_pages_follow_document_id_order() {
    let container = InMemoryContainer::new("families");
    for id in ["c", "a", "b"] {
        container.create_item(json!({"id": id, "size": 1})).await.unwrap();
    }

    let summary = FeedPager::new(&container, FeedOptions::new().max_item_count(2))
        .collect_all()
        .await
        .unwrap();

    let ids: Vec<&str> = summary.items.iter().map(|d| d["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(summary.page_count, 2);
    assert_eq!(summary.request_charge, (2.0 + 0.5) + (2.0 + 0.25));
}

#[tokio::test]
async fn test_each_response_has_its_own_activity_id() {
    let container = InMemoryContainer::new("families");
    container.create_item(json!({"id": "a", "size": 1})).await.unwrap();

    let options = FeedOptions::default();
    let first = container.fetch_page(None, &options).await.unwrap();
    let second = container.fetch_page(None, &options).await.unwrap();
    assert!(first.activity_id.is_some());
    assert_ne!(first.activity_id, second.activity_id);
}

#[tokio::test]
async fn test_continuation_is_stable_under_concurrent_inserts() {
    let container = InMemoryContainer::new("families");
    for id in ["b", "d"] {
        container.create_item(json!({"id": id, "size": 1})).await.unwrap();
    }

    let options = FeedOptions::new().max_item_count(1);
    let first = container.fetch_page(None, &options).await.unwrap();
    assert_eq!(first.results[0]["id"], "b");

    // Inserting before the cursor must not shift the next page.
    container.create_item(json!({"id": "a", "size": 1})).await.unwrap();
    let second = container
        .fetch_page(first.continuation.as_deref(), &options)
        .await
        .unwrap();
    assert_eq!(second.results[0]["id"], "d");
    assert!(second.continuation.is_none());
}

#[tokio::test]
async fn test_typed_pages() {
    let container = InMemoryContainer::new("families");
    container.create_item(json!({"id": "smith", "size": 4})).await.unwrap();

    let page = container
        .fetch_page(None, &FeedOptions::default())
        .await
        .unwrap()
        .into_typed::<Family>()
        .unwrap();
    assert_eq!(page.results, vec![Family { id: "smith".into(), size: 4 }]);
}

#[tokio::test]
async fn test_unknown_continuation_is_rejected() {
    let container = InMemoryContainer::new("families");
    let err = container
        .fetch_page(Some("{\"property\": \"Not a valid token\"}"), &FeedOptions::default())
        .await
        .unwrap_err();

    match err {
        FeedError::Service { status_code, activity_id, .. } => {
            assert_eq!(status_code, StatusCode::BAD_REQUEST);
            assert!(!activity_id.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_container_yields_single_terminal_page() {
    let container = InMemoryContainer::new("families");
    let summary = FeedPager::new(&container, FeedOptions::default())
        .collect_all()
        .await
        .unwrap();

    assert_eq!(summary.page_count, 1);
    assert!(summary.items.is_empty());
    assert_eq!(summary.request_charge, 2.0);
}

#[tokio::test]
async fn test_query_metrics_only_when_enabled() {
    let container = InMemoryContainer::new("families");
    container.create_item(json!({"id": "a", "size": 1})).await.unwrap();

    let plain = container.fetch_page(None, &FeedOptions::default()).await.unwrap();
    assert!(plain.query_metrics.is_none());

    let with_metrics = container
        .fetch_page(None, &FeedOptions::new().query_metrics_enabled(true))
        .await
        .unwrap();
    assert_eq!(with_metrics.query_metrics.unwrap().output_document_count, 1);
}
