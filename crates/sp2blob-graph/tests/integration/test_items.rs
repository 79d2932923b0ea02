//! Downloads, deletes and 429 handling

use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use sp2blob_core::domain::RemoteItem;
use sp2blob_core::ports::ByteStream;
use sp2blob_graph::GraphError;

use crate::common::{setup_graph_mock, TEST_TOKEN};

async fn collect(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

#[tokio::test]
async fn test_download_via_preauthenticated_url_sends_no_token() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/download/a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pdf-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let item = RemoteItem::file("1", "a.pdf", 9)
        .with_download_ref(format!("{}/download/a", server.uri()));
    let stream = client.open_download("d1", &item).await.unwrap();
    assert_eq!(collect(stream).await, b"pdf-bytes");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_download_falls_back_to_content_endpoint() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/drives/d1/items/1/content"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let item = RemoteItem::file("1", "a.pdf", 5);
    let stream = client.open_download("d1", &item).await.unwrap();
    assert_eq!(collect(stream).await, b"hello");
}

#[tokio::test]
async fn test_expired_download_url_falls_back_to_content() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/download/stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drives/d1/items/1/content"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let item = RemoteItem::file("1", "a.pdf", 5)
        .with_download_ref(format!("{}/download/stale", server.uri()));
    let stream = client.open_download("d1", &item).await.unwrap();
    assert_eq!(collect(stream).await, b"fresh");
}

#[tokio::test]
async fn test_fallback_failure_is_reported() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/download/gone"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drives/d1/items/1/content"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let item = RemoteItem::file("1", "a.pdf", 5)
        .with_download_ref(format!("{}/download/gone", server.uri()));
    let err = client.open_download("d1", &item).await.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_item() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/drives/d1/items/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_item("d1", "42").await.unwrap();
}

#[tokio::test]
async fn test_429_is_retried_after_delay() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/drives/d1/root/children"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drives/d1/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let items = client
        .list_children("d1", &sp2blob_core::domain::RemoteFolderPath::root())
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_429_retry_budget_is_bounded() {
    let (server, client) = setup_graph_mock().await;
    let client = client.with_max_retries(1);
    Mock::given(method("DELETE"))
        .and(path("/drives/d1/items/42"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let err = client.delete_item("d1", "42").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::TooManyRequests { .. })
    ));
}
