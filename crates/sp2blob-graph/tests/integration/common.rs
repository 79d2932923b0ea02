//! Shared test helpers for Graph API integration tests
//!
//! Provides wiremock-based mock server setup for Microsoft Graph API endpoints.
//! Each helper mounts the necessary mock endpoints; [`setup_graph_mock`]
//! returns a GraphClient pointing at the mock server.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sp2blob_core::ports::StaticTokenSource;
use sp2blob_graph::client::GraphClient;

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and returns a (MockServer, GraphClient) tuple.
///
/// The client authenticates with a static [`TEST_TOKEN`].
pub async fn setup_graph_mock() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;
    let client = GraphClient::with_base_url(
        Arc::new(StaticTokenSource::new(TEST_TOKEN)),
        server.uri(),
    );
    (server, client)
}

/// A file entry as returned by the children endpoint
pub fn file_json(id: &str, name: &str, size: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "size": size,
        "lastModifiedDateTime": "2024-03-01T10:00:00Z",
        "file": { "mimeType": "application/octet-stream" }
    })
}

/// A folder entry as returned by the children endpoint
pub fn folder_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "folder": { "childCount": 1 }
    })
}

/// Mounts a children listing that returns a single page.
pub async fn mount_children(server: &MockServer, url_path: &str, items: Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": items })))
        .mount(server)
        .await;
}

/// Mounts a children listing split over two pages.
///
/// The first page carries an absolute `@odata.nextLink` with
/// `$skiptoken=page2`; the second page ends the collection.
pub async fn mount_children_paginated(
    server: &MockServer,
    url_path: &str,
    page1_items: Value,
    page2_items: Value,
) {
    // Page 2 is mounted first so the more specific matcher wins
    Mock::given(method("GET"))
        .and(path(url_path))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": page2_items })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": page1_items,
            "@odata.nextLink": format!("{}{}?$skiptoken=page2", server.uri(), url_path)
        })))
        .expect(1)
        .mount(server)
        .await;
}
