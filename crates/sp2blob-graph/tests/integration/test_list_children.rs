//! Paged folder listings through the drive provider

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use sp2blob_core::domain::RemoteFolderPath;
use sp2blob_core::filter::compile_filter;
use sp2blob_core::ports::IDriveProvider;
use sp2blob_core::usecases::{NoopObserver, RecursiveLister};
use sp2blob_graph::provider::GraphDriveProvider;
use sp2blob_graph::GraphError;
use tokio_util::sync::CancellationToken;

use crate::common::{
    file_json, folder_json, mount_children, mount_children_paginated, setup_graph_mock,
};

#[tokio::test]
async fn test_list_root_maps_items() {
    let (server, client) = setup_graph_mock().await;
    mount_children(
        &server,
        "/drives/d1/root/children",
        json!([
            file_json("1", "a.pdf", 10),
            folder_json("2", "Sub"),
            { "id": "3", "name": "odd" }
        ]),
    )
    .await;

    let items = client
        .list_children("d1", &RemoteFolderPath::root())
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert!(items[0].is_file && items[0].size == Some(10));
    assert!(items[1].is_folder);
    assert!(!items[2].is_file && !items[2].is_folder);
}

#[tokio::test]
async fn test_list_follows_next_link() {
    let (server, client) = setup_graph_mock().await;
    mount_children_paginated(
        &server,
        "/drives/d1/root:/Reports:/children",
        json!([file_json("1", "jan.pdf", 1)]),
        json!([file_json("2", "feb.pdf", 2)]),
    )
    .await;

    let items = client
        .list_children("d1", &RemoteFolderPath::parse("Reports"))
        .await
        .unwrap();

    let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["jan.pdf", "feb.pdf"]);
}

#[tokio::test]
async fn test_list_encodes_folder_names() {
    let (server, client) = setup_graph_mock().await;
    mount_children(
        &server,
        "/drives/d1/root:/Q1%20Reports/R%26D:/children",
        json!([file_json("1", "x.pdf", 1)]),
    )
    .await;

    let items = client
        .list_children("d1", &RemoteFolderPath::parse("Q1 Reports/R&D"))
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_list_missing_folder_is_not_found() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/drives/d1/root:/Gone:/children"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "itemNotFound", "message": "The resource could not be found." }
        })))
        .mount(&server)
        .await;

    let err = client
        .list_children("d1", &RemoteFolderPath::parse("Gone"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_recursive_listing_over_graph() {
    let (server, client) = setup_graph_mock().await;
    mount_children(
        &server,
        "/drives/d1/root/children",
        json!([
            file_json("1", "a.pdf", 10),
            file_json("2", "b.docx", 20),
            folder_json("3", "Sub"),
            folder_json("4", "Locked")
        ]),
    )
    .await;
    mount_children(
        &server,
        "/drives/d1/root:/Sub:/children",
        json!([file_json("5", "c.PDF", 30)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/drives/d1/root:/Locked:/children"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": "accessDenied", "message": "Access denied" }
        })))
        .mount(&server)
        .await;

    let provider: Arc<dyn IDriveProvider> =
        Arc::new(GraphDriveProvider::new(Arc::new(client), "d1"));
    let report = RecursiveLister::new(provider)
        .list(
            &RemoteFolderPath::root(),
            &compile_filter("*.pdf").unwrap(),
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let paths: Vec<_> = report
        .entries
        .iter()
        .map(|e| e.destination_path.as_str())
        .collect();
    assert_eq!(paths, vec!["Sub/c.PDF", "a.pdf"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "Locked");
    assert!(report.failures[0].cause.contains("Access denied"));
}

#[tokio::test]
async fn test_connect_resolves_drive() {
    let (server, client) = setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/Finance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "site-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/site-1/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": "drive-docs", "name": "Documents" }]
        })))
        .mount(&server)
        .await;

    let provider = GraphDriveProvider::connect(
        Arc::new(client),
        "https://contoso.sharepoint.com/sites/Finance",
        "Documents",
    )
    .await
    .unwrap();
    assert_eq!(provider.drive_id(), "drive-docs");
}
