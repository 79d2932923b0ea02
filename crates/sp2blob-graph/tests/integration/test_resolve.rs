//! Site and document library resolution

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use sp2blob_graph::GraphError;

use crate::common::{setup_graph_mock, TEST_TOKEN};

#[tokio::test]
async fn test_resolve_site_by_path() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/Finance"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "contoso.sharepoint.com,site-guid,web-guid",
            "displayName": "Finance"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client
        .resolve_site("https://contoso.sharepoint.com/sites/Finance")
        .await
        .unwrap();
    assert_eq!(id, "contoso.sharepoint.com,site-guid,web-guid");
}

#[tokio::test]
async fn test_resolve_root_site() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "root-site" })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client
        .resolve_site("https://contoso.sharepoint.com/")
        .await
        .unwrap();
    assert_eq!(id, "root-site");
}

#[tokio::test]
async fn test_resolve_site_not_found() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/Nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "itemNotFound", "message": "Requested site could not be found" }
        })))
        .mount(&server)
        .await;

    let err = client
        .resolve_site("https://contoso.sharepoint.com/sites/Nope")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::NotFound(msg)) if msg == "Requested site could not be found"
    ));
}

#[tokio::test]
async fn test_resolve_drive_by_name_across_pages() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/site-1/drives"))
        .and(query_param("$skiptoken", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "drive-invoices",
                "name": "Invoices",
                "webUrl": "https://contoso.sharepoint.com/sites/Finance/Invoices"
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sites/site-1/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "drive-docs",
                "name": "Documents",
                "webUrl": "https://contoso.sharepoint.com/sites/Finance/Shared%20Documents"
            }],
            "@odata.nextLink": format!("{}/sites/site-1/drives?$skiptoken=2", server.uri())
        })))
        .mount(&server)
        .await;

    let drive = client.resolve_drive("site-1", "invoices").await.unwrap();
    assert_eq!(drive.id, "drive-invoices");

    let drive = client
        .resolve_drive("site-1", "Shared Documents")
        .await
        .unwrap();
    assert_eq!(drive.id, "drive-docs");
    assert_eq!(drive.name, "Documents");
}

#[tokio::test]
async fn test_resolve_drive_missing_lists_available() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/site-1/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "id": "a", "name": "Documents" },
                { "id": "b", "name": "Archive" }
            ]
        })))
        .mount(&server)
        .await;

    let err = client.resolve_drive("site-1", "Reports").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Reports"), "{msg}");
    assert!(msg.contains("Documents, Archive"), "{msg}");
}
