//! Create-if-missing container handling

use std::sync::Arc;

use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sp2blob_core::ports::{ContainerStatus, ITokenSource, STORAGE_SCOPE};
use sp2blob_storage::blob::BlobClient;
use sp2blob_storage::StorageError;

use crate::common::{setup_blob_mock, CONTAINER, TEST_TOKEN};

#[tokio::test]
async fn test_container_created() {
    let (server, client) = setup_blob_mock().await;
    Mock::given(method("PUT"))
        .and(path("/invoices"))
        .and(query_param("restype", "container"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .and(header("x-ms-version", "2021-08-06"))
        .and(header_exists("x-ms-date"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(
        client.ensure_container().await.unwrap(),
        ContainerStatus::Created
    );
}

#[tokio::test]
async fn test_existing_container_is_fine() {
    let (server, client) = setup_blob_mock().await;
    Mock::given(method("PUT"))
        .and(path("/invoices"))
        .respond_with(
            ResponseTemplate::new(409).append_header("x-ms-error-code", "ContainerAlreadyExists"),
        )
        .mount(&server)
        .await;

    assert_eq!(
        client.ensure_container().await.unwrap(),
        ContainerStatus::AlreadyExists
    );
}

#[tokio::test]
async fn test_container_being_deleted_is_an_error() {
    let (server, client) = setup_blob_mock().await;
    Mock::given(method("PUT"))
        .and(path("/invoices"))
        .respond_with(
            ResponseTemplate::new(409).append_header("x-ms-error-code", "ContainerBeingDeleted"),
        )
        .mount(&server)
        .await;

    let err = client.ensure_container().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StorageError>(),
        Some(StorageError::ContainerBeingDeleted)
    ));
}

#[tokio::test]
async fn test_missing_role_is_forbidden() {
    let (server, client) = setup_blob_mock().await;
    Mock::given(method("PUT"))
        .and(path("/invoices"))
        .respond_with(
            ResponseTemplate::new(403)
                .append_header("x-ms-error-code", "AuthorizationPermissionMismatch"),
        )
        .mount(&server)
        .await;

    let err = client.ensure_container().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StorageError>(),
        Some(StorageError::Forbidden { code }) if code == "AuthorizationPermissionMismatch"
    ));
}

/// Hands out a token only for the storage scope
struct StorageOnlyTokens;

#[async_trait::async_trait]
impl ITokenSource for StorageOnlyTokens {
    async fn bearer_token(&self, scope: &str) -> anyhow::Result<String> {
        if scope == STORAGE_SCOPE {
            Ok("scoped-token".to_string())
        } else {
            anyhow::bail!("unexpected scope {scope}")
        }
    }
}

#[tokio::test]
async fn test_requests_use_storage_scope() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/invoices"))
        .and(header("authorization", "Bearer scoped-token"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlobClient::new(server.uri(), CONTAINER, Arc::new(StorageOnlyTokens));
    assert_eq!(
        client.ensure_container().await.unwrap(),
        ContainerStatus::Created
    );
}
