//! Client-credentials token acquisition and caching

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sp2blob_core::config::SecretString;
use sp2blob_core::ports::ITokenSource;
use sp2blob_graph::auth::{
    ClientCredentialsConfig, ServicePrincipalAuth, GRAPH_SCOPE, STORAGE_SCOPE,
};

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

fn auth_for(server: &MockServer) -> ServicePrincipalAuth {
    ServicePrincipalAuth::new(&ClientCredentialsConfig {
        tenant_id: "tenant-1".into(),
        client_id: "app-id".into(),
        client_secret: SecretString::new("s3cret"),
        authority_host: server.uri(),
    })
    .unwrap()
}

fn token_response(token: &str, expires_in: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": expires_in
    }))
}

#[tokio::test]
async fn test_client_credentials_grant_with_secret_in_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app-id"))
        .and(body_string_contains("client_secret=s3cret"))
        .respond_with(token_response("graph-token", 3599))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    assert_eq!(auth.bearer_token(GRAPH_SCOPE).await.unwrap(), "graph-token");
}

#[tokio::test]
async fn test_tokens_are_cached_per_scope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("graph.microsoft.com"))
        .respond_with(token_response("graph-token", 3599))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("storage.azure.com"))
        .respond_with(token_response("storage-token", 3599))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    for _ in 0..3 {
        assert_eq!(auth.bearer_token(GRAPH_SCOPE).await.unwrap(), "graph-token");
        assert_eq!(
            auth.bearer_token(STORAGE_SCOPE).await.unwrap(),
            "storage-token"
        );
    }
}

#[tokio::test]
async fn test_short_lived_token_is_renewed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(token_response("short", 60))
        .expect(2)
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    auth.bearer_token(GRAPH_SCOPE).await.unwrap();
    auth.bearer_token(GRAPH_SCOPE).await.unwrap();
}

#[tokio::test]
async fn test_rejected_credentials_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let err = auth_for(&server)
        .bearer_token(GRAPH_SCOPE)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to acquire access token"));
}
