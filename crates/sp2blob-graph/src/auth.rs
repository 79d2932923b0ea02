//! Service principal authentication for Microsoft Graph and Azure Storage
//!
//! Implements the OAuth2 client-credentials grant against the Microsoft
//! identity platform. The client secret is sent in the request body and
//! each scope (`<resource>/.default`) gets its own cached token.
//!
//! ## Components
//!
//! - [`ClientCredentialsConfig`] - Tenant, application id, secret, authority
//! - [`ServicePrincipalAuth`] - [`ITokenSource`] with per-scope token cache

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, Scope,
    TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use sp2blob_core::config::{AuthConfig, SecretString};
use sp2blob_core::ports::{ITokenSource, Tokens};

pub use sp2blob_core::ports::{GRAPH_SCOPE, STORAGE_SCOPE};

/// Cached tokens are renewed once they are this close to expiry
const REFRESH_MARGIN_MINUTES: i64 = 5;

// ============================================================================
// ClientCredentialsConfig
// ============================================================================

/// Credentials of an Azure AD application registration
#[derive(Debug, Clone)]
pub struct ClientCredentialsConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// e.g. `https://login.microsoftonline.com`
    pub authority_host: String,
}

impl ClientCredentialsConfig {
    pub fn from_config(auth: &AuthConfig) -> Self {
        Self {
            tenant_id: auth.tenant_id.clone(),
            client_id: auth.client_id.clone(),
            client_secret: auth.client_secret.clone(),
            authority_host: auth.authority_host.clone(),
        }
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

// ============================================================================
// ServicePrincipalAuth
// ============================================================================

/// Token source backed by the client-credentials grant
///
/// Shared behind an `Arc` by the Graph and Storage adapters. The cache is
/// guarded by a `tokio::sync::Mutex` so concurrent callers asking for the
/// same scope trigger a single exchange.
pub struct ServicePrincipalAuth {
    client: BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: reqwest::Client,
    cache: Mutex<HashMap<String, Tokens>>,
}

impl ServicePrincipalAuth {
    /// Creates a new token source for the given credentials
    pub fn new(config: &ClientCredentialsConfig) -> Result<Self> {
        let token_url = TokenUrl::new(config.token_url()).context("Invalid token URL")?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                config.client_secret.expose().to_string(),
            ))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        // The token endpoint must not redirect
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client for token requests")?;

        Ok(Self {
            client,
            http,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Performs the client-credentials exchange for one scope
    async fn acquire(&self, scope: &str) -> Result<Tokens> {
        info!(scope, "Requesting access token");

        let token_result = self
            .client
            .exchange_client_credentials()
            .add_scope(Scope::new(scope.to_string()))
            .request_async(&self.http)
            .await
            .with_context(|| format!("Failed to acquire access token for {scope}"))?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl ITokenSource for ServicePrincipalAuth {
    async fn bearer_token(&self, scope: &str) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(tokens) = cache.get(scope) {
            if !tokens.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES)) {
                return Ok(tokens.access_token.clone());
            }
            debug!(scope, "Cached token close to expiry, renewing");
        }

        let tokens = self.acquire(scope).await?;
        let access_token = tokens.access_token.clone();
        cache.insert(scope.to_string(), tokens);
        Ok(access_token)
    }
}
