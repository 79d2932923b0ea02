//! Token source port
//!
//! Adapters ask a token source for a bearer token scoped to the resource
//! they talk to (Microsoft Graph, Azure Storage). The source is shared
//! read-only between concurrent requests.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Scope for Microsoft Graph calls
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Scope for Azure Blob Storage data-plane calls
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

/// An access token and its expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Port trait for obtaining bearer tokens
#[async_trait::async_trait]
pub trait ITokenSource: Send + Sync {
    /// Returns a valid bearer token for `scope` (e.g. `https://graph.microsoft.com/.default`)
    async fn bearer_token(&self, scope: &str) -> anyhow::Result<String>;
}

/// A token source that always hands out the same token, whatever the scope
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl ITokenSource for StaticTokenSource {
    async fn bearer_token(&self, _scope: &str) -> anyhow::Result<String> {
        Ok(self.token.clone())
    }
}
