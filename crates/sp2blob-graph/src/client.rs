//! Microsoft Graph API client
//!
//! Provides a typed HTTP client for the SharePoint parts of Microsoft Graph.
//! Handles bearer tokens, 429 back-off, paging via `@odata.nextLink`, and
//! the mapping from Graph drive items to [`RemoteItem`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sp2blob_core::ports::StaticTokenSource;
//! use sp2blob_graph::client::GraphClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GraphClient::new(Arc::new(StaticTokenSource::new("token")));
//! let site_id = client
//!     .resolve_site("https://contoso.sharepoint.com/sites/Finance")
//!     .await?;
//! let drive = client.resolve_drive(&site_id, "Documents").await?;
//! println!("library {} has id {}", drive.name, drive.id);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use percent_encoding::percent_decode_str;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use sp2blob_core::domain::{RemoteFolderPath, RemoteItem};
use sp2blob_core::ports::{ByteStream, ITokenSource};

use crate::auth::GRAPH_SCOPE;
use crate::GraphError;

/// Base URL for Microsoft Graph API v1.0
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

// ============================================================================
// Graph API response types
// ============================================================================

/// One page of a collection response
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Response from `/sites/{host}:/{path}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteResponse {
    id: String,
    display_name: Option<String>,
}

/// A document library
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveInfo {
    pub id: String,
    pub name: String,
    pub web_url: Option<String>,
}

impl DriveInfo {
    /// Last segment of the library URL, percent-decoded
    ///
    /// Differs from `name` for the default library, which is displayed as
    /// "Documents" but lives at `.../Shared Documents`.
    fn url_name(&self) -> Option<String> {
        let web_url = self.web_url.as_deref()?;
        let last = web_url.trim_end_matches('/').rsplit('/').next()?;
        Some(percent_decode_str(last).decode_utf8_lossy().into_owned())
    }
}

/// A drive item as returned by the children endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItemResponse {
    id: String,
    name: String,
    size: Option<u64>,
    last_modified_date_time: Option<DateTime<Utc>>,
    /// File facet (present if item is a file)
    file: Option<serde_json::Value>,
    /// Folder facet (present if item is a folder)
    folder: Option<serde_json::Value>,
    /// Short-lived pre-authenticated URL for the content
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

impl From<DriveItemResponse> for RemoteItem {
    fn from(item: DriveItemResponse) -> Self {
        RemoteItem {
            id: item.id,
            name: item.name,
            is_folder: item.folder.is_some(),
            is_file: item.file.is_some(),
            size: item.size,
            download_ref: item.download_url,
            modified: item.last_modified_date_time,
        }
    }
}

// ============================================================================
// GraphClient
// ============================================================================

/// Default retry-after duration when header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Longest wait honoured from a `Retry-After` header (1 hour)
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_RETRIES: u32 = 5;

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with bearer tokens from an [`ITokenSource`] and
/// base URL construction for the Microsoft Graph API.
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Source of Graph-scoped access tokens
    tokens: Arc<dyn ITokenSource>,
    /// Retry budget for 429 responses
    max_retries: u32,
}

impl GraphClient {
    /// Creates a new GraphClient against the public Graph endpoint
    pub fn new(tokens: Arc<dyn ITokenSource>) -> Self {
        Self::with_base_url(tokens, GRAPH_BASE_URL)
    }

    /// Creates a new GraphClient with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `tokens` - Source of access tokens
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(tokens: Arc<dyn ITokenSource>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Overrides the retry budget for 429 responses
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs (paging links) are used as-is, paths are appended to the base URL
    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, DELETE, etc.)
    /// * `path` - API path relative to base URL (e.g., "/sites/root"), or an absolute URL
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .tokens
            .bearer_token(GRAPH_SCOPE)
            .await
            .context("Failed to obtain Graph access token")?;
        Ok(self
            .client
            .request(method, self.url_for(path))
            .bearer_auth(token))
    }

    /// Executes an HTTP request with automatic 429 retry.
    ///
    /// On HTTP 429 (Too Many Requests) the `Retry-After` header is honoured
    /// (default 30 s) and the request is retried up to the configured
    /// budget. Any other unsuccessful status is classified into a
    /// [`GraphError`].
    ///
    /// # Returns
    /// The successful HTTP response, or an error after all retries are exhausted.
    pub async fn execute_with_retry(&self, method: Method, path: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            debug!(%method, path, attempt, "Graph request");

            let response = self
                .request(method.clone(), path)
                .await?
                .send()
                .await
                .map_err(GraphError::from)
                .with_context(|| format!("Failed to send {method} {path}"))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                if attempt >= self.max_retries {
                    warn!(path, attempts = attempt + 1, "429 retry limit exhausted");
                    return Err(anyhow::Error::new(GraphError::TooManyRequests { retry_after }))
                        .with_context(|| format!("{method} {path} kept being throttled"));
                }

                info!(
                    path,
                    attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Received 429, backing off"
                );
                tokio::time::sleep(retry_after).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow::Error::new(GraphError::from_status(status, &body)))
                    .with_context(|| format!("{method} {path} failed"));
            }

            if attempt > 0 {
                info!(path, attempt, "Request succeeded after retry");
            }
            return Ok(response);
        }
    }

    /// GET a JSON document
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute_with_retry(Method::GET, path)
            .await?
            .json::<T>()
            .await
            .map_err(|e| GraphError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse response of GET {path}"))
    }

    /// GET every page of a collection, following `@odata.nextLink`
    async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(path.to_string());
        let mut pages = 0u32;

        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(&url).await?;
            pages += 1;
            items.extend(page.value);
            next = page.next_link;
        }

        debug!(path, pages, items = items.len(), "Collection fetched");
        Ok(items)
    }

    // ========================================================================
    // Site and library resolution
    // ========================================================================

    /// Resolves a SharePoint site URL to its Graph site id
    ///
    /// `https://host/sites/name` maps to `GET /sites/host:/sites/name`;
    /// a bare host maps to `GET /sites/host` (the root site).
    pub async fn resolve_site(&self, site_url: &str) -> Result<String> {
        let path = site_lookup_path(site_url)?;
        let site: SiteResponse = self
            .get_json(&path)
            .await
            .with_context(|| format!("Failed to resolve site {site_url}"))?;

        info!(
            site_id = %site.id,
            name = site.display_name.as_deref().unwrap_or(""),
            "Resolved SharePoint site"
        );
        Ok(site.id)
    }

    /// Finds the document library named `library` in a site
    ///
    /// Matches the library display name case-insensitively, then falls
    /// back to the last segment of its URL.
    pub async fn resolve_drive(&self, site_id: &str, library: &str) -> Result<DriveInfo> {
        let drives: Vec<DriveInfo> = self
            .get_all_pages(&format!("/sites/{site_id}/drives"))
            .await
            .context("Failed to list document libraries")?;

        let wanted = library.trim().to_lowercase();
        let found = drives
            .iter()
            .find(|d| d.name.to_lowercase() == wanted)
            .or_else(|| {
                drives
                    .iter()
                    .find(|d| d.url_name().is_some_and(|n| n.to_lowercase() == wanted))
            });

        match found {
            Some(drive) => {
                info!(drive_id = %drive.id, name = %drive.name, "Resolved document library");
                Ok(drive.clone())
            }
            None => {
                let available: Vec<&str> = drives.iter().map(|d| d.name.as_str()).collect();
                Err(anyhow!(GraphError::NotFound(format!(
                    "document library '{library}' (available: {})",
                    available.join(", ")
                ))))
            }
        }
    }

    // ========================================================================
    // Drive items
    // ========================================================================

    /// Lists the direct children of a folder, across all pages
    pub async fn list_children(
        &self,
        drive_id: &str,
        folder: &RemoteFolderPath,
    ) -> Result<Vec<RemoteItem>> {
        let path = children_path(drive_id, folder);
        let items: Vec<DriveItemResponse> = self.get_all_pages(&path).await?;
        Ok(items.into_iter().map(RemoteItem::from).collect())
    }

    /// Opens the content of a file as a byte stream
    ///
    /// Uses the pre-authenticated download URL when the listing provided
    /// one (no bearer token is sent to it), otherwise the item content
    /// endpoint. Download URLs are short-lived: when one answers 401, 403
    /// or 404 the content endpoint is tried once instead.
    pub async fn open_download(&self, drive_id: &str, item: &RemoteItem) -> Result<ByteStream> {
        let content_path = format!("/drives/{drive_id}/items/{}/content", item.id);

        let response = match item.download_ref.as_deref() {
            Some(url) => {
                debug!(item = %item.name, "Downloading via pre-authenticated URL");
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(GraphError::from)
                    .with_context(|| format!("Failed to download {}", item.name))?;

                match response.status() {
                    status if status.is_success() => response,
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                        warn!(
                            item = %item.name,
                            status = response.status().as_u16(),
                            "Download URL rejected, falling back to content endpoint"
                        );
                        self.execute_with_retry(Method::GET, &content_path).await?
                    }
                    status => {
                        let body = response.text().await.unwrap_or_default();
                        return Err(anyhow::Error::new(GraphError::from_status(status, &body)))
                            .with_context(|| format!("Download of {} failed", item.name));
                    }
                }
            }
            None => self.execute_with_retry(Method::GET, &content_path).await?,
        };

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed())
    }

    /// Deletes a drive item (moves it to the site recycle bin)
    pub async fn delete_item(&self, drive_id: &str, item_id: &str) -> Result<()> {
        let path = format!("/drives/{drive_id}/items/{item_id}");
        self.execute_with_retry(Method::DELETE, &path).await?;
        debug!(item_id, "Deleted drive item");
        Ok(())
    }
}

/// `/sites/{host}:/{path}` or `/sites/{host}` for the root site
fn site_lookup_path(site_url: &str) -> Result<String> {
    let url = url::Url::parse(site_url.trim())
        .with_context(|| format!("Invalid site URL '{site_url}'"))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Site URL '{site_url}' has no host"))?;

    let relative = url.path().trim_matches('/');
    if relative.is_empty() {
        Ok(format!("/sites/{host}"))
    } else {
        Ok(format!("/sites/{host}:/{relative}"))
    }
}

/// Children endpoint for a folder, addressed by path
fn children_path(drive_id: &str, folder: &RemoteFolderPath) -> String {
    if folder.is_root() {
        format!("/drives/{drive_id}/root/children")
    } else {
        format!("/drives/{drive_id}/root:/{}:/children", folder.encoded())
    }
}

/// Parses a `Retry-After` value given in seconds or as an HTTP date
fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value.trim()) {
        let wait = date.with_timezone(&Utc) - Utc::now();
        if let Ok(wait) = wait.to_std() {
            return wait.min(MAX_RETRY_AFTER);
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
