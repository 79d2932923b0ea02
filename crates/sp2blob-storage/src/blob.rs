//! Upload operations for Azure Blob Storage
//!
//! Provides the requests sp2blob needs from the Blob service:
//! - [`BlobClient::ensure_container`] - Create Container, tolerating "already exists"
//! - [`BlobClient::upload_small`] - Put Blob in a single request
//! - [`BlobClient::upload_large`] - Put Block per chunk, then Put Block List
//!
//! ## Azure Storage REST API References
//!
//! - [Create Container](https://learn.microsoft.com/en-us/rest/api/storageservices/create-container)
//! - [Put Blob](https://learn.microsoft.com/en-us/rest/api/storageservices/put-blob)
//! - [Put Block](https://learn.microsoft.com/en-us/rest/api/storageservices/put-block)
//! - [Put Block List](https://learn.microsoft.com/en-us/rest/api/storageservices/put-block-list)

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures_util::StreamExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use sp2blob_core::domain::encode_segment;
use sp2blob_core::ports::{
    ByteStream, ContainerStatus, IBlobSink, ITokenSource, STORAGE_SCOPE,
};

use crate::StorageError;

/// REST API version sent with every request
pub const API_VERSION: &str = "2021-08-06";

/// Default block size for large uploads: 8 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Files above this size are uploaded as blocks: 32 MiB
pub const DEFAULT_UPLOAD_THRESHOLD: u64 = 32 * 1024 * 1024;

// ============================================================================
// Helpers
// ============================================================================

/// Percent-encodes each `/`-separated segment of a blob name, keeping the separators
pub fn encode_blob_name(name: &str) -> String {
    name.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
}

/// Block id for the block at `index`
///
/// All ids of one blob must have the same length, so the index is
/// zero-padded before base64 encoding.
pub fn block_id(index: u64) -> String {
    BASE64.encode(format!("{index:016}"))
}

/// Body of a Put Block List request committing `ids` in order
fn block_list_xml(ids: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
    for id in ids {
        xml.push_str("<Latest>");
        xml.push_str(id);
        xml.push_str("</Latest>");
    }
    xml.push_str("</BlockList>");
    xml
}

/// RFC 1123 timestamp for the `x-ms-date` header
fn ms_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Turns an unsuccessful response into a [`StorageError`]
async fn check_status(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::from_status(status, code.as_deref(), &body))
}

// ============================================================================
// BlobClient
// ============================================================================

/// HTTP client for one blob container
pub struct BlobClient {
    client: Client,
    /// e.g. `https://account.blob.core.windows.net`
    endpoint: String,
    container: String,
    tokens: Arc<dyn ITokenSource>,
}

impl BlobClient {
    /// Creates a client for `container` under the given service endpoint
    pub fn new(
        endpoint: impl Into<String>,
        container: impl Into<String>,
        tokens: Arc<dyn ITokenSource>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            container: container.into(),
            tokens,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn container_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.container)
    }

    pub fn blob_url(&self, name: &str) -> String {
        format!("{}/{}", self.container_url(), encode_blob_name(name))
    }

    /// Creates a request carrying the bearer token, API version and date headers
    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self
            .tokens
            .bearer_token(STORAGE_SCOPE)
            .await
            .context("Failed to obtain storage access token")?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-date", ms_date()))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(StorageError::from)
            .with_context(|| format!("{what}: request failed"))?;
        check_status(response)
            .await
            .with_context(|| format!("{what} rejected"))
    }

    /// Creates the container unless it exists already
    pub async fn ensure_container(&self) -> Result<ContainerStatus> {
        let request = self
            .request(Method::PUT, &self.container_url())
            .await?
            .query(&[("restype", "container")])
            .header(reqwest::header::CONTENT_LENGTH, 0);

        let response = request
            .send()
            .await
            .map_err(StorageError::from)
            .with_context(|| format!("Failed to create container '{}'", self.container))?;

        let code = response
            .headers()
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        match response.status() {
            StatusCode::CREATED => {
                info!(container = %self.container, "Created container");
                Ok(ContainerStatus::Created)
            }
            StatusCode::CONFLICT if code != "ContainerBeingDeleted" => {
                debug!(container = %self.container, "Container already exists");
                Ok(ContainerStatus::AlreadyExists)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow::Error::new(StorageError::from_status(
                    status,
                    Some(&code),
                    &body,
                )))
                .with_context(|| format!("Failed to create container '{}'", self.container))
            }
        }
    }

    /// Uploads `data` as a block blob in one request
    pub async fn upload_small(&self, name: &str, data: Bytes) -> Result<()> {
        let len = data.len();
        let request = self
            .request(Method::PUT, &self.blob_url(name))
            .await?
            .header("x-ms-blob-type", "BlockBlob")
            .header(reqwest::header::CONTENT_TYPE, content_type_for(name))
            .header(reqwest::header::CONTENT_LENGTH, len)
            .body(data);

        self.send(request, &format!("Put Blob '{name}'")).await?;
        debug!(blob = name, bytes = len, "Uploaded blob");
        Ok(())
    }

    /// Stages one block of a blob
    pub async fn put_block(&self, name: &str, block_id: &str, data: Bytes) -> Result<()> {
        let len = data.len();
        let request = self
            .request(Method::PUT, &self.blob_url(name))
            .await?
            .query(&[("comp", "block"), ("blockid", block_id)])
            .header(reqwest::header::CONTENT_LENGTH, len)
            .body(data);

        self.send(request, &format!("Put Block {block_id} of '{name}'"))
            .await?;
        debug!(blob = name, block_id, bytes = len, "Staged block");
        Ok(())
    }

    /// Commits staged blocks, in order, as the content of the blob
    pub async fn put_block_list(&self, name: &str, block_ids: &[String]) -> Result<()> {
        let request = self
            .request(Method::PUT, &self.blob_url(name))
            .await?
            .query(&[("comp", "blocklist")])
            .header("x-ms-blob-content-type", content_type_for(name))
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(block_list_xml(block_ids));

        self.send(request, &format!("Put Block List '{name}'"))
            .await?;
        Ok(())
    }

    /// Uploads a stream as a sequence of `chunk_size` blocks
    ///
    /// # Returns
    /// The number of bytes uploaded
    pub async fn upload_large(
        &self,
        name: &str,
        content: ByteStream,
        chunk_size: usize,
    ) -> Result<u64> {
        self.upload_blocks(name, BytesMut::new(), content, chunk_size)
            .await
    }

    /// Uploads `head` followed by the rest of `content` as blocks
    ///
    /// `head` holds bytes already read from the source, so a caller that
    /// started buffering for a single Put Blob can switch to blocks midway.
    pub async fn upload_blocks(
        &self,
        name: &str,
        head: BytesMut,
        mut content: ByteStream,
        chunk_size: usize,
    ) -> Result<u64> {
        let chunk_size = chunk_size.max(1);
        let mut buffer = head;
        let mut block_ids = Vec::new();
        let mut total: u64 = 0;

        loop {
            while buffer.len() >= chunk_size {
                let block = buffer.split_to(chunk_size).freeze();
                total += block.len() as u64;
                let id = block_id(block_ids.len() as u64);
                self.put_block(name, &id, block).await?;
                block_ids.push(id);
            }

            match content.next().await {
                Some(chunk) => {
                    let chunk =
                        chunk.with_context(|| format!("Failed to read source of '{name}'"))?;
                    buffer.extend_from_slice(&chunk);
                }
                None => break,
            }
        }

        if !buffer.is_empty() {
            let block = buffer.freeze();
            total += block.len() as u64;
            let id = block_id(block_ids.len() as u64);
            self.put_block(name, &id, block).await?;
            block_ids.push(id);
        }

        self.put_block_list(name, &block_ids).await?;
        info!(blob = name, bytes = total, blocks = block_ids.len(), "Committed block blob");
        Ok(total)
    }
}

// ============================================================================
// AzureBlobSink
// ============================================================================

/// [`IBlobSink`] writing into one container
///
/// Content up to `upload_threshold` bytes is buffered and sent with a single
/// Put Blob; anything larger is streamed as blocks of `chunk_size` bytes.
pub struct AzureBlobSink {
    client: BlobClient,
    upload_threshold: u64,
    chunk_size: usize,
}

impl AzureBlobSink {
    pub fn new(client: BlobClient) -> Self {
        Self {
            client,
            upload_threshold: DEFAULT_UPLOAD_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_upload_threshold(mut self, bytes: u64) -> Self {
        self.upload_threshold = bytes;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn client(&self) -> &BlobClient {
        &self.client
    }

    /// Buffers content expected to fit under the threshold
    ///
    /// The listed size can be missing or stale. Once the buffer grows past
    /// the threshold the upload continues as blocks instead.
    async fn upload_buffered(
        &self,
        blob_name: &str,
        mut content: ByteStream,
        size: u64,
    ) -> Result<u64> {
        let capacity = size.min(self.upload_threshold) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);

        while let Some(chunk) = content.next().await {
            let chunk = chunk.with_context(|| format!("Failed to read source of '{blob_name}'"))?;
            buffer.extend_from_slice(&chunk);

            if buffer.len() as u64 > self.upload_threshold {
                debug!(
                    blob = blob_name,
                    listed = size,
                    threshold = self.upload_threshold,
                    "Content exceeds listed size, switching to blocks"
                );
                return self
                    .client
                    .upload_blocks(blob_name, buffer, content, self.chunk_size)
                    .await;
            }
        }

        let len = buffer.len() as u64;
        self.client.upload_small(blob_name, buffer.freeze()).await?;
        Ok(len)
    }
}

#[async_trait::async_trait]
impl IBlobSink for AzureBlobSink {
    async fn ensure_container(&self) -> Result<ContainerStatus> {
        self.client.ensure_container().await
    }

    async fn upload(&self, blob_name: &str, content: ByteStream, size: u64) -> Result<u64> {
        let uploaded = if size > self.upload_threshold {
            self.client
                .upload_large(blob_name, content, self.chunk_size)
                .await?
        } else {
            self.upload_buffered(blob_name, content, size).await?
        };

        if uploaded != size {
            warn!(
                blob = blob_name,
                expected = size,
                uploaded,
                "Uploaded size differs from listed size"
            );
        }
        Ok(uploaded)
    }
}
