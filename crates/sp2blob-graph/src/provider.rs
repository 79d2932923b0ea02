//! GraphDriveProvider - IDriveProvider implementation for one SharePoint library
//!
//! Binds a [`GraphClient`] to a resolved drive id so the core use cases can
//! list, read and delete files without knowing about sites or drives.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use sp2blob_core::domain::{RemoteFolderPath, RemoteItem};
use sp2blob_core::ports::{ByteStream, IDriveProvider};

use crate::client::GraphClient;

/// Drive provider backed by the Microsoft Graph API
pub struct GraphDriveProvider {
    client: Arc<GraphClient>,
    drive_id: String,
}

impl GraphDriveProvider {
    /// Creates a provider for an already known drive id
    pub fn new(client: Arc<GraphClient>, drive_id: impl Into<String>) -> Self {
        Self {
            client,
            drive_id: drive_id.into(),
        }
    }

    /// Resolves `site_url` and `library` to a drive and binds to it
    pub async fn connect(client: Arc<GraphClient>, site_url: &str, library: &str) -> Result<Self> {
        let site_id = client.resolve_site(site_url).await?;
        let drive = client
            .resolve_drive(&site_id, library)
            .await
            .with_context(|| format!("Library '{library}' not available in {site_url}"))?;
        Ok(Self::new(client, drive.id))
    }

    /// The drive this provider is bound to
    pub fn drive_id(&self) -> &str {
        &self.drive_id
    }
}

#[async_trait::async_trait]
impl IDriveProvider for GraphDriveProvider {
    async fn list_children(&self, path: &RemoteFolderPath) -> Result<Vec<RemoteItem>> {
        debug!(folder = %path, "Listing folder");
        self.client
            .list_children(&self.drive_id, path)
            .await
            .with_context(|| format!("Failed to list folder '{path}'"))
    }

    async fn open_file(&self, item: &RemoteItem) -> Result<ByteStream> {
        self.client.open_download(&self.drive_id, item).await
    }

    async fn delete_file(&self, item: &RemoteItem) -> Result<()> {
        self.client
            .delete_item(&self.drive_id, &item.id)
            .await
            .with_context(|| format!("Failed to delete '{}'", item.name))
    }
}
