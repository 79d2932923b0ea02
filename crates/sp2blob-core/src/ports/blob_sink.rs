//! Blob sink port (driven/secondary port)
//!
//! Destination side of a copy: a single container in an object store.

use serde::{Deserialize, Serialize};

use super::drive_provider::ByteStream;

/// Outcome of [`IBlobSink::ensure_container`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    /// The container did not exist and was created
    Created,
    /// The container was already there
    AlreadyExists,
}

/// Port trait for writing objects into a container
#[async_trait::async_trait]
pub trait IBlobSink: Send + Sync {
    /// Makes sure the target container exists, creating it if needed
    async fn ensure_container(&self) -> anyhow::Result<ContainerStatus>;

    /// Writes `content` to the object `blob_name`, replacing any existing object
    ///
    /// # Arguments
    /// * `blob_name` - Raw `/`-separated object name; implementations encode it
    /// * `content` - The object bytes
    /// * `size` - Expected total length of `content` in bytes
    ///
    /// # Returns
    /// Number of bytes written
    async fn upload(&self, blob_name: &str, content: ByteStream, size: u64)
        -> anyhow::Result<u64>;
}
