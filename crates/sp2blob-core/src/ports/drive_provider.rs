//! Drive provider port (driven/secondary port)
//!
//! This module defines the interface to the remote hierarchical file tree
//! (a SharePoint document library). The lister only needs
//! [`IDriveProvider::list_children`]; the copy use case additionally
//! opens files for reading and, on request, deletes them after copying.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - File content is exposed as a [`ByteStream`] so a copy never has to hold
//!   a whole file in memory.

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::domain::{RemoteFolderPath, RemoteItem};

/// A stream of file content chunks
pub type ByteStream = BoxStream<'static, anyhow::Result<Bytes>>;

/// Port trait for read access to a remote drive
///
/// ## Implementation Notes
///
/// - `list_children` must return every child of the folder, following any
///   pagination internally. A folder that does not exist is an error, an
///   empty folder is `Ok(vec![])`.
/// - `path` holds raw names; implementations encode them as needed.
/// - Implementations must be safe to call concurrently from several tasks.
#[async_trait::async_trait]
pub trait IDriveProvider: Send + Sync {
    /// Lists the direct children (files and folders) of a folder
    ///
    /// # Arguments
    /// * `path` - Folder to list; the root when it has no segments
    async fn list_children(&self, path: &RemoteFolderPath) -> anyhow::Result<Vec<RemoteItem>>;

    /// Opens a file for reading
    ///
    /// # Arguments
    /// * `item` - A file item previously returned by `list_children`
    async fn open_file(&self, item: &RemoteItem) -> anyhow::Result<ByteStream>;

    /// Deletes a file from the drive
    ///
    /// # Arguments
    /// * `item` - A file item previously returned by `list_children`
    async fn delete_file(&self, item: &RemoteItem) -> anyhow::Result<()>;
}
