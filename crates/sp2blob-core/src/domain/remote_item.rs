//! Remote drive items and the entries produced from them
//!
//! A [`RemoteItem`] is one child returned by a folder listing. The
//! recursive lister pairs every matching file with the path it will have
//! in the destination container, producing a [`SyncEntry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the lister treats an item, derived from its file/folder flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A file that is a candidate for copying
    File,
    /// A folder that is always descended into
    Folder,
    /// Neither flag set; skipped without error
    Malformed,
}

/// One node returned by the directory API for a given folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Provider item identifier
    pub id: String,
    /// Leaf name of the file or folder
    pub name: String,
    /// Item carries a folder facet
    pub is_folder: bool,
    /// Item carries a file facet
    pub is_file: bool,
    /// Byte count (files only)
    pub size: Option<u64>,
    /// Opaque handle used to fetch the file bytes (files only)
    pub download_ref: Option<String>,
    /// Last modified timestamp, when reported
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteItem {
    /// Creates a file item
    pub fn file(id: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_folder: false,
            is_file: true,
            size: Some(size),
            download_ref: None,
            modified: None,
        }
    }

    /// Creates a folder item
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_folder: true,
            is_file: false,
            size: None,
            download_ref: None,
            modified: None,
        }
    }

    /// Sets the download handle
    #[must_use]
    pub fn with_download_ref(mut self, download_ref: impl Into<String>) -> Self {
        self.download_ref = Some(download_ref.into());
        self
    }

    /// Classifies the item. An item flagged as both is treated as a folder.
    pub fn kind(&self) -> ItemKind {
        match (self.is_folder, self.is_file) {
            (true, _) => ItemKind::Folder,
            (false, true) => ItemKind::File,
            (false, false) => ItemKind::Malformed,
        }
    }

    /// File size, zero when unknown
    pub fn size_or_zero(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}

/// A matching file paired with its destination path
///
/// `destination_path` is the raw `/`-joined path relative to the scan root
/// and is used verbatim as the target object name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    /// The remote file
    pub item: RemoteItem,
    /// Path of the file relative to the scan root
    pub destination_path: String,
}

impl SyncEntry {
    /// Pairs `item` with `prefix + item.name`
    pub fn new(item: RemoteItem, prefix: &str) -> Self {
        let destination_path = format!("{prefix}{}", item.name);
        Self {
            item,
            destination_path,
        }
    }

    /// Destination name inside a container, with an optional virtual folder in front
    pub fn blob_name(&self, blob_prefix: &str) -> String {
        let prefix = blob_prefix.trim_matches('/');
        if prefix.is_empty() {
            self.destination_path.clone()
        } else {
            format!("{prefix}/{}", self.destination_path)
        }
    }
}
