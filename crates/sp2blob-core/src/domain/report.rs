//! Run reports
//!
//! Summaries produced by the lister and the copy use case. Reports are
//! serialisable so the CLI can emit them as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RunId;
use super::remote_item::SyncEntry;

/// A folder below the scan root that could not be enumerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFailure {
    /// Folder path relative to the drive root
    pub path: String,
    /// Rendered cause chain
    pub cause: String,
}

/// Result of a recursive listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingReport {
    /// Matching files, sorted by destination path, each path unique
    pub entries: Vec<SyncEntry>,
    /// Subfolders whose listing failed, sorted by path
    pub failures: Vec<ListFailure>,
    /// Number of folders successfully listed
    pub folders_scanned: u64,
}

impl ListingReport {
    /// Sum of the sizes of all matched files
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.item.size_or_zero()).sum()
    }
}

/// A file that could not be copied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    /// Destination path of the entry that failed
    pub destination_path: String,
    /// Rendered cause chain
    pub cause: String,
}

/// Summary of one copy run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Whether transfers were skipped on purpose
    pub list_only: bool,
    /// Files matching the filter
    pub matched: u64,
    /// Files uploaded successfully
    pub copied: u64,
    pub bytes_copied: u64,
    /// Source files removed after a successful upload
    pub deleted: u64,
    /// Files matched but never attempted because the run was cancelled
    pub skipped: u64,
    /// Whether the run was cut short
    pub cancelled: bool,
    /// Entries found by the lister (kept for list-only output)
    pub entries: Vec<SyncEntry>,
    pub list_failures: Vec<ListFailure>,
    pub transfer_failures: Vec<TransferFailure>,
}

impl CopyReport {
    /// True when nothing failed and the run was not cancelled
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.list_failures.is_empty() && self.transfer_failures.is_empty()
    }

    /// Total number of per-path errors
    pub fn error_count(&self) -> usize {
        self.list_failures.len() + self.transfer_failures.len()
    }

    /// Wall-clock duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}
