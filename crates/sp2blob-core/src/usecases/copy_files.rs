//! Copy use case
//!
//! Drives one run of the copier on top of the ports:
//!
//! 1. Ensure the target container exists (skipped when only listing)
//! 2. Recursively list matching files below the configured folder
//! 3. Stream each file from the drive into the container, a bounded
//!    number at a time
//! 4. Optionally delete each source file once its upload succeeded
//! 5. Return a [`CopyReport`] with counts and every per-path error

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::domain::{
    CopyReport, ListError, ListFailure, ListingReport, RemoteFolderPath, RemoteItem, RunId,
    SyncEntry, TransferFailure,
};
use crate::filter::FileMatcher;
use crate::ports::{ContainerStatus, IBlobSink, IDriveProvider};
use crate::usecases::list_recursive::{ListObserver, RecursiveLister, DEFAULT_MAX_CONCURRENCY};

/// Options for a single copy run
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Identifies the run in logs and in the report
    pub run_id: RunId,
    /// Folder the scan starts from
    pub root: RemoteFolderPath,
    /// Virtual folder prepended to every destination path
    pub blob_prefix: String,
    /// Only list matching files; no container creation, uploads or deletes
    pub list_only: bool,
    /// Delete each source file after it was uploaded
    pub delete_after_copy: bool,
    /// Bound on concurrent listings and on concurrent transfers
    pub max_concurrency: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            run_id: RunId::new(),
            root: RemoteFolderPath::root(),
            blob_prefix: String::new(),
            list_only: false,
            delete_after_copy: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Receives progress notifications from a copy run
///
/// Extends [`ListObserver`] with transfer events. All methods default to no-ops.
pub trait CopyObserver: ListObserver {
    /// The container check finished
    fn on_container_ready(&self, _status: ContainerStatus) {}

    /// The listing finished and transfers are about to start
    fn on_listing_complete(&self, _listing: &ListingReport) {}

    /// A file was uploaded
    fn on_copied(&self, _entry: &SyncEntry, _blob_name: &str, _bytes: u64) {}

    /// A source file was deleted after upload
    fn on_source_deleted(&self, _entry: &SyncEntry) {}

    /// A file could not be copied or its source could not be deleted
    fn on_transfer_failure(&self, _failure: &TransferFailure) {}
}

impl CopyObserver for crate::usecases::list_recursive::NoopObserver {}

/// Forwards listing events of a copy run to its [`CopyObserver`]
struct ListEvents<'a>(&'a dyn CopyObserver);

impl ListObserver for ListEvents<'_> {
    fn on_folder_listed(&self, path: &RemoteFolderPath, files: usize, folders: usize) {
        self.0.on_folder_listed(path, files, folders);
    }

    fn on_entry_matched(&self, entry: &SyncEntry) {
        self.0.on_entry_matched(entry);
    }

    fn on_item_skipped(&self, path: &RemoteFolderPath, item: &RemoteItem) {
        self.0.on_item_skipped(path, item);
    }

    fn on_list_failure(&self, failure: &ListFailure) {
        self.0.on_list_failure(failure);
    }
}

/// What happened to one entry
enum Outcome {
    Copied { bytes: u64, deleted: bool },
    CopiedDeleteFailed { bytes: u64, failure: TransferFailure },
    Failed(TransferFailure),
    Skipped,
}

/// Use case that copies matching drive files into a blob container
pub struct CopyFilesUseCase {
    drive: Arc<dyn IDriveProvider>,
    sink: Arc<dyn IBlobSink>,
}

impl CopyFilesUseCase {
    /// Creates a new CopyFilesUseCase with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `drive` - Source drive
    /// * `sink` - Destination container
    pub fn new(drive: Arc<dyn IDriveProvider>, sink: Arc<dyn IBlobSink>) -> Self {
        Self { drive, sink }
    }

    /// Runs the copy
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be ensured or the scan root
    /// cannot be listed. Per-file and per-subfolder failures are reported in
    /// the returned [`CopyReport`] instead.
    pub async fn execute(
        &self,
        options: &CopyOptions,
        matcher: &FileMatcher,
        observer: &dyn CopyObserver,
        cancel: &CancellationToken,
    ) -> Result<CopyReport> {
        let run_id = options.run_id;
        let started_at = Utc::now();

        if !options.list_only {
            let status = self
                .sink
                .ensure_container()
                .await
                .context("Failed to ensure target container exists")?;
            observer.on_container_ready(status);
        }

        let lister = RecursiveLister::new(Arc::clone(&self.drive))
            .with_max_concurrency(options.max_concurrency);
        let events = ListEvents(observer);
        let (listing, cancelled) = match lister.list(&options.root, matcher, &events, cancel).await {
            Ok(listing) => (listing, false),
            Err(ListError::Cancelled { partial }) => (partial, true),
            Err(err) => return Err(anyhow::Error::new(err)),
        };
        observer.on_listing_complete(&listing);

        let mut report = CopyReport {
            run_id,
            started_at,
            finished_at: started_at,
            list_only: options.list_only,
            matched: listing.entries.len() as u64,
            copied: 0,
            bytes_copied: 0,
            deleted: 0,
            skipped: 0,
            cancelled,
            entries: Vec::new(),
            list_failures: listing.failures,
            transfer_failures: Vec::new(),
        };

        if options.list_only || cancelled {
            if !options.list_only {
                report.skipped = report.matched;
            }
            report.entries = listing.entries;
            report.finished_at = Utc::now();
            return Ok(report);
        }

        let concurrency = options.max_concurrency.max(1);
        let outcomes: Vec<Outcome> = stream::iter(listing.entries.iter())
            .map(|entry| self.transfer(entry, options, observer, cancel))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Copied { bytes, deleted } => {
                    report.copied += 1;
                    report.bytes_copied += bytes;
                    if deleted {
                        report.deleted += 1;
                    }
                }
                Outcome::CopiedDeleteFailed { bytes, failure } => {
                    report.copied += 1;
                    report.bytes_copied += bytes;
                    report.transfer_failures.push(failure);
                }
                Outcome::Failed(failure) => report.transfer_failures.push(failure),
                Outcome::Skipped => report.skipped += 1,
            }
        }

        report
            .transfer_failures
            .sort_by(|a, b| a.destination_path.cmp(&b.destination_path));
        report.cancelled = cancel.is_cancelled() && report.skipped > 0;
        report.entries = listing.entries;
        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Copies one entry and, if requested, deletes its source
    async fn transfer(
        &self,
        entry: &SyncEntry,
        options: &CopyOptions,
        observer: &dyn CopyObserver,
        cancel: &CancellationToken,
    ) -> Outcome {
        if cancel.is_cancelled() {
            return Outcome::Skipped;
        }

        let blob_name = entry.blob_name(&options.blob_prefix);
        let bytes = match self.copy_one(entry, &blob_name).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let failure = TransferFailure {
                    destination_path: entry.destination_path.clone(),
                    cause: format!("{err:#}"),
                };
                observer.on_transfer_failure(&failure);
                return Outcome::Failed(failure);
            }
        };
        observer.on_copied(entry, &blob_name, bytes);

        if !options.delete_after_copy {
            return Outcome::Copied {
                bytes,
                deleted: false,
            };
        }

        match self.drive.delete_file(&entry.item).await {
            Ok(()) => {
                observer.on_source_deleted(entry);
                Outcome::Copied {
                    bytes,
                    deleted: true,
                }
            }
            Err(err) => {
                let failure = TransferFailure {
                    destination_path: entry.destination_path.clone(),
                    cause: format!("copied, but failed to delete source: {err:#}"),
                };
                observer.on_transfer_failure(&failure);
                Outcome::CopiedDeleteFailed { bytes, failure }
            }
        }
    }

    async fn copy_one(&self, entry: &SyncEntry, blob_name: &str) -> Result<u64> {
        let content = self
            .drive
            .open_file(&entry.item)
            .await
            .with_context(|| format!("Failed to download '{}'", entry.destination_path))?;

        self.sink
            .upload(blob_name, content, entry.item.size_or_zero())
            .await
            .with_context(|| format!("Failed to upload '{blob_name}'"))
    }
}
