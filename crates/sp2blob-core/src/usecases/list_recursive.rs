//! Recursive listing use case
//!
//! Walks a drive folder tree, applies the file filter, and produces a flat
//! list of [`SyncEntry`] values whose destination paths mirror the source
//! hierarchy relative to the scan root.
//!
//! ## Traversal
//!
//! ```text
//!   pending ──► schedule (≤ max_concurrency in flight) ──► list_children
//!      ▲                                                      │
//!      └──────────── child folders ◄── partition ◄────────────┘
//!                                          │
//!                                          └──► matching files ──► entries
//! ```
//!
//! Folders are always descended into; the filter only applies to file names.
//!
//! ## Failure policy
//!
//! - The scan root cannot be listed: the call fails with
//!   [`ListError::DirectoryListFailure`].
//! - A subfolder cannot be listed: the failure is recorded in
//!   [`ListingReport::failures`] and the rest of the tree is still walked.
//! - The cancellation token fires: no new listings are issued and
//!   [`ListError::Cancelled`] carries everything collected so far.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::domain::{
    ItemKind, ListError, ListFailure, ListingReport, RemoteFolderPath, RemoteItem, SyncEntry,
};
use crate::filter::FileMatcher;
use crate::ports::IDriveProvider;

/// Default number of folder listings in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Receives progress notifications from a listing
///
/// All methods default to no-ops so implementors only override what they
/// need. The lister itself never logs.
pub trait ListObserver: Send + Sync {
    /// A folder was listed successfully
    fn on_folder_listed(&self, _path: &RemoteFolderPath, _files: usize, _folders: usize) {}

    /// A file matched the filter
    fn on_entry_matched(&self, _entry: &SyncEntry) {}

    /// An item had neither a file nor a folder facet
    fn on_item_skipped(&self, _path: &RemoteFolderPath, _item: &RemoteItem) {}

    /// A subfolder could not be listed
    fn on_list_failure(&self, _failure: &ListFailure) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ListObserver for NoopObserver {}

/// A folder waiting to be listed
struct PendingFolder {
    path: RemoteFolderPath,
    /// Destination prefix of the folder's children, `""` or ending in `/`
    prefix: String,
    is_root: bool,
}

/// Accumulates results while the traversal runs
#[derive(Default)]
struct Collected {
    entries: BTreeMap<String, SyncEntry>,
    failures: Vec<ListFailure>,
    folders_scanned: u64,
}

impl Collected {
    fn into_report(self) -> ListingReport {
        let mut failures = self.failures;
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        ListingReport {
            entries: self.entries.into_values().collect(),
            failures,
            folders_scanned: self.folders_scanned,
        }
    }
}

/// Use case that enumerates every matching file below a folder
pub struct RecursiveLister {
    provider: Arc<dyn IDriveProvider>,
    max_concurrency: usize,
}

impl RecursiveLister {
    /// Creates a lister over the given drive
    ///
    /// # Arguments
    ///
    /// * `provider` - Source drive used for `list_children` calls
    pub fn new(provider: Arc<dyn IDriveProvider>) -> Self {
        Self {
            provider,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets the bound on concurrent folder listings (minimum 1)
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Returns the configured concurrency bound
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Lists every file below `root` that passes `matcher`
    ///
    /// # Arguments
    ///
    /// * `root` - Scan root; destination paths are relative to it
    /// * `matcher` - Compiled file filter
    /// * `observer` - Receives progress notifications
    /// * `cancel` - Stops the traversal when triggered
    ///
    /// # Returns
    ///
    /// A report whose entries are unique by destination path and sorted by it
    ///
    /// # Errors
    ///
    /// [`ListError::DirectoryListFailure`] if the root cannot be listed,
    /// [`ListError::Cancelled`] if `cancel` fires before the walk completes.
    pub async fn list(
        &self,
        root: &RemoteFolderPath,
        matcher: &FileMatcher,
        observer: &dyn ListObserver,
        cancel: &CancellationToken,
    ) -> Result<ListingReport, ListError> {
        let mut collected = Collected::default();
        let mut pending = VecDeque::from([PendingFolder {
            path: root.clone(),
            prefix: String::new(),
            is_root: true,
        }]);
        let mut in_flight = FuturesUnordered::new();

        loop {
            if cancel.is_cancelled() {
                return Err(ListError::Cancelled {
                    partial: collected.into_report(),
                });
            }

            while in_flight.len() < self.max_concurrency {
                let Some(folder) = pending.pop_front() else {
                    break;
                };
                let provider = Arc::clone(&self.provider);
                in_flight.push(async move {
                    let result = provider.list_children(&folder.path).await;
                    (folder, result)
                });
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ListError::Cancelled {
                        partial: collected.into_report(),
                    });
                }
                next = in_flight.next() => next,
            };

            let Some((folder, result)) = next else {
                break;
            };

            match result {
                Ok(children) => {
                    collected.folders_scanned += 1;
                    let subfolders =
                        Self::partition(&folder, children, matcher, observer, &mut collected);
                    pending.extend(subfolders);
                }
                Err(err) => {
                    let path = folder.path.as_display();
                    let cause = format!("{err:#}");
                    if folder.is_root {
                        return Err(ListError::DirectoryListFailure { path, cause });
                    }
                    let failure = ListFailure { path, cause };
                    observer.on_list_failure(&failure);
                    collected.failures.push(failure);
                }
            }
        }

        Ok(collected.into_report())
    }

    /// Splits one folder's children into matched entries and subfolders to visit
    fn partition(
        folder: &PendingFolder,
        children: Vec<RemoteItem>,
        matcher: &FileMatcher,
        observer: &dyn ListObserver,
        collected: &mut Collected,
    ) -> Vec<PendingFolder> {
        let mut subfolders = Vec::new();
        let mut file_count = 0;

        for item in children {
            match item.kind() {
                ItemKind::Folder => subfolders.push(PendingFolder {
                    path: folder.path.join(&item.name),
                    prefix: format!("{}{}/", folder.prefix, item.name),
                    is_root: false,
                }),
                ItemKind::File => {
                    file_count += 1;
                    if !matcher.matches(&item.name) {
                        continue;
                    }
                    let entry = SyncEntry::new(item, &folder.prefix);
                    if !collected.entries.contains_key(&entry.destination_path) {
                        observer.on_entry_matched(&entry);
                        collected
                            .entries
                            .insert(entry.destination_path.clone(), entry);
                    }
                }
                ItemKind::Malformed => observer.on_item_skipped(&folder.path, &item),
            }
        }

        observer.on_folder_listed(&folder.path, file_count, subfolders.len());
        subfolders
    }
}
