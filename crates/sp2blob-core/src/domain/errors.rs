//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! unusable filter patterns, malformed ids, and the errors a recursive
//! listing can surface to its caller.

use thiserror::Error;

use super::report::ListingReport;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The file filter could not be turned into a matcher
    #[error("Invalid filter pattern '{pattern}': {reason}")]
    InvalidFilterPattern {
        /// The pattern as supplied by the user
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

/// Errors surfaced by a recursive listing
#[derive(Debug, Error)]
pub enum ListError {
    /// A folder could not be enumerated
    ///
    /// Returned as an error only for the scan root; failures below the root
    /// are collected in [`ListingReport::failures`] instead.
    #[error("Failed to list folder '{path}': {cause}")]
    DirectoryListFailure {
        /// Folder path relative to the drive root
        path: String,
        /// Rendered cause chain
        cause: String,
    },

    /// The run was cancelled; `partial` holds what was collected up to then
    #[error("Listing cancelled after {} folders", .partial.folders_scanned)]
    Cancelled {
        /// Entries and failures gathered before cancellation
        partial: ListingReport,
    },
}
