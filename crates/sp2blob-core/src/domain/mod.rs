//! Domain entities and business logic
//!
//! This module contains the core domain types for sp2blob:
//! - Newtypes for run identifiers and remote folder locations
//! - Remote items and the sync entries derived from them
//! - Listing and copy reports
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod remote_item;
pub mod report;

// Re-export commonly used types
pub use errors::{DomainError, ListError};
pub use newtypes::{encode_segment, RemoteFolderPath, RunId};
pub use remote_item::{ItemKind, RemoteItem, SyncEntry};
pub use report::{CopyReport, ListFailure, ListingReport, TransferFailure};
