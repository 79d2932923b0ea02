//! Use cases (interactors) for sp2blob
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`RecursiveLister`] - Bounded-concurrency walk of a drive folder tree
//! - [`CopyFilesUseCase`] - List, stream into the container, optionally delete

pub mod copy_files;
pub mod list_recursive;

pub use copy_files::{CopyFilesUseCase, CopyObserver, CopyOptions};
pub use list_recursive::{ListObserver, NoopObserver, RecursiveLister, DEFAULT_MAX_CONCURRENCY};
