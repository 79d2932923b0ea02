//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the domain core depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDriveProvider`] - Source drive: list folders, read and delete files
//! - [`IBlobSink`] - Destination container: ensure it exists, upload objects
//! - [`ITokenSource`] - Bearer tokens for the adapters

pub mod blob_sink;
pub mod drive_provider;
pub mod token_source;

pub use blob_sink::{ContainerStatus, IBlobSink};
pub use drive_provider::{ByteStream, IDriveProvider};
pub use token_source::{
    ITokenSource, StaticTokenSource, Tokens, GRAPH_SCOPE, STORAGE_SCOPE,
};
