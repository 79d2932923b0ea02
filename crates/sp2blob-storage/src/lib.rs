//! sp2blob Storage - Azure Blob Storage adapter
//!
//! Talks to the Blob service REST API with bearer tokens from an
//! `ITokenSource`:
//! - Create-if-missing for the target container
//! - Single-request uploads for small blobs
//! - Block uploads committed with a block list for large blobs
//!
//! ## Modules
//!
//! - [`blob`] - [`blob::BlobClient`] and the [`blob::AzureBlobSink`] port implementation

pub mod blob;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the Blob service
#[derive(Debug, Error)]
pub enum StorageError {
    /// Token missing, expired or issued for the wrong audience
    #[error("Unauthorized ({code})")]
    Unauthorized { code: String },

    /// The principal lacks a data-plane role on the account or container
    #[error("Forbidden ({code}): assign a Storage Blob Data role to the service principal")]
    Forbidden { code: String },

    /// The container is still being deleted and cannot be recreated yet
    #[error("Container is being deleted")]
    ContainerBeingDeleted,

    /// Any other unsuccessful status
    #[error("Unexpected status {status} ({code}): {message}")]
    UnexpectedStatus {
        status: u16,
        code: String,
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl StorageError {
    /// Classifies an unsuccessful status. `code` is the `x-ms-error-code` header.
    pub fn from_status(status: StatusCode, code: Option<&str>, body: &str) -> Self {
        let code = code.unwrap_or("").to_string();
        match status {
            StatusCode::UNAUTHORIZED => StorageError::Unauthorized { code },
            StatusCode::FORBIDDEN => StorageError::Forbidden { code },
            StatusCode::CONFLICT if code == "ContainerBeingDeleted" => {
                StorageError::ContainerBeingDeleted
            }
            s => StorageError::UnexpectedStatus {
                status: s.as_u16(),
                code,
                message: xml_message(body),
            },
        }
    }
}

/// Extracts `<Message>` from a Blob service error body
fn xml_message(body: &str) -> String {
    body.split_once("<Message>")
        .and_then(|(_, rest)| rest.split_once("</Message>"))
        .map(|(message, _)| message.trim().to_string())
        .unwrap_or_else(|| body.trim().to_string())
}
