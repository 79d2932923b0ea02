//! sp2blob Graph - Microsoft Graph API adapter
//!
//! Provides async client for:
//! - Service principal authentication (OAuth2 client credentials)
//! - SharePoint site and document library resolution
//! - Paged folder listings, file downloads and deletes
//!
//! ## Modules
//!
//! - [`auth`] - Client-credentials token source with per-scope caching
//! - [`client`] - Microsoft Graph API HTTP client
//! - [`provider`] - `IDriveProvider` implementation bound to one library

pub mod auth;
pub mod client;
pub mod provider;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded and the retry budget is spent
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the service last asked us to wait
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Any other unsuccessful status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GraphError {
    /// Classifies an unsuccessful HTTP status together with its body
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(body);
        match status {
            StatusCode::UNAUTHORIZED => GraphError::Unauthorized(message),
            StatusCode::FORBIDDEN => GraphError::Forbidden(message),
            StatusCode::NOT_FOUND => GraphError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => GraphError::TooManyRequests {
                retry_after: Duration::ZERO,
            },
            s if s.is_server_error() => GraphError::ServerError {
                status: s.as_u16(),
                message,
            },
            s => GraphError::UnexpectedStatus {
                status: s.as_u16(),
                message,
            },
        }
    }
}

/// Pulls `error.message` out of a Graph error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
