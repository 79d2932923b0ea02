//! Shared test helpers for Blob service integration tests

use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use wiremock::MockServer;

use sp2blob_core::ports::{ByteStream, StaticTokenSource};
use sp2blob_storage::blob::BlobClient;

pub const TEST_TOKEN: &str = "storage-token";
pub const CONTAINER: &str = "invoices";

/// Starts a mock server and returns a client for [`CONTAINER`] on it
pub async fn setup_blob_mock() -> (MockServer, BlobClient) {
    let server = MockServer::start().await;
    let client = BlobClient::new(
        server.uri(),
        CONTAINER,
        Arc::new(StaticTokenSource::new(TEST_TOKEN)),
    );
    (server, client)
}

/// A byte stream yielding `data` in pieces of `piece` bytes
pub fn stream_of(data: &[u8], piece: usize) -> ByteStream {
    let chunks: Vec<anyhow::Result<Bytes>> = data
        .chunks(piece)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(chunks).boxed()
}
