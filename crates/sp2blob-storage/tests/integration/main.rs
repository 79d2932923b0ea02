//! Integration tests for sp2blob-storage
//!
//! Uses wiremock to simulate the Blob service and verifies container
//! creation, single-shot uploads and block-list uploads.

mod common;

mod test_container;
mod test_upload;
