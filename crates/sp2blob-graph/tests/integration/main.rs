//! Integration tests for sp2blob-graph
//!
//! Uses wiremock to simulate the Microsoft Graph API and the identity
//! platform, and verifies end-to-end behavior of token acquisition,
//! site/library resolution, paged listings, downloads and deletes.

mod common;

mod test_auth;
mod test_items;
mod test_list_children;
mod test_resolve;
