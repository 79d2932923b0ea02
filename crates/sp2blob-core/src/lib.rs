//! sp2blob Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `RemoteItem`, `SyncEntry`, `ListingReport`, `CopyReport`
//! - **Use cases** - `RecursiveLister`, `CopyFilesUseCase`
//! - **Port definitions** - Traits for adapters: `IDriveProvider`, `IBlobSink`, `ITokenSource`
//! - **Filters** - Wildcard file-name matching
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod filter;
pub mod ports;
pub mod usecases;
