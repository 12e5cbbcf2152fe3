//! Mapping record storage for slugmap.
//!
//! A mapping store holds (identifier, slug, type) records and enforces the
//! two uniqueness rules the service depends on: one record per identifier
//! and one record per (slug, type) key.
//!
//! # Storage Backends
//!
//! All backends implement the [`MappingStore`] trait:
//!
//! - [`InMemoryMappingStore`] -- `HashMap`-based store for tests and embedding
//! - [`LogMappingStore`] -- durable append-only file with CRC-framed entries
//! - [`PostgresMappingStore`] -- table with primary-key and unique constraints
//!
//! [`UrlConnector`] picks a backend from a connection string.
//!
//! # Design Rules
//!
//! 1. Records are append-only: never updated, never deleted.
//! 2. Creation goes through [`MappingStore::insert_if_absent`], a single
//!    atomic step guarded by the (slug, type) constraint.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod connect;
pub mod error;
pub mod log;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use connect::{ConnectionString, StoreConnector, UrlConnector, DEFAULT_CONNECT_TIMEOUT};
pub use error::{StoreError, StoreResult};
pub use log::{LogConfig, LogMappingStore, SyncMode};
pub use memory::InMemoryMappingStore;
pub use postgres::PostgresMappingStore;
pub use traits::{InsertOutcome, MappingStore};
