//! The slug-to-identifier mapping service.
//!
//! [`MappingService`] hands out a short, stable [`Identifier`](slugmap_types::Identifier)
//! for each (slug, type) key and resolves identifiers back to their keys.
//! It talks to the store through a [`ConnectionManager`], which opens one
//! shared session lazily and bounds every connect and operation with a
//! timeout.
//!
//! Every failure is reported as a [`ServiceError`]: invalid request, not
//! found, store unavailable, or constraint violation.

pub mod connection;
pub mod error;
pub mod service;

#[cfg(test)]
mod test_support;

pub use connection::{ConnectionConfig, ConnectionManager};
pub use error::{ServiceError, ServiceResult};
pub use service::{HealthStatus, MappingService};
