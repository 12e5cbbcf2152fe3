use async_trait::async_trait;
use slugmap_types::{Identifier, MappingKey, MappingRecord};

use crate::error::StoreResult;

/// Result of [`MappingStore::insert_if_absent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertOutcome {
    /// The record now stored for the key: the new one, or the one that was
    /// already there.
    pub record: MappingRecord,
    /// `true` if this call wrote the record.
    pub created: bool,
}

/// Persistent collection of mapping records.
///
/// All implementations must satisfy these invariants:
/// - An identifier maps to at most one record.
/// - A (slug, type) key maps to at most one record.
/// - Records are append-only: never updated or deleted.
/// - Lookups have no side effects and fail only on transport or storage
///   errors; a missing record is `Ok(None)`.
/// - Slug and type are validated by the caller (see [`MappingKey`]).
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Look up the record for a (slug, type) key.
    async fn find_by_key(&self, key: &MappingKey) -> StoreResult<Option<MappingRecord>>;

    /// Look up the record carrying `identifier`.
    async fn find_by_identifier(&self, identifier: &Identifier)
        -> StoreResult<Option<MappingRecord>>;

    /// Insert a new record.
    ///
    /// Fails with [`StoreError::ConstraintViolation`](crate::StoreError::ConstraintViolation)
    /// if the key or the identifier is already present.
    async fn insert(&self, record: &MappingRecord) -> StoreResult<MappingRecord>;

    /// Atomically insert `record` unless its key is already mapped.
    ///
    /// On a key conflict the pre-existing record is returned with
    /// `created = false` and nothing is written. A conflict on the
    /// identifier alone is still a constraint violation.
    async fn insert_if_absent(&self, record: &MappingRecord) -> StoreResult<InsertOutcome>;

    /// Number of stored records.
    async fn count(&self) -> StoreResult<u64>;

    /// Round-trip liveness probe.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Cheap, non-blocking readiness check. A store that reports `false` is
    /// discarded and reconnected by its owner.
    fn is_ready(&self) -> bool {
        true
    }
}
