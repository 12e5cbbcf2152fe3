use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use slugmap_types::{Identifier, MappingKey, MappingRecord};

use crate::error::{StoreError, StoreResult};
use crate::traits::{InsertOutcome, MappingStore};

/// Both lookup directions over a set of records.
///
/// Shared by the in-memory and log-file stores. Callers hold the
/// surrounding lock across [`RecordIndex::probe`] and
/// [`RecordIndex::insert_unchecked`] so the pair is atomic.
#[derive(Debug, Default)]
pub(crate) struct RecordIndex {
    by_key: HashMap<MappingKey, Identifier>,
    by_identifier: HashMap<Identifier, MappingRecord>,
}

/// What an insert would run into.
pub(crate) enum Probe {
    Vacant,
    KeyTaken(MappingRecord),
}

impl RecordIndex {
    pub(crate) fn by_key(&self, key: &MappingKey) -> Option<&MappingRecord> {
        self.by_key
            .get(key)
            .and_then(|id| self.by_identifier.get(id))
    }

    pub(crate) fn by_identifier(&self, identifier: &Identifier) -> Option<&MappingRecord> {
        self.by_identifier.get(identifier)
    }

    /// Check `record` against both uniqueness constraints.
    ///
    /// A taken key wins over an identifier collision: the caller decides
    /// whether that is an error. A reused identifier is always an error.
    pub(crate) fn probe(&self, record: &MappingRecord) -> StoreResult<Probe> {
        if let Some(existing) = self.by_key(&record.key()) {
            return Ok(Probe::KeyTaken(existing.clone()));
        }
        if self.by_identifier.contains_key(&record.identifier) {
            return Err(StoreError::ConstraintViolation(format!(
                "identifier {} already issued",
                record.identifier
            )));
        }
        Ok(Probe::Vacant)
    }

    pub(crate) fn insert_unchecked(&mut self, record: MappingRecord) {
        self.by_key.insert(record.key(), record.identifier);
        self.by_identifier.insert(record.identifier, record);
    }

    pub(crate) fn len(&self) -> usize {
        self.by_identifier.len()
    }
}

/// Strict-insert view of a probe result.
pub(crate) fn require_vacant(probe: Probe) -> StoreResult<()> {
    match probe {
        Probe::Vacant => Ok(()),
        Probe::KeyTaken(existing) => Err(StoreError::ConstraintViolation(format!(
            "{} already mapped to {}",
            existing.key(),
            existing.identifier
        ))),
    }
}

/// In-memory, HashMap-based mapping store.
///
/// Intended for tests and embedding. Records live behind a `RwLock`;
/// inserts take the write lock for both the constraint check and the write.
pub struct InMemoryMappingStore {
    index: RwLock<RecordIndex>,
}

impl InMemoryMappingStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(RecordIndex::default()),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.index.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryMappingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_by_key(&self, key: &MappingKey) -> StoreResult<Option<MappingRecord>> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index.by_key(key).cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> StoreResult<Option<MappingRecord>> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index.by_identifier(identifier).cloned())
    }

    async fn insert(&self, record: &MappingRecord) -> StoreResult<MappingRecord> {
        let mut index = self.index.write().expect("lock poisoned");
        require_vacant(index.probe(record)?)?;
        index.insert_unchecked(record.clone());
        Ok(record.clone())
    }

    async fn insert_if_absent(&self, record: &MappingRecord) -> StoreResult<InsertOutcome> {
        let mut index = self.index.write().expect("lock poisoned");
        match index.probe(record)? {
            Probe::KeyTaken(existing) => Ok(InsertOutcome {
                record: existing,
                created: false,
            }),
            Probe::Vacant => {
                index.insert_unchecked(record.clone());
                Ok(InsertOutcome {
                    record: record.clone(),
                    created: true,
                })
            }
        }
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }
}

impl std::fmt::Debug for InMemoryMappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMappingStore")
            .field("record_count", &self.len())
            .finish()
    }
}
