//! Connectors and stores that misbehave on purpose.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slugmap_store::{
    InMemoryMappingStore, InsertOutcome, MappingStore, StoreConnector, StoreError, StoreResult,
};
use slugmap_types::{Identifier, MappingKey, MappingRecord};

/// Hands out one shared in-memory store and counts connection attempts.
#[derive(Default)]
pub struct CountingConnector {
    pub store: Arc<InMemoryMappingStore>,
    pub connects: AtomicUsize,
    pub delay: Option<Duration>,
}

impl CountingConnector {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for CountingConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn MappingStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.store.clone())
    }

    fn target(&self) -> String {
        "counting".into()
    }
}

/// Always refuses.
pub struct RefusingConnector;

#[async_trait]
impl StoreConnector for RefusingConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn MappingStore>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn target(&self) -> String {
        "refusing".into()
    }
}

/// Never finishes connecting.
pub struct HangingConnector;

#[async_trait]
impl StoreConnector for HangingConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn MappingStore>> {
        std::future::pending().await
    }

    fn target(&self) -> String {
        "hanging".into()
    }
}

/// Connects fine, then every operation stalls.
pub struct StallingStore;

#[async_trait]
impl MappingStore for StallingStore {
    fn backend(&self) -> &'static str {
        "stalling"
    }

    async fn find_by_key(&self, _key: &MappingKey) -> StoreResult<Option<MappingRecord>> {
        std::future::pending().await
    }

    async fn find_by_identifier(
        &self,
        _identifier: &Identifier,
    ) -> StoreResult<Option<MappingRecord>> {
        std::future::pending().await
    }

    async fn insert(&self, _record: &MappingRecord) -> StoreResult<MappingRecord> {
        std::future::pending().await
    }

    async fn insert_if_absent(&self, _record: &MappingRecord) -> StoreResult<InsertOutcome> {
        std::future::pending().await
    }

    async fn count(&self) -> StoreResult<u64> {
        std::future::pending().await
    }

    async fn ping(&self) -> StoreResult<()> {
        std::future::pending().await
    }
}

pub struct StallingConnector;

#[async_trait]
impl StoreConnector for StallingConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn MappingStore>> {
        Ok(Arc::new(StallingStore))
    }

    fn target(&self) -> String {
        "stalling".into()
    }
}

/// A store that reports itself closed after the first connect, so the
/// manager must reconnect.
pub struct ClosedStore;

#[async_trait]
impl MappingStore for ClosedStore {
    fn backend(&self) -> &'static str {
        "closed"
    }

    async fn find_by_key(&self, _key: &MappingKey) -> StoreResult<Option<MappingRecord>> {
        Err(StoreError::Unavailable("session closed".into()))
    }

    async fn find_by_identifier(
        &self,
        _identifier: &Identifier,
    ) -> StoreResult<Option<MappingRecord>> {
        Err(StoreError::Unavailable("session closed".into()))
    }

    async fn insert(&self, _record: &MappingRecord) -> StoreResult<MappingRecord> {
        Err(StoreError::Unavailable("session closed".into()))
    }

    async fn insert_if_absent(&self, _record: &MappingRecord) -> StoreResult<InsertOutcome> {
        Err(StoreError::Unavailable("session closed".into()))
    }

    async fn count(&self) -> StoreResult<u64> {
        Err(StoreError::Unavailable("session closed".into()))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// First connect yields a closed store, later ones a healthy shared store.
#[derive(Default)]
pub struct FlakyConnector {
    pub healthy: Arc<InMemoryMappingStore>,
    pub connects: AtomicUsize,
}

#[async_trait]
impl StoreConnector for FlakyConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn MappingStore>> {
        if self.connects.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Arc::new(ClosedStore))
        } else {
            Ok(self.healthy.clone())
        }
    }

    fn target(&self) -> String {
        "flaky".into()
    }
}
