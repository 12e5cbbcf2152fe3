use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use slugmap_store::{MappingStore, StoreConnector, StoreError, StoreResult};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

/// Time budgets for the store session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Bound on establishing a session.
    pub connect_timeout: Duration,
    /// Bound on any single store operation.
    pub operation_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5_000),
            operation_timeout: Duration::from_millis(45_000),
        }
    }
}

/// Owns the process-wide store session.
///
/// The session is opened lazily on first use and reused by every caller
/// until the store reports it is no longer ready. Connection attempts are
/// serialized, so concurrent callers never open duplicate sessions.
pub struct ConnectionManager {
    connector: Arc<dyn StoreConnector>,
    config: ConnectionConfig,
    current: RwLock<Option<Arc<dyn MappingStore>>>,
    connecting: Mutex<()>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn StoreConnector>, config: ConnectionConfig) -> Self {
        Self {
            connector,
            config,
            current: RwLock::new(None),
            connecting: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Loggable description of the store target.
    pub fn target(&self) -> String {
        self.connector.target()
    }

    /// Whether a live session is cached. Never blocks or connects.
    pub fn is_ready(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<Arc<dyn MappingStore>> {
        self.current
            .read()
            .expect("lock poisoned")
            .as_ref()
            .filter(|store| store.is_ready())
            .cloned()
    }

    /// Return the live session, opening one if needed.
    ///
    /// Fails with [`StoreError::Timeout`] if the connector does not finish
    /// within `connect_timeout`, or with the connector's own error. Nothing
    /// is retried here; the next call makes a fresh attempt.
    pub async fn ensure_connected(&self) -> StoreResult<Arc<dyn MappingStore>> {
        if let Some(store) = self.cached() {
            return Ok(store);
        }

        let _guard = self.connecting.lock().await;
        // Another caller may have connected while we waited.
        if let Some(store) = self.cached() {
            return Ok(store);
        }

        let target = self.connector.target();
        let store = match timeout(self.config.connect_timeout, self.connector.connect()).await {
            Ok(Ok(store)) => store,
            Ok(Err(e)) => {
                warn!(%target, error = %e, "failed to connect to mapping store");
                return Err(e);
            }
            Err(_) => {
                let millis = self.config.connect_timeout.as_millis() as u64;
                warn!(%target, millis, "timed out connecting to mapping store");
                return Err(StoreError::Timeout {
                    operation: "connect".into(),
                    millis,
                });
            }
        };

        info!(%target, backend = store.backend(), "mapping store connected");
        *self.current.write().expect("lock poisoned") = Some(store.clone());
        Ok(store)
    }

    /// Run one store operation on the live session, bounded by
    /// `operation_timeout`.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, op: F) -> StoreResult<T>
    where
        F: FnOnce(Arc<dyn MappingStore>) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let store = self.ensure_connected().await?;
        match timeout(self.config.operation_timeout, op(store)).await {
            Ok(result) => result,
            Err(_) => {
                let millis = self.config.operation_timeout.as_millis() as u64;
                warn!(operation, millis, "store operation timed out");
                Err(StoreError::Timeout {
                    operation: operation.into(),
                    millis,
                })
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("target", &self.connector.target())
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish()
    }
}
