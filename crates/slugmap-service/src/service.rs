use std::sync::Arc;

use slugmap_store::{LogConfig, StoreConnector, UrlConnector};
use slugmap_types::{Identifier, MappingKey, MappingRecord};
use tracing::{debug, info};

use crate::connection::{ConnectionConfig, ConnectionManager};
use crate::error::{ServiceError, ServiceResult};

/// Outcome of [`MappingService::health_check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Connected,
    Disconnected { reason: String },
}

impl HealthStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Issues identifiers for (slug, type) keys and resolves them back.
///
/// Holds no state of its own beyond the shared [`ConnectionManager`]; clones
/// share the same session.
#[derive(Clone, Debug)]
pub struct MappingService {
    connection: Arc<ConnectionManager>,
}

impl MappingService {
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self { connection }
    }

    /// Build a service over any connector.
    pub fn with_connector(connector: Arc<dyn StoreConnector>, config: ConnectionConfig) -> Self {
        Self::new(Arc::new(ConnectionManager::new(connector, config)))
    }

    /// Build a service for a connection string such as `postgres://…`,
    /// `file:mappings.log`, or `memory:`. `log_config` applies only to
    /// `file:` stores.
    pub fn from_url(
        url: &str,
        config: ConnectionConfig,
        log_config: LogConfig,
    ) -> ServiceResult<Self> {
        let connector = UrlConnector::parse(url)
            .map_err(|e| ServiceError::InvalidRequest(e.to_string()))?
            .with_connect_timeout(config.connect_timeout)
            .with_log_config(log_config);
        Ok(Self::with_connector(Arc::new(connector), config))
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Return the identifier for (`slug`, `kind`), creating it on first use.
    ///
    /// Creation goes through the store's atomic insert-if-absent, so
    /// concurrent first requests for the same key all receive the identifier
    /// that won. Empty input is rejected before the store is contacted.
    pub async fn get_or_create_identifier(
        &self,
        slug: &str,
        kind: &str,
    ) -> ServiceResult<Identifier> {
        let key = MappingKey::new(slug, kind)?;
        debug!(%key, "looking up mapping");

        let lookup = key.clone();
        let existing = self
            .connection
            .run("find_by_key", |store| async move {
                store.find_by_key(&lookup).await
            })
            .await?;
        if let Some(record) = existing {
            return Ok(record.identifier);
        }

        let candidate = MappingRecord::generate(key);
        let outcome = self
            .connection
            .run("insert_if_absent", |store| async move {
                store.insert_if_absent(&candidate).await
            })
            .await?;

        if outcome.created {
            info!(
                key = %outcome.record.key(),
                identifier = %outcome.record.identifier,
                "issued new identifier"
            );
        } else {
            debug!(key = %outcome.record.key(), "lost creation race; using existing identifier");
        }
        Ok(outcome.record.identifier)
    }

    /// Return the record carrying `identifier`.
    ///
    /// Text that is not a canonical identifier cannot name any record and
    /// is reported as not found without contacting the store.
    pub async fn resolve_identifier(&self, identifier: &str) -> ServiceResult<MappingRecord> {
        if identifier.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "identifier must be a non-empty string".into(),
            ));
        }
        let Ok(parsed) = Identifier::parse(identifier) else {
            debug!(identifier, "malformed identifier");
            return Err(not_found(identifier));
        };

        let found = self
            .connection
            .run("find_by_identifier", |store| async move {
                store.find_by_identifier(&parsed).await
            })
            .await?;
        found.ok_or_else(|| not_found(identifier))
    }

    /// Check that the store session can be (re)established and answers.
    pub async fn health_check(&self) -> HealthStatus {
        match self
            .connection
            .run("ping", |store| async move { store.ping().await })
            .await
        {
            Ok(()) => HealthStatus::Connected,
            Err(e) => HealthStatus::Disconnected {
                reason: ServiceError::from(e).message().to_string(),
            },
        }
    }
}

fn not_found(identifier: &str) -> ServiceError {
    ServiceError::NotFound(format!("no mapping for identifier {identifier}"))
}
