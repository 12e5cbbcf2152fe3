use std::time::Duration;

use async_trait::async_trait;
use slugmap_types::{Identifier, MappingKey, MappingRecord};
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, Config, NoTls, Row};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{InsertOutcome, MappingStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS slug_mappings (
    identifier TEXT PRIMARY KEY,
    slug       TEXT NOT NULL,
    kind       TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT slug_mappings_key UNIQUE (slug, kind)
)";

const SELECT_BY_KEY: &str =
    "SELECT identifier, slug, kind FROM slug_mappings WHERE slug = $1 AND kind = $2";
const SELECT_BY_IDENTIFIER: &str =
    "SELECT identifier, slug, kind FROM slug_mappings WHERE identifier = $1";
const INSERT: &str = "INSERT INTO slug_mappings (identifier, slug, kind) VALUES ($1, $2, $3)";
const INSERT_IF_ABSENT: &str = "INSERT INTO slug_mappings (identifier, slug, kind) VALUES ($1, $2, $3) \
     ON CONFLICT (slug, kind) DO NOTHING \
     RETURNING identifier, slug, kind";
const COUNT: &str = "SELECT COUNT(*) FROM slug_mappings";

/// Attempts at insert-if-absent before giving up. A conflicting row that is
/// not yet visible to the follow-up SELECT needs another round.
const INSERT_ATTEMPTS: usize = 3;

/// Mapping store backed by a PostgreSQL table.
///
/// Uniqueness is enforced by the table: `identifier` is the primary key and
/// (`slug`, `kind`) carries a unique constraint. The table is created on
/// connect if it does not exist.
pub struct PostgresMappingStore {
    client: Client,
    connection: JoinHandle<()>,
}

impl PostgresMappingStore {
    /// Connect to `url` and make sure the schema exists.
    ///
    /// `connect_timeout` bounds the TCP/TLS handshake per host; callers that
    /// need an end-to-end bound should wrap this future in a timeout as well.
    pub async fn connect(url: &str, connect_timeout: Duration) -> StoreResult<Self> {
        let mut config: Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| StoreError::InvalidConnectionString(e.to_string()))?;
        config
            .connect_timeout(connect_timeout)
            .keepalives(true)
            .application_name("slugmap");

        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| StoreError::Unavailable(describe(&e)))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection closed");
            }
        });

        let store = Self { client, connection };
        store.migrate().await?;
        info!("postgres mapping store ready");
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        self.client.batch_execute(SCHEMA).await.map_err(map_error)
    }
}

impl Drop for PostgresMappingStore {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[async_trait]
impl MappingStore for PostgresMappingStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find_by_key(&self, key: &MappingKey) -> StoreResult<Option<MappingRecord>> {
        let row = self
            .client
            .query_opt(SELECT_BY_KEY, &[&key.slug(), &key.kind()])
            .await
            .map_err(map_error)?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> StoreResult<Option<MappingRecord>> {
        let text = identifier.to_string();
        let row = self
            .client
            .query_opt(SELECT_BY_IDENTIFIER, &[&text])
            .await
            .map_err(map_error)?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn insert(&self, record: &MappingRecord) -> StoreResult<MappingRecord> {
        let text = record.identifier.to_string();
        self.client
            .execute(INSERT, &[&text, &record.slug, &record.kind])
            .await
            .map_err(map_error)?;
        Ok(record.clone())
    }

    async fn insert_if_absent(&self, record: &MappingRecord) -> StoreResult<InsertOutcome> {
        let text = record.identifier.to_string();
        let key = record.key();
        for attempt in 1..=INSERT_ATTEMPTS {
            let inserted = self
                .client
                .query_opt(INSERT_IF_ABSENT, &[&text, &record.slug, &record.kind])
                .await
                .map_err(map_error)?;
            if let Some(row) = inserted {
                return Ok(InsertOutcome {
                    record: decode_row(&row)?,
                    created: true,
                });
            }
            if let Some(existing) = self.find_by_key(&key).await? {
                return Ok(InsertOutcome {
                    record: existing,
                    created: false,
                });
            }
            debug!(attempt, key = %key, "conflicting row not visible yet; retrying");
        }
        Err(StoreError::ConstraintViolation(format!(
            "{key} conflicted but no row could be read back"
        )))
    }

    async fn count(&self) -> StoreResult<u64> {
        let row = self.client.query_one(COUNT, &[]).await.map_err(map_error)?;
        let count: i64 = row.try_get(0).map_err(map_error)?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    fn is_ready(&self) -> bool {
        !self.client.is_closed()
    }
}

impl std::fmt::Debug for PostgresMappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresMappingStore")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

fn decode_row(row: &Row) -> StoreResult<MappingRecord> {
    let identifier: String = row.try_get(0).map_err(map_error)?;
    let identifier = Identifier::parse(&identifier)
        .map_err(|e| StoreError::Serialization(format!("stored identifier: {e}")))?;
    Ok(MappingRecord {
        identifier,
        slug: row.try_get(1).map_err(map_error)?,
        kind: row.try_get(2).map_err(map_error)?,
    })
}

fn map_error(e: tokio_postgres::Error) -> StoreError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        StoreError::ConstraintViolation(describe(&e))
    } else if e.is_closed() {
        StoreError::Unavailable(describe(&e))
    } else {
        StoreError::Backend(describe(&e))
    }
}

/// Server-side message when there is one; `Display` for database errors is
/// just "db error".
fn describe(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}
