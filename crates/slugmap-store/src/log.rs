use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slugmap_types::{Identifier, MappingKey, MappingRecord};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::{require_vacant, Probe, RecordIndex};
use crate::traits::{InsertOutcome, MappingStore};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Upper bound on a single encoded record. Anything larger is treated as a
/// corrupt length field.
const MAX_ENTRY_SIZE: u32 = 1024 * 1024;

/// Flush/sync strategy for the record log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every record.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering.
    OsDefault,
}

impl std::str::FromStr for SyncMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "every_write" => Ok(Self::EveryWrite),
            "os_default" => Ok(Self::OsDefault),
            other => Err(StoreError::Serialization(format!(
                "unknown sync mode {other:?}; expected every_write or os_default"
            ))),
        }
    }
}

/// Configuration for [`LogMappingStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub sync_mode: SyncMode,
}

struct LogWriter {
    file: File,
    /// Length of the valid prefix of the file.
    offset: u64,
}

struct LogInner {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    index: RwLock<RecordIndex>,
    config: LogConfig,
}

/// Durable mapping store backed by a single append-only file.
///
/// On-disk format, one entry per record:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized MappingRecord)]
/// ```
///
/// The whole file is replayed into memory on open. Entries that fail the
/// CRC check are skipped and a torn tail from a crash is cut off so later
/// appends stay readable. A damaged header in the middle of the file makes
/// [`open`](Self::open) fail instead; nothing after it is ever discarded.
///
/// All inserts are serialized through one writer, so the constraint check
/// and the append happen atomically. Appends run on the blocking pool.
pub struct LogMappingStore {
    inner: Arc<LogInner>,
}

impl LogMappingStore {
    /// Open (or create) a record log at `path` and replay it.
    pub fn open(path: &Path, config: LogConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let bytes = fs::read(path)?;
        let recovered = recover(&bytes).map_err(|e| match e {
            StoreError::Serialization(m) => {
                StoreError::Serialization(format!("{}: {m}", path.display()))
            }
            other => other,
        })?;
        if recovered.valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                valid_len = recovered.valid_len,
                file_len = bytes.len(),
                "discarding torn tail of record log"
            );
            file.set_len(recovered.valid_len)?;
        }

        let mut index = RecordIndex::default();
        for record in recovered.records {
            match index.probe(&record) {
                Ok(Probe::Vacant) => index.insert_unchecked(record),
                Ok(Probe::KeyTaken(existing)) => warn!(
                    key = %existing.key(),
                    kept = %existing.identifier,
                    dropped = %record.identifier,
                    "duplicate key in record log; keeping first"
                ),
                Err(e) => warn!(error = %e, "conflicting record in log; skipping"),
            }
        }

        info!(
            path = %path.display(),
            records = index.len(),
            "record log opened"
        );

        Ok(Self {
            inner: Arc::new(LogInner {
                path: path.to_path_buf(),
                writer: Mutex::new(LogWriter {
                    file,
                    offset: recovered.valid_len,
                }),
                index: RwLock::new(index),
                config,
            }),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Current length of the log in bytes.
    pub fn offset(&self) -> u64 {
        self.inner.writer.lock().expect("log mutex poisoned").offset
    }

    /// Number of records currently indexed.
    pub fn len(&self) -> usize {
        self.inner.index.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn write_record(&self, record: &MappingRecord, strict: bool) -> StoreResult<InsertOutcome> {
        let inner = Arc::clone(&self.inner);
        let record = record.clone();
        tokio::task::spawn_blocking(move || inner.write_record(&record, strict))
            .await
            .map_err(|e| StoreError::Backend(format!("record log writer failed: {e}")))?
    }
}

impl LogInner {
    fn append(&self, w: &mut LogWriter, record: &MappingRecord) -> StoreResult<()> {
        let frame = encode_frame(record)?;
        if let Err(e) = write_frame(&mut w.file, &frame, self.config.sync_mode) {
            // Cut any partial frame so the next append starts on a boundary.
            if let Err(trunc) = w.file.set_len(w.offset) {
                warn!(error = %trunc, "failed to roll back partial log entry");
            }
            return Err(e.into());
        }
        debug!(offset = w.offset, len = frame.len(), "record log append");
        w.offset += frame.len() as u64;
        Ok(())
    }

    fn write_record(&self, record: &MappingRecord, strict: bool) -> StoreResult<InsertOutcome> {
        let mut w = self.writer.lock().expect("log mutex poisoned");
        let probe = self.index.read().expect("lock poisoned").probe(record)?;
        match probe {
            Probe::KeyTaken(existing) if !strict => Ok(InsertOutcome {
                record: existing,
                created: false,
            }),
            probe => {
                require_vacant(probe)?;
                self.append(&mut w, record)?;
                self.index
                    .write()
                    .expect("lock poisoned")
                    .insert_unchecked(record.clone());
                Ok(InsertOutcome {
                    record: record.clone(),
                    created: true,
                })
            }
        }
    }
}

#[async_trait]
impl MappingStore for LogMappingStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn find_by_key(&self, key: &MappingKey) -> StoreResult<Option<MappingRecord>> {
        Ok(self
            .inner
            .index
            .read()
            .expect("lock poisoned")
            .by_key(key)
            .cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> StoreResult<Option<MappingRecord>> {
        Ok(self
            .inner
            .index
            .read()
            .expect("lock poisoned")
            .by_identifier(identifier)
            .cloned())
    }

    async fn insert(&self, record: &MappingRecord) -> StoreResult<MappingRecord> {
        self.write_record(record, true)
            .await
            .map(|outcome| outcome.record)
    }

    async fn insert_if_absent(&self, record: &MappingRecord) -> StoreResult<InsertOutcome> {
        self.write_record(record, false).await
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }
}

impl std::fmt::Debug for LogMappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogMappingStore")
            .field("path", &self.inner.path)
            .field("record_count", &self.len())
            .finish()
    }
}

fn encode_frame(record: &MappingRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_ENTRY_SIZE)
        .ok_or_else(|| {
            StoreError::Serialization(format!("record too large: {} bytes", payload.len()))
        })?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn write_frame(file: &mut File, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    file.write_all(frame)?;
    if sync_mode == SyncMode::EveryWrite {
        file.sync_data()?;
    }
    Ok(())
}

struct Recovered {
    records: Vec<MappingRecord>,
    /// Byte length of the prefix made of complete entries.
    valid_len: u64,
}

/// Decode every complete entry in `bytes`.
///
/// Entries with a bad CRC or undecodable payload are skipped. Recovery ends
/// at a torn tail: a partial header, an entry whose well-formed length runs
/// past the end of the data, or a zero-filled remainder. A zero or
/// oversized length followed by anything else is corruption in the middle
/// of the log and is reported as an error.
fn recover(bytes: &[u8]) -> StoreResult<Recovered> {
    let mut records = Vec::new();
    let mut offset = 0usize;

    while offset + HEADER_SIZE <= bytes.len() {
        let header = &bytes[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || length > MAX_ENTRY_SIZE {
            if bytes[offset..].iter().all(|b| *b == 0) {
                warn!(offset, file_len = bytes.len(), "zero-filled tail; stopping recovery");
                break;
            }
            return Err(StoreError::Serialization(format!(
                "corrupt entry header at offset {offset} (length {length})"
            )));
        }

        let end = offset + HEADER_SIZE + length as usize;
        if end > bytes.len() {
            warn!(offset, length, file_len = bytes.len(), "truncated entry; stopping recovery");
            break;
        }

        let payload = &bytes[offset + HEADER_SIZE..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping entry"
            );
        } else {
            match bincode::deserialize::<MappingRecord>(payload) {
                Ok(record) => records.push(record),
                Err(e) => warn!(offset, error = %e, "failed to decode log entry; skipping"),
            }
        }
        offset = end;
    }

    debug!(recovered = records.len(), "record log recovery complete");
    Ok(Recovered {
        records,
        valid_len: offset as u64,
    })
}
