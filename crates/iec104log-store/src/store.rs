use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::UNIX_EPOCH;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::entry::{Direction, LogEntry, Role};
use crate::error::{Result, StoreError};
use crate::record::{encode_line, parse_line};
use crate::slots::AppendOnlySlots;

/// Identifying metadata of a store, as listed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreInfo {
    pub name: String,
    pub role: Role,
    /// Entries currently published (the end offset).
    pub entries: u64,
    /// Size of the backing file in bytes.
    pub size: u64,
    /// Last modification time of the backing file, ms since the epoch.
    pub modified_ms: u64,
}

struct StoreWriter {
    file: File,
    /// Bytes of the backing file already turned into entries.
    consumed: u64,
    /// Lines read from the backing file, for diagnostics.
    lines: u64,
}

/// Append-only log of one captured connection, backed by a JSON-lines file.
///
/// Appends and ingestion of externally written lines are serialized on an
/// internal writer lock. Readers never take that lock: they observe every
/// entry published before their read began, and nothing half-written.
pub struct ConnectionLogStore {
    name: String,
    role: Role,
    path: PathBuf,
    config: StoreConfig,
    entries: AppendOnlySlots<Arc<LogEntry>>,
    writer: Mutex<StoreWriter>,
}

impl ConnectionLogStore {
    /// Open (or create) the store backed by `path` and load its lines.
    pub fn open(path: impl AsRef<Path>, role: Role, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::InvalidName(path.display().to_string()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| StoreError::io(&path, err))?;

        let size = file
            .metadata()
            .map_err(|err| StoreError::io(&path, err))?
            .len();
        if size > config.large_file_warn {
            warn!(?path, size, "large capture log, reads may be slow");
        }

        let store = Self {
            name,
            role,
            path,
            config,
            entries: AppendOnlySlots::new(),
            writer: Mutex::new(StoreWriter {
                file,
                consumed: 0,
                lines: 0,
            }),
        };

        let loaded = store.ingest()?;
        debug!(path = ?store.path, %role, loaded, "opened log store");
        Ok(store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// One past the last published offset. Never decreases.
    pub fn end_offset(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.end_offset() == 0
    }

    /// Append a captured APDU and return its sequence offset.
    ///
    /// The record is written to the backing file before it is published.
    /// A failed write is rolled back, so it leaves no entry behind now or
    /// after a later ingest.
    pub fn append(
        &self,
        raw: impl Into<Bytes>,
        direction: Direction,
        timestamp_ms: u64,
    ) -> Result<u64> {
        let raw = raw.into();
        if raw.len() > self.config.max_entry_size {
            return Err(StoreError::EntryTooLarge {
                size: raw.len(),
                max: self.config.max_entry_size,
            });
        }

        let mut writer = self.lock_writer()?;
        // Lines written by the capture process go first to keep file order.
        self.ingest_locked(&mut writer)?;

        let mut line = encode_line(timestamp_ms, direction, &raw)?;
        line.push('\n');

        let len = writer
            .file
            .metadata()
            .map_err(|err| StoreError::io(&self.path, err))?
            .len();
        if len > writer.consumed {
            // Terminate a partial external line so ours starts on its own.
            warn!(store = %self.name, pending = len - writer.consumed, "discarding unterminated capture line");
            line.insert(0, '\n');
        }
        let sync = self.config.sync_on_append;
        write_record(&mut writer.file, len, line.as_bytes(), |file, line| {
            file.write_all(line)?;
            file.flush()?;
            if sync {
                file.sync_data()?;
            }
            Ok(())
        })
        .map_err(|err| StoreError::io(&self.path, err))?;
        writer.consumed = len + line.len() as u64;
        writer.lines += 1;

        let offset = self.publish(timestamp_ms, direction, raw)?;
        debug!(store = %self.name, offset, %direction, "appended entry");
        Ok(offset)
    }

    /// Publish complete lines appended to the backing file by another
    /// process since the last ingestion. Returns how many entries were added.
    ///
    /// A trailing line without its newline is left for a later call.
    pub fn ingest(&self) -> Result<usize> {
        let mut writer = self.lock_writer()?;
        self.ingest_locked(&mut writer)
    }

    /// Like [`ingest`](Self::ingest), but returns `Ok(0)` instead of waiting
    /// when an append is in progress.
    pub fn try_ingest(&self) -> Result<usize> {
        match self.writer.try_lock() {
            Ok(mut writer) => self.ingest_locked(&mut writer),
            Err(TryLockError::WouldBlock) => Ok(0),
            Err(TryLockError::Poisoned(_)) => Err(StoreError::Poisoned(self.name.clone())),
        }
    }

    /// Entries with offsets in `[start, start + max_count)`, in order.
    ///
    /// Empty when `start` is at or beyond the end.
    pub fn read_range(&self, start: u64, max_count: usize) -> Vec<Arc<LogEntry>> {
        let start = to_index(start);
        let end = start.saturating_add(max_count);
        self.entries.range(start, end).cloned().collect()
    }

    /// The last `max_count` entries, in order.
    pub fn read_tail(&self, max_count: usize) -> Vec<Arc<LogEntry>> {
        let end = self.entries.len();
        let start = end.saturating_sub(max_count);
        self.entries.range(start, end).cloned().collect()
    }

    /// Iterate entries in `[start, end)` without collecting them.
    pub fn iter_range(&self, start: u64, end: u64) -> impl Iterator<Item = &Arc<LogEntry>> + '_ {
        self.entries.range(to_index(start), to_index(end))
    }

    pub fn get(&self, offset: u64) -> Option<Arc<LogEntry>> {
        self.entries.get(to_index(offset)).cloned()
    }

    /// Current metadata of the store and its backing file.
    pub fn info(&self) -> Result<StoreInfo> {
        let metadata = std::fs::metadata(&self.path).map_err(|err| StoreError::io(&self.path, err))?;
        Ok(StoreInfo {
            name: self.name.clone(),
            role: self.role,
            entries: self.end_offset(),
            size: metadata.len(),
            modified_ms: modified_ms(&metadata),
        })
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, StoreWriter>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Poisoned(self.name.clone()))
    }

    fn ingest_locked(&self, writer: &mut StoreWriter) -> Result<usize> {
        let mut reader = File::open(&self.path).map_err(|err| StoreError::io(&self.path, err))?;
        let len = reader
            .metadata()
            .map_err(|err| StoreError::io(&self.path, err))?
            .len();

        if len < writer.consumed {
            warn!(
                path = ?self.path,
                len,
                consumed = writer.consumed,
                "capture log shrank; keeping published entries"
            );
            return Ok(0);
        }
        if len == writer.consumed {
            return Ok(0);
        }

        reader
            .seek(SeekFrom::Start(writer.consumed))
            .map_err(|err| StoreError::io(&self.path, err))?;
        let mut buf = Vec::with_capacity((len - writer.consumed) as usize);
        reader
            .read_to_end(&mut buf)
            .map_err(|err| StoreError::io(&self.path, err))?;

        let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(0);
        };

        let mut added = 0usize;
        for line in buf[..last_newline].split(|b| *b == b'\n') {
            writer.lines += 1;
            let text = String::from_utf8_lossy(line);
            match parse_line(&text) {
                Ok(Some(captured)) => {
                    self.publish(captured.timestamp_ms, captured.direction, captured.raw)?;
                    added += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(store = %self.name, line = writer.lines, error = %err, "skipping capture record");
                }
            }
        }
        writer.consumed += last_newline as u64 + 1;

        if added > 0 {
            debug!(store = %self.name, added, end = self.end_offset(), "ingested capture lines");
        }
        Ok(added)
    }

    fn publish(&self, timestamp_ms: u64, direction: Direction, raw: Bytes) -> Result<u64> {
        let offset = self.end_offset();
        let entry = LogEntry::new(offset, timestamp_ms, direction, raw, self.config.profile);
        self.entries
            .push(Arc::new(entry))
            .map(|index| index as u64)
            .ok_or_else(|| StoreError::CapacityExhausted(self.name.clone()))
    }
}

impl std::fmt::Debug for ConnectionLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLogStore")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("path", &self.path)
            .field("entries", &self.end_offset())
            .finish()
    }
}

/// Write one record at the end of `file`, which is `len` bytes long.
///
/// On failure the file is cut back to `len`, so a record reported as failed
/// is never picked up by a later ingest.
fn write_record(
    file: &mut File,
    len: u64,
    line: &[u8],
    write: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
) -> io::Result<()> {
    let result = write(file, line);
    if result.is_err() {
        if let Err(err) = file.set_len(len) {
            warn!(len, error = %err, "could not roll back failed append");
        }
    }
    result
}

fn to_index(offset: u64) -> usize {
    usize::try_from(offset).unwrap_or(usize::MAX)
}

pub(crate) fn modified_ms(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
