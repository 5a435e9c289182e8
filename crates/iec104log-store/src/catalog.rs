//! Catalog of connection log stores, keyed by role and file name.
//!
//! [`LogCatalog`] is the context object consumers hold for a session: it owns
//! the open stores and implements the read operations served to log viewers.
//! Stores are opened on first use and stay open for the catalog's lifetime.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use iec104log_frame::FrameType;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{CatalogConfig, LOG_EXTENSION};
use crate::entry::{Direction, Role};
use crate::error::{Result, StoreError};
use crate::stats::{aggregate, Stats};
use crate::store::{modified_ms, ConnectionLogStore};
use crate::tail::{poll, TailCursor};
use crate::view::{format_modified, format_size, FileInfo, LogView};

/// Identifies one store: a role directory plus a bare file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StoreId {
    pub role: Role,
    pub name: String,
}

impl StoreId {
    /// Validate `name` as a bare file name inside the role directory.
    pub fn new(role: Role, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { role, name })
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.role, self.name)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).file_name().map(|n| n.len()) != Some(name.len());
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// One log file as listed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub size: u64,
    pub size_formatted: String,
    pub modified: String,
    pub modified_ms: u64,
    /// Published entries, when the store is already open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<u64>,
}

/// Log files per role, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionList {
    pub client: Vec<ConnectionInfo>,
    pub server: Vec<ConnectionInfo>,
}

impl ConnectionList {
    pub fn for_role(&self, role: Role) -> &[ConnectionInfo] {
        match role {
            Role::Client => &self.client,
            Role::Server => &self.server,
        }
    }

    pub fn len(&self) -> usize {
        self.client.len() + self.server.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Options for [`LogCatalog::get_logs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Return only the last `n` entries; `None` or `0` means the configured
    /// maximum.
    pub tail: Option<usize>,
    /// Keep only frames of this type. Applied after the tail window.
    pub frame_type: Option<FrameType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub file_info: FileInfo,
    pub logs: Vec<LogView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TailResponse {
    pub logs: Vec<LogView>,
    /// New watermark the caller must keep.
    pub position: u64,
    pub timestamp_ms: u64,
    pub count: usize,
}

impl TailResponse {
    pub fn cursor(&self) -> TailCursor {
        TailCursor::new(self.position, self.timestamp_ms)
    }
}

/// Open stores for both role directories.
pub struct LogCatalog {
    config: CatalogConfig,
    stores: RwLock<HashMap<StoreId, Arc<ConnectionLogStore>>>,
}

impl LogCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn dir(&self, role: Role) -> &Path {
        match role {
            Role::Client => &self.config.client_dir,
            Role::Server => &self.config.server_dir,
        }
    }

    pub fn path_of(&self, id: &StoreId) -> PathBuf {
        self.dir(id.role).join(&id.name)
    }

    /// The store for `id`, opening it on first use.
    ///
    /// Fails with [`StoreError::NotFound`] when no regular file backs it.
    pub fn store(&self, id: &StoreId) -> Result<Arc<ConnectionLogStore>> {
        if let Some(store) = self.cached(id)? {
            return Ok(store);
        }

        let path = self.path_of(id);
        match std::fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.file_type().is_file() => {}
            Ok(_) => return Err(StoreError::NotFound(id.clone())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()))
            }
            Err(err) => return Err(StoreError::io(path, err)),
        }
        self.insert(id, path)
    }

    /// The store for `id`, creating its directory and file if missing.
    pub fn open_or_create(&self, id: &StoreId) -> Result<Arc<ConnectionLogStore>> {
        if let Some(store) = self.cached(id)? {
            return Ok(store);
        }
        let dir = self.dir(id.role);
        std::fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;
        self.insert(id, self.path_of(id))
    }

    /// Log files in both role directories, newest first.
    ///
    /// Missing directories are created. Symlinks and non-`.log` entries are
    /// ignored.
    pub fn list_connections(&self) -> Result<ConnectionList> {
        Ok(ConnectionList {
            client: self.scan(Role::Client)?,
            server: self.scan(Role::Server)?,
        })
    }

    /// Decoded entries of one store, newest window first cut, oldest first
    /// returned.
    pub fn get_logs(&self, id: &StoreId, query: &LogQuery) -> Result<LogsResponse> {
        let store = self.store(id)?;
        store.try_ingest()?;

        let window = match query.tail {
            Some(n) if n > 0 => n,
            _ => self.config.max_log_lines,
        };
        let logs = store
            .read_tail(window)
            .iter()
            .filter(|entry| {
                query
                    .frame_type
                    .is_none_or(|wanted| entry.frame().frame_type() == wanted)
            })
            .map(|entry| LogView::from_entry(entry))
            .collect();

        Ok(LogsResponse {
            file_info: store.info()?.into(),
            logs,
        })
    }

    /// Everything appended at or after `cursor.position`.
    pub fn poll_tail(&self, id: &StoreId, cursor: TailCursor) -> Result<TailResponse> {
        let store = self.store(id)?;
        store.try_ingest()?;

        let batch = poll(&store, cursor);
        let logs: Vec<LogView> = batch
            .entries
            .iter()
            .map(|entry| LogView::from_entry(entry))
            .collect();

        Ok(TailResponse {
            count: logs.len(),
            logs,
            position: batch.next_cursor.position,
            timestamp_ms: batch.next_cursor.timestamp_ms,
        })
    }

    /// Counts over every entry currently in the store.
    pub fn get_stats(&self, id: &StoreId) -> Result<Stats> {
        let store = self.store(id)?;
        store.try_ingest()?;
        Ok(aggregate(&store, 0..store.end_offset()))
    }

    /// Append one captured APDU, creating the store if needed.
    pub fn append(
        &self,
        id: &StoreId,
        raw: impl Into<Bytes>,
        direction: Direction,
        timestamp_ms: u64,
    ) -> Result<u64> {
        self.open_or_create(id)?.append(raw, direction, timestamp_ms)
    }

    fn cached(&self, id: &StoreId) -> Result<Option<Arc<ConnectionLogStore>>> {
        let stores = self
            .stores
            .read()
            .map_err(|_| StoreError::Poisoned("catalog".to_string()))?;
        Ok(stores.get(id).cloned())
    }

    /// Load the store without holding the map lock, so lookups of other
    /// stores never wait on a slow open. A store opened concurrently by
    /// another caller wins and this one is dropped.
    fn insert(&self, id: &StoreId, path: PathBuf) -> Result<Arc<ConnectionLogStore>> {
        let opened = Arc::new(ConnectionLogStore::open(path, id.role, self.config.store)?);

        let mut stores = self
            .stores
            .write()
            .map_err(|_| StoreError::Poisoned("catalog".to_string()))?;
        let store = match stores.entry(id.clone()) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                debug!(store = %id, entries = opened.end_offset(), "catalog opened store");
                Arc::clone(slot.insert(opened))
            }
        };
        Ok(store)
    }

    fn scan(&self, role: Role) -> Result<Vec<ConnectionInfo>> {
        let dir = self.dir(role);
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;
            return Ok(Vec::new());
        }

        let open = self
            .stores
            .read()
            .map_err(|_| StoreError::Poisoned("catalog".to_string()))?;

        let mut listed = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|err| StoreError::io(dir, err))? {
            let entry = entry.map_err(|err| StoreError::io(dir, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            let metadata = match std::fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(?path, error = %err, "skipping unreadable log file");
                    continue;
                }
            };
            if !metadata.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let modified_ms = modified_ms(&metadata);
            let entries = open
                .get(&StoreId {
                    role,
                    name: name.clone(),
                })
                .map(|store| store.end_offset());
            listed.push(ConnectionInfo {
                name,
                role,
                size: metadata.len(),
                size_formatted: format_size(metadata.len()),
                modified: format_modified(modified_ms),
                modified_ms,
                entries,
            });
        }

        listed.sort_by(|a, b| {
            b.modified_ms
                .cmp(&a.modified_ms)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(listed)
    }
}

impl fmt::Debug for LogCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCatalog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    const STARTDT_ACT: [u8; 6] = [0x68, 0x04, 0x07, 0x00, 0x00, 0x00];
    const S_FRAME: [u8; 6] = [0x68, 0x04, 0x01, 0x00, 0x02, 0x00];

    fn catalog(dir: &TempDir) -> LogCatalog {
        LogCatalog::new(CatalogConfig::under(dir.path()))
    }

    #[test]
    fn store_names_must_be_bare_file_names() {
        for bad in ["", ".", "..", "../etc/passwd", "a/b.log", "a\\b.log", "nul\0.log"] {
            let err = StoreId::new(Role::Client, bad).unwrap_err();
            assert!(matches!(err, StoreError::InvalidName(_)), "{bad:?}");
        }
        assert!(StoreId::new(Role::Client, "session-1.log").is_ok());
    }

    #[test]
    fn unknown_store_is_not_found() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let id = StoreId::new(Role::Server, "missing.log").unwrap();

        let err = catalog.get_logs(&id, &LogQuery::default()).unwrap_err();
        assert!(err.is_not_found());
        assert!(catalog.poll_tail(&id, TailCursor::default()).unwrap_err().is_not_found());
        assert!(catalog.get_stats(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn list_connections_creates_dirs_and_lists_log_files() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        let empty = catalog.list_connections().unwrap();
        assert!(empty.is_empty());
        assert!(catalog.dir(Role::Client).is_dir());
        assert!(catalog.dir(Role::Server).is_dir());

        let id = StoreId::new(Role::Client, "a.log").unwrap();
        catalog.append(&id, STARTDT_ACT.to_vec(), Direction::Received, 1).unwrap();
        std::fs::write(catalog.dir(Role::Client).join("notes.txt"), "x").unwrap();

        let listed = catalog.list_connections().unwrap();
        assert_eq!(listed.client.len(), 1);
        assert!(listed.server.is_empty());
        let info = &listed.for_role(Role::Client)[0];
        assert_eq!(info.name, "a.log");
        assert_eq!(info.entries, Some(1));
        assert!(info.size > 0);
    }

    #[test]
    fn get_logs_applies_tail_then_filter() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let id = StoreId::new(Role::Server, "mix.log").unwrap();

        for i in 0..6u64 {
            let raw = if i % 2 == 0 { STARTDT_ACT } else { S_FRAME };
            catalog.append(&id, raw.to_vec(), Direction::Sent, 10 + i).unwrap();
        }

        let all = catalog.get_logs(&id, &LogQuery::default()).unwrap();
        assert_eq!(all.logs.len(), 6);
        assert_eq!(all.file_info.name, "mix.log");
        assert_eq!(all.file_info.total_lines, 6);

        let query = LogQuery {
            tail: Some(3),
            frame_type: Some(FrameType::Supervisory),
        };
        let tailed = catalog.get_logs(&id, &query).unwrap();
        let offsets: Vec<u64> = tailed.logs.iter().map(|log| log.offset).collect();
        assert_eq!(offsets, vec![3, 5]);
    }

    #[test]
    fn get_logs_caps_untailed_reads() {
        let dir = TempDir::new().unwrap();
        let mut config = CatalogConfig::under(dir.path());
        config.max_log_lines = 2;
        let catalog = LogCatalog::new(config);
        let id = StoreId::new(Role::Client, "cap.log").unwrap();
        for i in 0..5u64 {
            catalog.append(&id, STARTDT_ACT.to_vec(), Direction::Received, i + 1).unwrap();
        }

        let logs = catalog.get_logs(&id, &LogQuery::default()).unwrap().logs;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].offset, 3);
    }

    #[test]
    fn poll_tail_past_end_reports_current_position() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let id = StoreId::new(Role::Client, "three.log").unwrap();
        for i in 0..3u64 {
            catalog.append(&id, STARTDT_ACT.to_vec(), Direction::Received, i + 1).unwrap();
        }

        let response = catalog.poll_tail(&id, TailCursor::new(5, 0)).unwrap();
        assert!(response.logs.is_empty());
        assert_eq!(response.count, 0);
        assert_eq!(response.position, 3);
    }

    #[test]
    fn reads_pick_up_lines_written_by_capture_process() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let id = StoreId::new(Role::Server, "live.log").unwrap();
        catalog.append(&id, STARTDT_ACT.to_vec(), Direction::Received, 1).unwrap();

        let first = catalog.poll_tail(&id, TailCursor::default()).unwrap();
        assert_eq!(first.count, 1);

        let mut external = OpenOptions::new()
            .append(true)
            .open(catalog.path_of(&id))
            .unwrap();
        writeln!(
            external,
            r#"{{"time_ms":2,"dir":"ser -> cli","len":6,"data":"68 04 0B 00 00 00"}}"#
        )
        .unwrap();

        let second = catalog.poll_tail(&id, first.cursor()).unwrap();
        assert_eq!(second.count, 1);
        assert_eq!(second.logs[0].direction, "TX");
        assert_eq!(second.position, 2);
        assert_eq!(second.timestamp_ms, 2);
    }

    #[test]
    fn get_stats_covers_whole_store() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let id = StoreId::new(Role::Client, "stats.log").unwrap();
        catalog.append(&id, STARTDT_ACT.to_vec(), Direction::Received, 1).unwrap();
        catalog.append(&id, S_FRAME.to_vec(), Direction::Sent, 2).unwrap();

        let stats = catalog.get_stats(&id).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_frame_type["U"], 1);
        assert_eq!(stats.by_frame_type["S"], 1);
    }

    #[cfg(unix)]
    #[test]
    fn stalled_open_does_not_block_other_stores() {
        use std::sync::mpsc;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(catalog(&dir));
        let ready = StoreId::new(Role::Client, "ready.log").unwrap();
        catalog.append(&ready, STARTDT_ACT.to_vec(), Direction::Received, 1).unwrap();

        // Opening a FIFO for writing blocks until a reader shows up.
        std::fs::create_dir_all(catalog.dir(Role::Server)).unwrap();
        let fifo = catalog.dir(Role::Server).join("stalled.log");
        let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
        assert!(status.success());

        let stalled = StoreId::new(Role::Server, "stalled.log").unwrap();
        let opener = {
            let catalog = Arc::clone(&catalog);
            std::thread::spawn(move || catalog.append(&stalled, S_FRAME.to_vec(), Direction::Sent, 2))
        };
        std::thread::sleep(Duration::from_millis(100));

        let (tx, rx) = mpsc::channel();
        {
            let catalog = Arc::clone(&catalog);
            let ready = ready.clone();
            std::thread::spawn(move || {
                let _ = tx.send(catalog.poll_tail(&ready, TailCursor::default()));
            });
        }
        let polled = rx.recv_timeout(Duration::from_secs(5));

        // Release the stalled open before asserting anything.
        let _reader = std::fs::File::open(&fifo).unwrap();
        assert_eq!(opener.join().unwrap().unwrap(), 0);

        let response = polled
            .expect("poll on an open store should not wait for another store")
            .unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.position, 1);
    }
}
