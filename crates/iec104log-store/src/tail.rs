//! Position-based tail cursor.
//!
//! A consumer holds a [`TailCursor`] and repeatedly asks for everything at or
//! after its position. The position is authoritative; the timestamp only
//! travels with the cursor for the consumer's benefit and never selects
//! entries, so captures sharing a timestamp or a clock stepping backwards
//! cannot cause entries to be skipped.

use std::sync::Arc;

use iec104log_frame::FrameType;
use serde::{Deserialize, Serialize};

use crate::catalog::{LogCatalog, StoreId};
use crate::entry::LogEntry;
use crate::error::Result;
use crate::store::ConnectionLogStore;

/// A consumer's watermark into one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailCursor {
    /// Next offset the consumer has not seen.
    pub position: u64,
    /// Timestamp of the last entry the consumer saw. Advisory.
    pub timestamp_ms: u64,
}

impl TailCursor {
    pub fn new(position: u64, timestamp_ms: u64) -> Self {
        Self {
            position,
            timestamp_ms,
        }
    }

    /// A cursor positioned at the current end of `store`.
    pub fn at_end(store: &ConnectionLogStore) -> Self {
        let end = store.end_offset();
        let timestamp_ms = end
            .checked_sub(1)
            .and_then(|last| store.get(last))
            .map_or(0, |entry| entry.timestamp_ms());
        Self::new(end, timestamp_ms)
    }
}

/// Result of one poll.
#[derive(Debug, Clone)]
pub struct TailBatch {
    /// Entries in `[cursor.position, end)` in ascending offset order.
    pub entries: Vec<Arc<LogEntry>>,
    /// Where the consumer should resume.
    pub next_cursor: TailCursor,
}

impl TailBatch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Return every entry at or after `cursor.position` that is published now.
///
/// Never blocks and never fails: a position past the end yields an empty
/// batch whose cursor points at the current end.
pub fn poll(store: &ConnectionLogStore, cursor: TailCursor) -> TailBatch {
    let end = store.end_offset();
    let entries: Vec<Arc<LogEntry>> = if cursor.position < end {
        store.iter_range(cursor.position, end).cloned().collect()
    } else {
        Vec::new()
    };

    let timestamp_ms = entries
        .last()
        .map_or(cursor.timestamp_ms, |entry| entry.timestamp_ms());

    TailBatch {
        entries,
        next_cursor: TailCursor::new(end, timestamp_ms),
    }
}

/// Tail state owned by one consumer: which store, where it is, and which
/// frames it wants to see.
#[derive(Debug, Clone)]
pub struct TailSession {
    store: StoreId,
    cursor: TailCursor,
    filter: Option<FrameType>,
}

impl TailSession {
    pub fn new(store: StoreId, cursor: TailCursor) -> Self {
        Self {
            store,
            cursor,
            filter: None,
        }
    }

    /// Only deliver frames of `frame_type`. The cursor still advances past
    /// entries that are filtered out.
    pub fn with_filter(mut self, frame_type: Option<FrameType>) -> Self {
        self.filter = frame_type;
        self
    }

    pub fn store(&self) -> &StoreId {
        &self.store
    }

    pub fn cursor(&self) -> TailCursor {
        self.cursor
    }

    /// Poll the catalog once and advance this session's cursor.
    pub fn poll_once(&mut self, catalog: &LogCatalog) -> Result<Vec<Arc<LogEntry>>> {
        let store = catalog.store(&self.store)?;
        store.try_ingest()?;
        let batch = poll(&store, self.cursor);
        self.cursor = batch.next_cursor;

        let mut entries = batch.entries;
        if let Some(wanted) = self.filter {
            entries.retain(|entry| entry.frame().frame_type() == wanted);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::{CatalogConfig, StoreConfig};
    use crate::entry::{Direction, Role};

    const STARTDT_ACT: [u8; 6] = [0x68, 0x04, 0x07, 0x00, 0x00, 0x00];
    const S_FRAME: [u8; 6] = [0x68, 0x04, 0x01, 0x00, 0x02, 0x00];

    fn store_with(dir: &TempDir, count: u64) -> ConnectionLogStore {
        let store = ConnectionLogStore::open(
            dir.path().join("tail.log"),
            Role::Client,
            StoreConfig::default(),
        )
        .unwrap();
        for i in 0..count {
            store.append(STARTDT_ACT.to_vec(), Direction::Received, 100 + i).unwrap();
        }
        store
    }

    #[test]
    fn poll_from_zero_returns_everything() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 7);

        let batch = poll(&store, TailCursor::default());
        assert_eq!(batch.entries.len(), 7);
        assert_eq!(batch.next_cursor.position, 7);
        assert_eq!(batch.next_cursor.timestamp_ms, 106);
    }

    #[test]
    fn repeated_poll_without_appends_is_empty_and_stable() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 4);

        let first = poll(&store, TailCursor::default());
        let second = poll(&store, first.next_cursor);
        let third = poll(&store, first.next_cursor);

        assert!(second.is_empty());
        assert!(third.is_empty());
        assert_eq!(second.next_cursor, first.next_cursor);
        assert_eq!(third.next_cursor, first.next_cursor);
    }

    #[test]
    fn future_position_returns_current_end() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 3);

        let batch = poll(&store, TailCursor::new(5, 0));
        assert!(batch.is_empty());
        assert_eq!(batch.next_cursor.position, 3);
    }

    #[test]
    fn timestamp_never_selects_entries() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 0);
        store.append(STARTDT_ACT.to_vec(), Direction::Received, 500).unwrap();
        store.append(STARTDT_ACT.to_vec(), Direction::Received, 500).unwrap();
        // Clock stepped backwards.
        store.append(STARTDT_ACT.to_vec(), Direction::Received, 10).unwrap();

        let batch = poll(&store, TailCursor::new(1, u64::MAX));
        let offsets: Vec<u64> = batch.entries.iter().map(|e| e.sequence_offset()).collect();
        assert_eq!(offsets, vec![1, 2]);
        assert_eq!(batch.next_cursor.timestamp_ms, 10);
    }

    #[test]
    fn stale_cursor_redelivers_without_skipping() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 5);

        let batch = poll(&store, TailCursor::new(2, 0));
        let offsets: Vec<u64> = batch.entries.iter().map(|e| e.sequence_offset()).collect();
        assert_eq!(offsets, vec![2, 3, 4]);
    }

    #[test]
    fn at_end_skips_history() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 3);

        let cursor = TailCursor::at_end(&store);
        assert_eq!(cursor, TailCursor::new(3, 102));
        store.append(STARTDT_ACT.to_vec(), Direction::Sent, 200).unwrap();
        assert_eq!(poll(&store, cursor).entries.len(), 1);
    }

    #[test]
    fn session_filters_but_still_advances() {
        let dir = TempDir::new().unwrap();
        let catalog = LogCatalog::new(CatalogConfig::under(dir.path()));
        let id = StoreId::new(Role::Server, "session.log").unwrap();

        catalog.append(&id, STARTDT_ACT.to_vec(), Direction::Received, 1).unwrap();
        catalog.append(&id, S_FRAME.to_vec(), Direction::Sent, 2).unwrap();
        catalog.append(&id, STARTDT_ACT.to_vec(), Direction::Received, 3).unwrap();

        let mut session =
            TailSession::new(id, TailCursor::default()).with_filter(Some(FrameType::Supervisory));
        let delivered = session.poll_once(&catalog).unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].sequence_offset(), 1);
        assert_eq!(session.cursor().position, 3);

        assert!(session.poll_once(&catalog).unwrap().is_empty());
    }
}
