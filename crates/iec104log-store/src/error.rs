use std::path::PathBuf;

use crate::catalog::StoreId;

/// Errors that can occur in log store operations.
///
/// Undecodable frames are not errors; they are served as
/// [`Frame::Malformed`](iec104log_frame::Frame::Malformed) data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No log file exists for the requested store.
    #[error("log store not found: {0}")]
    NotFound(StoreId),

    /// The store name is not a bare file name.
    #[error("invalid store name {0:?}")]
    InvalidName(String),

    /// A captured APDU exceeds the largest legal frame size.
    #[error("entry too large ({size} bytes, max {max})")]
    EntryTooLarge { size: usize, max: usize },

    /// An I/O error on the backing file.
    #[error("log store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The store holds as many entries as its slot array can address.
    #[error("log store {0} is full")]
    CapacityExhausted(String),

    /// A previous writer panicked while holding the store's writer lock.
    #[error("log store {0} writer lock poisoned")]
    Poisoned(String),

    /// A record could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for lookup failures callers should surface as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
