use std::path::PathBuf;

use iec104log_frame::{AsduProfile, MAX_FRAME_SIZE};

/// Default cap on entries returned by an untailed log read.
pub const DEFAULT_MAX_LOG_LINES: usize = 10_000;

/// Log files above this size are served, with a warning.
pub const DEFAULT_LARGE_FILE_WARN: u64 = 50 * 1024 * 1024;

/// File extension of capture logs.
pub const LOG_EXTENSION: &str = "log";

/// Per-store behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// ASDU field widths used when decoding entries.
    pub profile: AsduProfile,
    /// Largest raw entry accepted by `append`.
    pub max_entry_size: usize,
    /// `fsync` the file after every append.
    pub sync_on_append: bool,
    /// Size above which opening a store logs a warning.
    pub large_file_warn: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            profile: AsduProfile::default(),
            max_entry_size: MAX_FRAME_SIZE,
            sync_on_append: false,
            large_file_warn: DEFAULT_LARGE_FILE_WARN,
        }
    }
}

/// Catalog-wide configuration: where each role's logs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub client_dir: PathBuf,
    pub server_dir: PathBuf,
    /// Entries returned by `get_logs` when no tail count is given.
    pub max_log_lines: usize,
    pub store: StoreConfig,
}

impl CatalogConfig {
    /// Config with `client_logs/` and `server_logs/` under `base`.
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            client_dir: base.join("client_logs"),
            server_dir: base.join("server_logs"),
            ..Self::default()
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_dir: PathBuf::from("client_logs"),
            server_dir: PathBuf::from("server_logs"),
            max_log_lines: DEFAULT_MAX_LOG_LINES,
            store: StoreConfig::default(),
        }
    }
}
