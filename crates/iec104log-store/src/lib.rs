//! Append-only capture log stores for IEC-104 sessions.
//!
//! One [`ConnectionLogStore`] per captured connection, backed by a JSON-lines
//! file the capture process appends to. Each line holds one APDU:
//!
//! ```text
//! {"time_ms":1718000000123,"dir":"cli -> ser","len":6,"data":"68 04 07 00 00 00"}
//! ```
//!
//! On top of the stores:
//! - [`tail`]: position-based "what's new since X" polling
//! - [`stats`]: exact frame counts over a range
//! - [`catalog`]: the session context serving listings, logs, tails and stats
//! - [`view`]: flat JSON renderings for log viewers
//!
//! One writer per store, any number of lock-free readers. Readers see every
//! entry published before their read began and never a partial entry.

pub mod catalog;
pub mod config;
pub mod entry;
pub mod error;
#[cfg(feature = "async")]
pub mod follow;
pub mod record;
mod slots;
pub mod stats;
pub mod store;
pub mod tail;
pub mod view;

pub use catalog::{
    ConnectionInfo, ConnectionList, LogCatalog, LogQuery, LogsResponse, StoreId, TailResponse,
};
pub use config::{CatalogConfig, StoreConfig, DEFAULT_MAX_LOG_LINES};
pub use entry::{Direction, LogEntry, Role};
pub use error::{Result, StoreError};
#[cfg(feature = "async")]
pub use follow::{spawn_follower, Follower};
pub use record::{encode_line, parse_line, Captured, RecordError};
pub use stats::{aggregate, Stats, StatsAggregator};
pub use store::{ConnectionLogStore, StoreInfo};
pub use tail::{poll, TailBatch, TailCursor, TailSession};
pub use view::{format_timestamp, FileInfo, FrameView, LogView};
