//! IEC 60870-5-104 capture log decoding and tail serving.
//!
//! iec104log turns raw APDU captures into typed frames and serves them from
//! append-only per-connection logs: range reads, position-based tail polling
//! and frame statistics.
//!
//! # Crate Structure
//!
//! - [`frame`]: Pure APDU decoder and label tables
//! - [`store`]: Connection log stores, tail cursors, stats and the catalog
//!
//! # Example
//!
//! ```no_run
//! use iec104log::store::{CatalogConfig, Direction, LogCatalog, Role, StoreId, TailCursor};
//!
//! let catalog = LogCatalog::new(CatalogConfig::under("/var/log/iec104"));
//! let id = StoreId::new(Role::Server, "rtu-7.log")?;
//! catalog.append(&id, vec![0x68, 0x04, 0x07, 0x00, 0x00, 0x00], Direction::Received, 0)?;
//!
//! let batch = catalog.poll_tail(&id, TailCursor::default())?;
//! println!("{} new, resume at {}", batch.count, batch.position);
//! # Ok::<(), iec104log::store::StoreError>(())
//! ```

/// Re-export frame decoder types.
pub mod frame {
    pub use iec104log_frame::*;
}

/// Re-export log store types.
pub mod store {
    pub use iec104log_store::*;

    /// Cancellation handle for [`spawn_follower`] (requires `async` feature).
    #[cfg(feature = "async")]
    pub use tokio_util::sync::CancellationToken;
}
