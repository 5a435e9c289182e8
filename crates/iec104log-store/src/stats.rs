use std::collections::BTreeMap;
use std::ops::Range;

use iec104log_frame::Frame;
use serde::Serialize;

use crate::entry::LogEntry;
use crate::store::ConnectionLogStore;

/// Exact frame counts over a range of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: u64,
    /// Keyed by `TX` / `RX`.
    pub by_direction: BTreeMap<String, u64>,
    /// Keyed by `I` / `S` / `U` / `MALFORMED`.
    pub by_frame_type: BTreeMap<String, u64>,
    /// Type identification labels, I-frames only.
    pub by_type_id: BTreeMap<String, u64>,
    /// Cause of transmission labels, I-frames only.
    pub by_cause: BTreeMap<String, u64>,
}

/// Streaming form of [`aggregate`].
#[derive(Debug, Default)]
pub struct StatsAggregator {
    stats: Stats,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, entry: &LogEntry) {
        let stats = &mut self.stats;
        stats.total += 1;
        bump(&mut stats.by_direction, entry.direction().code());

        let frame = entry.frame();
        bump(&mut stats.by_frame_type, frame.frame_type().as_str());

        if let Frame::IFormat {
            asdu: Some(asdu), ..
        } = frame
        {
            bump(&mut stats.by_type_id, &asdu.type_id.label());
            bump(&mut stats.by_cause, &asdu.cause.label());
        }
    }

    pub fn finish(self) -> Stats {
        self.stats
    }
}

/// Count every entry with an offset in `range`, clamped to the current end.
pub fn aggregate(store: &ConnectionLogStore, range: Range<u64>) -> Stats {
    let mut aggregator = StatsAggregator::new();
    for entry in store.iter_range(range.start, range.end) {
        aggregator.observe(entry);
    }
    aggregator.finish()
}

fn bump(map: &mut BTreeMap<String, u64>, key: &str) {
    match map.get_mut(key) {
        Some(count) => *count += 1,
        None => {
            map.insert(key.to_string(), 1);
        }
    }
}
