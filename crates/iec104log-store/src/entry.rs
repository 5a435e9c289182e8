use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use bytes::Bytes;
use iec104log_frame::{decode_with, AsduProfile, Frame};
use serde::Serialize;

/// Direction of a captured APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Direction {
    /// Server to client (`TX`).
    #[serde(rename = "TX")]
    Sent,
    /// Client to server (`RX`).
    #[serde(rename = "RX")]
    Received,
}

impl Direction {
    /// `TX` or `RX`.
    pub fn code(self) -> &'static str {
        match self {
            Self::Sent => "TX",
            Self::Received => "RX",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Sent => "server → client",
            Self::Received => "client → server",
        }
    }

    /// Spelling used in the `dir` field of persisted records.
    pub fn record_tag(self) -> &'static str {
        match self {
            Self::Sent => "ser -> cli",
            Self::Received => "cli -> ser",
        }
    }

    /// Interpret a capture `dir` field.
    ///
    /// Capture tools spell this field loosely: `ser -> cli`, `server...`,
    /// `cli -> ser`, `client...`. Anything else is unrecognized.
    pub fn from_record_tag(tag: &str) -> Option<Self> {
        let lower = tag.to_ascii_lowercase();
        if tag.contains("ser -> cli") || lower.contains("server") {
            Some(Self::Sent)
        } else if tag.contains("cli -> ser") || lower.contains("client") {
            Some(Self::Received)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tx" | "sent" | "send" => Ok(Self::Sent),
            "rx" | "received" | "recv" => Ok(Self::Received),
            other => {
                Self::from_record_tag(other).ok_or_else(|| format!("unknown direction: {s}"))
            }
        }
    }
}

/// Which side of the session a log file was captured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Client, Role::Server];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            _ => Err(format!("unknown role: {s} (expected client or server)")),
        }
    }
}

/// One captured APDU, immutable once published.
///
/// The decoded [`Frame`] is computed on first access and cached; decoding
/// is pure, so concurrent first accesses agree on the result.
#[derive(Debug)]
pub struct LogEntry {
    sequence_offset: u64,
    timestamp_ms: u64,
    direction: Direction,
    raw: Bytes,
    profile: AsduProfile,
    frame: OnceLock<Frame>,
}

impl LogEntry {
    pub fn new(
        sequence_offset: u64,
        timestamp_ms: u64,
        direction: Direction,
        raw: Bytes,
        profile: AsduProfile,
    ) -> Self {
        Self {
            sequence_offset,
            timestamp_ms,
            direction,
            raw,
            profile,
            frame: OnceLock::new(),
        }
    }

    /// Position of this entry within its store (0-based, gap-free).
    pub fn sequence_offset(&self) -> u64 {
        self.sequence_offset
    }

    /// Capture time in milliseconds since the epoch. Advisory only:
    /// capture clocks may move backwards.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Decoded view of the raw octets.
    pub fn frame(&self) -> &Frame {
        self.frame
            .get_or_init(|| decode_with(&self.raw, &self.profile))
    }
}
