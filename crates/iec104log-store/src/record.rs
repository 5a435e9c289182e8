//! JSON-lines record format written by the capture process.
//!
//! ```text
//! {"time_ms":1718000000123,"dir":"cli -> ser","len":6,"data":"68 04 07 00 00 00"}
//! ```

use bytes::Bytes;
use iec104log_frame::{parse_hex, to_hex, HexError};
use serde::{Deserialize, Serialize};

use crate::entry::Direction;

#[derive(Debug, Serialize, Deserialize)]
struct CaptureRecord {
    #[serde(default)]
    time_ms: u64,
    #[serde(default)]
    dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    len: Option<usize>,
    #[serde(default)]
    data: String,
}

/// A record line parsed into its typed parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub timestamp_ms: u64,
    pub direction: Direction,
    pub raw: Bytes,
}

/// Why a record line was rejected.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid record json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized direction {0:?}")]
    Direction(String),

    #[error("invalid data field: {0}")]
    Hex(#[from] HexError),
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Captured>, RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let record: CaptureRecord = serde_json::from_str(line)?;
    let direction =
        Direction::from_record_tag(&record.dir).ok_or(RecordError::Direction(record.dir))?;
    let raw = parse_hex(&record.data)?;

    Ok(Some(Captured {
        timestamp_ms: record.time_ms,
        direction,
        raw,
    }))
}

/// Render one record line, without the trailing newline.
pub fn encode_line(
    timestamp_ms: u64,
    direction: Direction,
    raw: &[u8],
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&CaptureRecord {
        time_ms: timestamp_ms,
        dir: direction.record_tag().to_string(),
        len: Some(raw.len()),
        data: to_hex(raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capture_line() {
        let line =
            r#"{"time_ms":1718000000123,"dir":"cli -> ser","len":6,"data":"68 04 07 00 00 00"}"#;
        let captured = parse_line(line).unwrap().unwrap();

        assert_eq!(captured.timestamp_ms, 1_718_000_000_123);
        assert_eq!(captured.direction, Direction::Received);
        assert_eq!(captured.raw.as_ref(), &[0x68, 0x04, 0x07, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn encode_then_parse_preserves_fields() {
        let line = encode_line(42, Direction::Sent, &[0x68, 0x04, 0x0B, 0x00, 0x00, 0x00]).unwrap();
        assert!(line.contains(r#""dir":"ser -> cli""#));
        assert!(line.contains(r#""data":"68 04 0B 00 00 00""#));

        let captured = parse_line(&line).unwrap().unwrap();
        assert_eq!(captured.timestamp_ms, 42);
        assert_eq!(captured.direction, Direction::Sent);
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(matches!(parse_line("{not json"), Err(RecordError::Json(_))));
        assert!(matches!(
            parse_line(r#"{"time_ms":1,"dir":"?","data":"68"}"#),
            Err(RecordError::Direction(_))
        ));
        assert!(matches!(
            parse_line(r#"{"time_ms":1,"dir":"cli -> ser","data":"6g"}"#),
            Err(RecordError::Hex(_))
        ));
    }
}
