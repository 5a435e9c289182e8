//! Flat JSON renderings of entries and files for log viewers.

use chrono::{DateTime, Utc};
use iec104log_frame::{to_hex, Frame, InformationObject, Quality, Scalar};
use serde::Serialize;

use crate::entry::{LogEntry, Role};
use crate::store::StoreInfo;

/// Rendered in place of a timestamp when the capture carried none.
pub const MISSING_TIMESTAMP: &str = "N/A";

/// One decoded entry as served to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub offset: u64,
    /// UTC, `YYYY-MM-DD HH:MM:SS.mmm`.
    pub timestamp: String,
    pub timestamp_ms: u64,
    pub direction: &'static str,
    pub direction_desc: &'static str,
    pub length: usize,
    /// Raw octets as space-separated upper-case hex.
    pub data: String,
    pub frame_info: FrameView,
}

impl LogView {
    pub fn from_entry(entry: &LogEntry) -> Self {
        Self {
            offset: entry.sequence_offset(),
            timestamp: format_timestamp(entry.timestamp_ms()),
            timestamp_ms: entry.timestamp_ms(),
            direction: entry.direction().code(),
            direction_desc: entry.direction().description(),
            length: entry.raw().len(),
            data: to_hex(entry.raw()),
            frame_info: FrameView::from_frame(entry.frame()),
        }
    }
}

/// A [`Frame`] broken into named fields; fields that do not apply to the
/// variant are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameView {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub type_desc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apdu_len: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctrl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_seq: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recv_seq: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sq: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_obj: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asdu_addr: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ioa: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<InformationObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FrameView {
    pub fn from_frame(frame: &Frame) -> Self {
        let frame_type = frame.frame_type();
        let mut view = Self {
            frame_type: frame_type.as_str(),
            type_desc: frame_type.description(),
            ..Self::default()
        };

        if let Some(apci) = frame.apci() {
            view.apdu_len = Some(apci.length);
            view.ctrl = Some(apci.control_hex());
        }

        match frame {
            Frame::IFormat {
                send_seq,
                recv_seq,
                asdu,
                ..
            } => {
                view.send_seq = Some(*send_seq);
                view.recv_seq = Some(*recv_seq);
                match asdu {
                    Some(asdu) => {
                        view.type_id = Some(asdu.type_id.hex());
                        view.type_id_desc = Some(asdu.type_id.label());
                        view.cause = Some(asdu.cause.code);
                        view.cause_desc = Some(asdu.cause.label());
                        view.test = Some(asdu.cause.test);
                        view.pn = Some(asdu.cause.negative);
                        view.sq = Some(asdu.structure.sequence);
                        view.num_obj = Some(asdu.structure.count);
                        view.asdu_addr = Some(asdu.common_address);
                        view.truncated = asdu.truncated.then_some(true);
                        if let Some(first) = asdu.objects.first() {
                            view.ioa = Some(first.ioa);
                            view.value = first.value.scalar();
                            view.quality = first.value.quality();
                        }
                        view.objects = asdu.objects.clone();
                    }
                    None => {
                        view.truncated = Some(true);
                        view.description = Some("incomplete ASDU header".to_string());
                    }
                }
            }
            Frame::SFormat { recv_seq, .. } => {
                view.recv_seq = Some(*recv_seq);
            }
            Frame::UFormat { function, .. } => {
                view.function = Some(function.as_str());
                view.description = Some(function.description().to_string());
            }
            Frame::Malformed { reason, .. } => {
                view.description = Some(reason.to_string());
            }
        }

        view
    }
}

/// File metadata returned alongside a log listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub role: Role,
    /// Entries in the store.
    pub total_lines: u64,
    pub file_size: u64,
    pub file_size_formatted: String,
    /// UTC, `YYYY-MM-DD HH:MM:SS`.
    pub modified: String,
    pub modified_ms: u64,
}

impl From<StoreInfo> for FileInfo {
    fn from(info: StoreInfo) -> Self {
        Self {
            name: info.name,
            role: info.role,
            total_lines: info.entries,
            file_size: info.size,
            file_size_formatted: format_size(info.size),
            modified: format_modified(info.modified_ms),
            modified_ms: info.modified_ms,
        }
    }
}

/// Render a capture timestamp; `0` means the capture carried none.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    if timestamp_ms == 0 {
        return MISSING_TIMESTAMP.to_string();
    }
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || MISSING_TIMESTAMP.to_string(),
            |time| time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        )
}

pub(crate) fn format_modified(modified_ms: u64) -> String {
    i64::try_from(modified_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || MISSING_TIMESTAMP.to_string(),
            |time| time.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

/// Human-readable byte count, e.g. `1.50 KB`.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} TB")
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use iec104log_frame::AsduProfile;

    use super::*;
    use crate::entry::Direction;

    fn view_of(raw: &'static [u8], timestamp_ms: u64) -> serde_json::Value {
        let entry = LogEntry::new(
            3,
            timestamp_ms,
            Direction::Received,
            Bytes::from_static(raw),
            AsduProfile::default(),
        );
        serde_json::to_value(LogView::from_entry(&entry)).unwrap()
    }

    #[test]
    fn timestamps_render_in_utc_with_millis() {
        assert_eq!(format_timestamp(0), "N/A");
        assert_eq!(format_timestamp(1_718_000_000_123), "2024-06-10 06:13:20.123");
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn u_frame_view_names_function() {
        let json = view_of(&[0x68, 0x04, 0x07, 0x00, 0x00, 0x00], 1_718_000_000_123);

        assert_eq!(json["offset"], 3);
        assert_eq!(json["direction"], "RX");
        assert_eq!(json["length"], 6);
        assert_eq!(json["data"], "68 04 07 00 00 00");
        assert_eq!(json["frame_info"]["type"], "U");
        assert_eq!(json["frame_info"]["function"], "STARTDT_ACT");
        assert_eq!(json["frame_info"]["ctrl"], "07 00 00 00");
        assert!(json["frame_info"].get("send_seq").is_none());
    }

    #[test]
    fn i_frame_view_flattens_asdu() {
        let json = view_of(
            &[
                0x68, 0x0E, 0x02, 0x00, 0x04, 0x00, 0x64, 0x01, 0x06, 0x00, 0x01, 0x00, 0x00,
                0x00, 0x00, 0x14,
            ],
            0,
        );
        let info = &json["frame_info"];

        assert_eq!(json["timestamp"], "N/A");
        assert_eq!(info["type"], "I");
        assert_eq!(info["send_seq"], 1);
        assert_eq!(info["recv_seq"], 2);
        assert_eq!(info["type_id"], "0x64");
        assert_eq!(info["cause"], 6);
        assert_eq!(info["cause_desc"], "activation");
        assert_eq!(info["asdu_addr"], 1);
        assert_eq!(info["ioa"], 0);
        assert_eq!(info["value"], 20);
        assert_eq!(info["test"], false);
        assert_eq!(info["pn"], false);
    }

    #[test]
    fn malformed_view_carries_reason() {
        let json = view_of(&[0x10, 0x04, 0x07, 0x00, 0x00, 0x00], 5);
        assert_eq!(json["frame_info"]["type"], "MALFORMED");
        assert!(json["frame_info"]["description"]
            .as_str()
            .unwrap()
            .contains("start byte"));
    }
}
