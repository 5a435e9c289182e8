use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use iec104log_store::{FrameView, LogView};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Print decoded entries in `format`. JSON emits one object per line so a
/// follower's output can be consumed incrementally.
pub fn print_logs(logs: &[LogView], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for log in logs {
                print_json(log);
            }
        }
        OutputFormat::Table => {
            if logs.is_empty() {
                return;
            }
            let mut table = table(vec!["OFFSET", "TIME", "DIR", "TYPE", "DETAIL", "DATA"]);
            for log in logs {
                table.add_row(vec![
                    log.offset.to_string(),
                    log.timestamp.clone(),
                    log.direction.to_string(),
                    log.frame_info.frame_type.to_string(),
                    frame_summary(&log.frame_info),
                    log.data.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for log in logs {
                println!(
                    "#{:<6} {} {} {:<9} {}",
                    log.offset,
                    log.timestamp,
                    log.direction,
                    log.frame_info.frame_type,
                    frame_summary(&log.frame_info)
                );
            }
        }
        OutputFormat::Raw => {
            for log in logs {
                println!("{}", log.data);
            }
        }
    }
}

/// One-line description of a decoded frame.
pub fn frame_summary(frame: &FrameView) -> String {
    let mut parts = Vec::new();
    if let Some(send_seq) = frame.send_seq {
        parts.push(format!("N(S)={send_seq}"));
    }
    if let Some(recv_seq) = frame.recv_seq {
        parts.push(format!("N(R)={recv_seq}"));
    }
    if let Some(type_id) = &frame.type_id_desc {
        parts.push(type_id.clone());
    }
    if let Some(cause) = &frame.cause_desc {
        parts.push(format!("COT={cause}"));
    }
    if let Some(addr) = frame.asdu_addr {
        parts.push(format!("CA={addr}"));
    }
    if let Some(ioa) = frame.ioa {
        parts.push(format!("IOA={ioa}"));
    }
    if let Some(value) = &frame.value {
        let rendered = serde_json::to_string(value).unwrap_or_default();
        parts.push(format!("value={rendered}"));
    }
    if let Some(function) = frame.function {
        parts.push(function.to_string());
    } else if let Some(description) = &frame.description {
        parts.push(description.clone());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use iec104log_frame::decode;

    use super::*;

    #[test]
    fn summary_of_u_frame_is_function_name() {
        let view = FrameView::from_frame(&decode(&[0x68, 0x04, 0x83, 0x00, 0x00, 0x00]));
        assert_eq!(frame_summary(&view), "TESTFR_CON");
    }

    #[test]
    fn summary_of_i_frame_lists_sequence_and_asdu() {
        let view = FrameView::from_frame(&decode(&[
            0x68, 0x0E, 0x00, 0x00, 0x02, 0x00, 0x64, 0x01, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00,
            0x00, 0x14,
        ]));
        let summary = frame_summary(&view);
        assert!(summary.starts_with("N(S)=0 N(R)=1 C_IC_NA_1"));
        assert!(summary.contains("COT=activation"));
        assert!(summary.ends_with("value=20"));
    }

    #[test]
    fn summary_of_malformed_frame_is_reason() {
        let view = FrameView::from_frame(&decode(&[0x68]));
        assert!(frame_summary(&view).starts_with("truncated control field"));
    }
}
