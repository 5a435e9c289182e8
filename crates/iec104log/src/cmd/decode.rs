use iec104log_frame::{decode_with, parse_hex};
use iec104log_store::FrameView;

use crate::cmd::{Context, DecodeArgs};
use crate::exit::{hex_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{frame_summary, print_json, table, OutputFormat};

pub fn run(args: DecodeArgs, ctx: &Context) -> CliResult<i32> {
    let raw = parse_hex(&args.hex.join(" ")).map_err(|err| hex_error("invalid hex", err))?;
    let frame = decode_with(&raw, &ctx.config.store.profile);
    let view = FrameView::from_frame(&frame);

    match ctx.format {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Table => {
            let mut table = table(vec!["FIELD", "VALUE"]);
            let json = serde_json::to_value(&view).unwrap_or_default();
            if let Some(fields) = json.as_object() {
                for (key, value) in fields {
                    let rendered = match value {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    };
                    table.add_row(vec![key.clone(), rendered]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} {}", view.frame_type, frame_summary(&view));
        }
        OutputFormat::Raw => println!("{}", view.frame_type),
    }

    // Malformed input still prints its reason, but is reported as invalid data.
    if frame.is_malformed() {
        Ok(DATA_INVALID)
    } else {
        Ok(SUCCESS)
    }
}
