use std::time::{SystemTime, UNIX_EPOCH};

use iec104log_frame::parse_hex;
use serde::Serialize;

use crate::cmd::{AppendArgs, Context};
use crate::exit::{hex_error, store_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct AppendOutput {
    store: String,
    offset: u64,
    timestamp_ms: u64,
    direction: &'static str,
    length: usize,
}

pub fn run(args: AppendArgs, ctx: &Context) -> CliResult<i32> {
    let id = args.store.store_id()?;
    let raw = parse_hex(&args.data).map_err(|err| hex_error("invalid --data", err))?;
    let length = raw.len();
    let timestamp_ms = args.time_ms.unwrap_or_else(now_ms);

    let offset = ctx
        .catalog()
        .append(&id, raw, args.direction, timestamp_ms)
        .map_err(|err| store_error("append failed", err))?;

    match ctx.format {
        OutputFormat::Json => print_json(&AppendOutput {
            store: id.to_string(),
            offset,
            timestamp_ms,
            direction: args.direction.code(),
            length,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("appended {id} #{offset} ({} {length} bytes)", args.direction)
        }
        OutputFormat::Raw => println!("{offset}"),
    }

    Ok(SUCCESS)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
