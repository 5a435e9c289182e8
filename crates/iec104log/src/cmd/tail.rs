use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use iec104log_store::{LogCatalog, LogView, StoreId, TailCursor, TailResponse};
use serde::Serialize;
use tracing::debug;

use crate::cmd::{parse_duration, Context, TailArgs};
use crate::exit::{store_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_json, print_logs, OutputFormat};

#[derive(Serialize)]
struct PollOutput<'a> {
    logs: &'a [LogView],
    position: u64,
    timestamp_ms: u64,
    count: usize,
}

pub fn run(args: TailArgs, ctx: &Context) -> CliResult<i32> {
    let id = args.store.store_id()?;
    let catalog = ctx.catalog();

    if !args.follow {
        let cursor = TailCursor::new(args.since.unwrap_or(0), 0);
        let mut response = poll(&catalog, &id, cursor)?;
        if let Some(count) = args.count.filter(|&count| count < response.logs.len()) {
            response.logs.truncate(count);
            // Resume right after the last printed entry.
            if let Some(last) = response.logs.last() {
                response.position = last.offset + 1;
                response.timestamp_ms = last.timestamp_ms;
            } else {
                response.position = cursor.position;
            }
        }
        print_once(&response, ctx.format);
        return Ok(SUCCESS);
    }

    let interval = parse_duration(&args.interval)?;
    let mut cursor = match args.since {
        Some(position) => TailCursor::new(position, 0),
        None => {
            let store = catalog
                .store(&id)
                .map_err(|err| store_error("open failed", err))?;
            TailCursor::at_end(&store)
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    debug!(store = %id, position = cursor.position, "following log");

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let response = poll(&catalog, &id, cursor)?;
        cursor = response.cursor();

        let mut logs = response.logs;
        if let Some(count) = args.count {
            logs.truncate(count.saturating_sub(printed));
        }
        print_logs(&logs, ctx.format);
        printed = printed.saturating_add(logs.len());

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
        std::thread::sleep(interval);
    }

    Ok(SUCCESS)
}

fn poll(catalog: &LogCatalog, id: &StoreId, cursor: TailCursor) -> CliResult<TailResponse> {
    catalog
        .poll_tail(id, cursor)
        .map_err(|err| store_error("poll failed", err))
}

fn print_once(response: &TailResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PollOutput {
            logs: &response.logs,
            position: response.position,
            timestamp_ms: response.timestamp_ms,
            count: response.logs.len(),
        }),
        OutputFormat::Pretty => {
            print_logs(&response.logs, format);
            println!("position {}", response.position);
        }
        OutputFormat::Table | OutputFormat::Raw => print_logs(&response.logs, format),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
