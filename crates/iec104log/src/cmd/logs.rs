use iec104log_store::LogQuery;

use crate::cmd::{Context, LogsArgs};
use crate::exit::{store_error, CliResult, SUCCESS};
use crate::output::{print_json, print_logs, OutputFormat};

pub fn run(args: LogsArgs, ctx: &Context) -> CliResult<i32> {
    let id = args.store.store_id()?;
    let query = LogQuery {
        tail: args.tail,
        frame_type: args.filter,
    };

    let response = ctx
        .catalog()
        .get_logs(&id, &query)
        .map_err(|err| store_error("read failed", err))?;

    match ctx.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Pretty => {
            let info = &response.file_info;
            println!(
                "{}/{}  {} entries  {}  modified {}",
                info.role, info.name, info.total_lines, info.file_size_formatted, info.modified
            );
            print_logs(&response.logs, ctx.format);
        }
        OutputFormat::Table | OutputFormat::Raw => print_logs(&response.logs, ctx.format),
    }

    Ok(SUCCESS)
}
