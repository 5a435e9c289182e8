use std::path::Path;

use iec104log_store::view::format_size;
use serde::Serialize;

use crate::cmd::{ConfigArgs, Context};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Serialize)]
struct ConfigOutput<'a> {
    client_logs_dir: &'a Path,
    server_logs_dir: &'a Path,
    max_log_lines: usize,
    max_file_size: u64,
    max_file_size_formatted: String,
    max_entry_size: usize,
    cause_size: usize,
    common_address_size: usize,
    ioa_size: usize,
}

pub fn run(_args: ConfigArgs, ctx: &Context) -> CliResult<i32> {
    let config = &ctx.config;
    let out = ConfigOutput {
        client_logs_dir: &config.client_dir,
        server_logs_dir: &config.server_dir,
        max_log_lines: config.max_log_lines,
        max_file_size: config.store.large_file_warn,
        max_file_size_formatted: format_size(config.store.large_file_warn),
        max_entry_size: config.store.max_entry_size,
        cause_size: config.store.profile.cause_size,
        common_address_size: config.store.profile.common_address_size,
        ioa_size: config.store.profile.ioa_size,
    };

    match ctx.format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut table = table(vec!["SETTING", "VALUE"]);
            table
                .add_row(vec!["client_logs_dir".to_string(), out.client_logs_dir.display().to_string()])
                .add_row(vec!["server_logs_dir".to_string(), out.server_logs_dir.display().to_string()])
                .add_row(vec!["max_log_lines".to_string(), out.max_log_lines.to_string()])
                .add_row(vec!["max_file_size".to_string(), out.max_file_size_formatted.clone()])
                .add_row(vec!["max_entry_size".to_string(), out.max_entry_size.to_string()])
                .add_row(vec![
                    "asdu_profile".to_string(),
                    format!("{}/{}/{}", out.cause_size, out.common_address_size, out.ioa_size),
                ]);
            println!("{table}");
        }
        OutputFormat::Raw => {
            println!("{}", out.client_logs_dir.display());
            println!("{}", out.server_logs_dir.display());
        }
    }

    Ok(SUCCESS)
}
