mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use iec104log_store::{CatalogConfig, DEFAULT_MAX_LOG_LINES};

use crate::cmd::{Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "iec104log", version, about = "IEC 60870-5-104 capture log CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Directory holding client-side capture logs.
    #[arg(
        long,
        value_name = "DIR",
        env = "IEC104LOG_CLIENT_DIR",
        default_value = "client_logs",
        global = true
    )]
    client_dir: PathBuf,

    /// Directory holding server-side capture logs.
    #[arg(
        long,
        value_name = "DIR",
        env = "IEC104LOG_SERVER_DIR",
        default_value = "server_logs",
        global = true
    )]
    server_dir: PathBuf,

    /// Entries returned by `logs` without --tail.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_LOG_LINES, global = true)]
    max_log_lines: usize,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            client_dir: self.client_dir.clone(),
            server_dir: self.server_dir.clone(),
            max_log_lines: self.max_log_lines,
            ..CatalogConfig::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let ctx = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        config: cli.catalog_config(),
    };
    let result = cmd::run(cli.command, &ctx);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
