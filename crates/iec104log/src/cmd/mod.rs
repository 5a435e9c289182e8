use clap::{Args, Subcommand};
use iec104log_frame::FrameType;
use iec104log_store::{CatalogConfig, Direction, LogCatalog, Role, StoreId};

use crate::exit::{store_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod append;
pub mod config;
pub mod decode;
pub mod doctor;
pub mod files;
pub mod logs;
pub mod stats;
pub mod tail;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List capture log files per role, newest first.
    Files(FilesArgs),
    /// Print decoded entries of one log.
    Logs(LogsArgs),
    /// Print entries appended since a position, optionally following.
    Tail(TailArgs),
    /// Count frames by direction, format, type and cause.
    Stats(StatsArgs),
    /// Decode one APDU given as hex.
    Decode(DecodeArgs),
    /// Append one captured APDU to a log.
    Append(AppendArgs),
    /// Print the effective configuration.
    Config(ConfigArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every command.
#[derive(Debug)]
pub struct Context {
    pub format: OutputFormat,
    pub config: CatalogConfig,
}

impl Context {
    pub fn catalog(&self) -> LogCatalog {
        LogCatalog::new(self.config.clone())
    }
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Files(args) => files::run(args, ctx),
        Command::Logs(args) => logs::run(args, ctx),
        Command::Tail(args) => tail::run(args, ctx),
        Command::Stats(args) => stats::run(args, ctx),
        Command::Decode(args) => decode::run(args, ctx),
        Command::Append(args) => append::run(args, ctx),
        Command::Config(args) => config::run(args, ctx),
        Command::Doctor(args) => doctor::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

/// Role and file name of one log.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Which side captured the log.
    #[arg(value_parser = parse_role)]
    pub role: Role,
    /// Log file name inside the role directory.
    pub name: String,
}

impl StoreArgs {
    pub fn store_id(&self) -> CliResult<StoreId> {
        StoreId::new(self.role, self.name.clone())
            .map_err(|err| store_error("invalid log name", err))
    }
}

#[derive(Args, Debug, Default)]
pub struct FilesArgs {}

#[derive(Args, Debug)]
pub struct LogsArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Only the last N entries.
    #[arg(long)]
    pub tail: Option<usize>,
    /// Only frames of this format (I, S, U or MALFORMED).
    #[arg(long, value_parser = parse_frame_type)]
    pub filter: Option<FrameType>,
}

#[derive(Args, Debug)]
pub struct TailArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Start position. Defaults to 0, or the current end with --follow.
    #[arg(long)]
    pub since: Option<u64>,
    /// Keep polling until interrupted.
    #[arg(long)]
    pub follow: bool,
    /// Polling interval with --follow (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Exit after printing N entries.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// APDU octets as hex, e.g. "68 04 07 00 00 00".
    #[arg(num_args = 1.., required = true)]
    pub hex: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AppendArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Direction: tx (server to client) or rx (client to server).
    #[arg(long = "dir", value_parser = parse_direction)]
    pub direction: Direction,
    /// APDU octets as hex.
    #[arg(long)]
    pub data: String,
    /// Capture time in ms since the epoch. Defaults to now.
    #[arg(long)]
    pub time_ms: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_role(input: &str) -> Result<Role, String> {
    input.parse()
}

fn parse_direction(input: &str) -> Result<Direction, String> {
    input.parse()
}

fn parse_frame_type(input: &str) -> Result<FrameType, String> {
    FrameType::from_code(input).ok_or_else(|| format!("unknown frame type: {input}"))
}

/// Parse "5s", "500ms" or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "interval must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid interval value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "interval must be greater than zero"));
    }

    Ok(if millis {
        std::time::Duration::from_millis(value)
    } else {
        std::time::Duration::from_secs(value)
    })
}
