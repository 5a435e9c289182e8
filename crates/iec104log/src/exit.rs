use std::fmt;
use std::io;

use iec104log_frame::HexError;
use iec104log_store::StoreError;

// Exit codes follow the rsfulmen/sysexits layout.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_INPUT: i32 = 66;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: &io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => NO_INPUT,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn store_error(context: &str, err: StoreError) -> CliError {
    match &err {
        StoreError::NotFound(_) => CliError::new(NO_INPUT, format!("{context}: {err}")),
        StoreError::InvalidName(_) => CliError::new(USAGE, format!("{context}: {err}")),
        StoreError::EntryTooLarge { .. } | StoreError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        StoreError::Io { source, .. } => io_error(context, source),
        StoreError::CapacityExhausted(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        _ => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn hex_error(context: &str, err: HexError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}
