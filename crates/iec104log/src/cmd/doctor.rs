use std::path::Path;

use iec104log_frame::{decode, Frame, UFunction};
use iec104log_store::Role;
use serde::Serialize;

use crate::cmd::{Context, DoctorArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, ctx: &Context) -> CliResult<i32> {
    let checks = vec![
        log_dir_check(Role::Client, &ctx.config.client_dir),
        log_dir_check(Role::Server, &ctx.config.server_dir),
        decoder_check(),
        compiled_features_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, ctx.format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => crate::output::print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("iec104log doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => println!("{}", output.overall),
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
    }
}

fn log_dir_check(role: Role, dir: &Path) -> CheckResult {
    let name = format!("{role}_logs_dir");

    if !dir.exists() {
        return CheckResult {
            name,
            status: CheckStatus::Warn,
            detail: format!("{} does not exist (created on first listing)", dir.display()),
        };
    }
    if !dir.is_dir() {
        return CheckResult {
            name,
            status: CheckStatus::Fail,
            detail: format!("{} is not a directory", dir.display()),
        };
    }

    let probe = dir.join(format!(".iec104log-doctor-{}", std::process::id()));
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            CheckResult {
                name,
                status: CheckStatus::Pass,
                detail: format!("{} writable", dir.display()),
            }
        }
        Err(err) => CheckResult {
            name,
            status: CheckStatus::Warn,
            detail: format!("{} read-only ({err}); append disabled", dir.display()),
        },
    }
}

fn decoder_check() -> CheckResult {
    let ok = matches!(
        decode(&[0x68, 0x04, 0x07, 0x00, 0x00, 0x00]),
        Frame::UFormat {
            function: UFunction::StartdtAct,
            ..
        }
    );
    CheckResult {
        name: "decoder".to_string(),
        status: if ok { CheckStatus::Pass } else { CheckStatus::Fail },
        detail: if ok {
            "STARTDT act decodes".to_string()
        } else {
            "STARTDT act did not decode".to_string()
        },
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![decoder_check()],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }

    #[test]
    fn missing_log_dir_is_a_warning() {
        let check = log_dir_check(Role::Client, Path::new("/nonexistent/iec104log/client"));
        assert!(matches!(check.status, CheckStatus::Warn));
    }
}
