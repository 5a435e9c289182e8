#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/iec104log-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn run(base: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_iec104log"))
        .env_remove("IEC104LOG_CLIENT_DIR")
        .env_remove("IEC104LOG_SERVER_DIR")
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("--client-dir")
        .arg(base.join("client_logs"))
        .arg("--server-dir")
        .arg(base.join("server_logs"))
        .args(args)
        .output()
        .expect("iec104log should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be one json document")
}

fn append(base: &Path, role: &str, name: &str, dir: &str, data: &str, time_ms: u64) {
    let output = run(
        base,
        &[
            "append",
            role,
            name,
            "--dir",
            dir,
            "--data",
            data,
            "--time-ms",
            &time_ms.to_string(),
        ],
    );
    assert!(
        output.status.success(),
        "append failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn append_then_logs_decodes_frames() {
    let base = unique_temp_dir("logs");
    append(&base, "server", "rtu.log", "rx", "68 04 07 00 00 00", 1_718_000_000_123);
    append(
        &base,
        "server",
        "rtu.log",
        "tx",
        "68 0E 00 00 02 00 64 01 06 00 01 00 00 00 00 14",
        1_718_000_000_200,
    );

    let output = run(&base, &["logs", "server", "rtu.log"]);
    assert!(output.status.success());
    let json = stdout_json(&output);

    assert_eq!(json["file_info"]["name"], "rtu.log");
    assert_eq!(json["file_info"]["total_lines"], 2);
    let logs = json["logs"].as_array().expect("logs should be an array");
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["frame_info"]["function"], "STARTDT_ACT");
    assert_eq!(logs[0]["timestamp"], "2024-06-10 06:13:20.123");
    assert_eq!(logs[1]["direction"], "TX");
    assert_eq!(logs[1]["frame_info"]["type_id"], "0x64");
    assert_eq!(logs[1]["frame_info"]["recv_seq"], 1);

    let filtered = run(&base, &["logs", "server", "rtu.log", "--filter", "I"]);
    let json = stdout_json(&filtered);
    assert_eq!(json["logs"].as_array().map(Vec::len), Some(1));

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn tail_since_past_end_returns_current_position() {
    let base = unique_temp_dir("tail");
    for i in 0..3 {
        append(&base, "client", "a.log", "rx", "68 04 43 00 00 00", 100 + i);
    }

    let output = run(&base, &["tail", "client", "a.log", "--since", "5"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["count"], 0);
    assert_eq!(json["position"], 3);

    let output = run(&base, &["tail", "client", "a.log", "--since", "1"]);
    let json = stdout_json(&output);
    assert_eq!(json["count"], 2);
    assert_eq!(json["logs"][0]["offset"], 1);
    assert_eq!(json["timestamp_ms"], 102);

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn stats_counts_externally_captured_lines() {
    let base = unique_temp_dir("stats");
    let dir = base.join("client_logs");
    std::fs::create_dir_all(&dir).expect("client dir should be creatable");
    let mut file = std::fs::File::create(dir.join("cap.log")).expect("log should be creatable");
    writeln!(
        file,
        r#"{{"time_ms":1,"dir":"cli -> ser","len":6,"data":"68 04 07 00 00 00"}}"#
    )
    .unwrap();
    writeln!(file, "garbage").unwrap();
    writeln!(
        file,
        r#"{{"time_ms":2,"dir":"ser -> cli","len":6,"data":"68 04 0B 00 00 00"}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"time_ms":3,"dir":"ser -> cli","len":6,"data":"68 04 01 00 02 00"}}"#
    )
    .unwrap();
    drop(file);

    let output = run(&base, &["stats", "client", "cap.log"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["total"], 3);
    assert_eq!(json["by_direction"]["TX"], 2);
    assert_eq!(json["by_direction"]["RX"], 1);
    assert_eq!(json["by_frame_type"]["U"], 2);
    assert_eq!(json["by_frame_type"]["S"], 1);

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn missing_log_exits_with_no_input() {
    let base = unique_temp_dir("missing");
    let output = run(&base, &["logs", "client", "nope.log"]);
    assert_eq!(output.status.code(), Some(66));
    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn path_traversal_is_a_usage_error() {
    let base = unique_temp_dir("traversal");
    let output = run(&base, &["logs", "client", "../server_logs/x.log"]);
    assert_eq!(output.status.code(), Some(64));
    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn files_lists_both_roles() {
    let base = unique_temp_dir("files");
    append(&base, "client", "c1.log", "rx", "68 04 07 00 00 00", 1);
    append(&base, "server", "s1.log", "tx", "68 04 0B 00 00 00", 2);

    let output = run(&base, &["files"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["client"][0]["name"], "c1.log");
    assert_eq!(json["server"][0]["name"], "s1.log");
    assert_eq!(json["server"][0]["type"], "server");

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn decode_reports_malformed_input_as_data_invalid() {
    let base = unique_temp_dir("decode");

    let ok = run(&base, &["decode", "68", "04", "83", "00", "00", "00"]);
    assert!(ok.status.success());
    assert_eq!(stdout_json(&ok)["function"], "TESTFR_CON");

    let bad = run(&base, &["decode", "10 04 07 00 00 00"]);
    assert_eq!(bad.status.code(), Some(60));
    assert_eq!(stdout_json(&bad)["type"], "MALFORMED");

    let not_hex = run(&base, &["decode", "zz"]);
    assert_eq!(not_hex.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn config_reports_effective_directories() {
    let base = unique_temp_dir("config");
    let output = run(&base, &["config", "--max-log-lines", "25"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["max_log_lines"], 25);
    assert!(json["client_logs_dir"]
        .as_str()
        .is_some_and(|dir| dir.ends_with("client_logs")));
    let _ = std::fs::remove_dir_all(&base);
}
