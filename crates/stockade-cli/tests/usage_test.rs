//! Exit-status checks for the positional binaries.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::process::Command;

fn run(bin: &str, args: &[&str]) -> std::process::Output {
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("binary should start")
}

#[test]
fn executor_with_too_few_arguments_exits_one() {
    let out = run(env!("CARGO_BIN_EXE_stockade-executor"), &["c1", "/rootfs", "none"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!out.stderr.is_empty());
}

#[test]
fn nsenter_without_command_exits_one() {
    let out = run(env!("CARGO_BIN_EXE_stockade-nsenter"), &["4242", "/tmp/c1-merged"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn nsenter_with_non_numeric_pid_exits_one() {
    let out = run(env!("CARGO_BIN_EXE_stockade-nsenter"), &["abc", "/tmp/c1-merged", "sh"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn executor_help_exits_zero() {
    let out = run(env!("CARGO_BIN_EXE_stockade-executor"), &["--help"]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn executor_with_missing_rootfs_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-rootfs");
    let out = Command::new(env!("CARGO_BIN_EXE_stockade-executor"))
        .args(["c1", missing.to_str().unwrap(), "none", "none"])
        .env("STOCKADE_TEMP_ROOT", dir.path())
        .env("STOCKADE_CGROUP_ROOT", dir.path().join("cg"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no-such-rootfs"));
    assert!(!dir.path().join("c1-merged").exists());
}

#[test]
fn fatal_error_is_reported_once_even_with_logging_off() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-rootfs");
    let out = Command::new(env!("CARGO_BIN_EXE_stockade-executor"))
        .args(["c1", missing.to_str().unwrap(), "none", "none"])
        .env("STOCKADE_TEMP_ROOT", dir.path())
        .env("STOCKADE_CGROUP_ROOT", dir.path().join("cg"))
        .env("RUST_LOG", "trace")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let reports = stderr.lines().filter(|l| l.starts_with("error: ")).count();
    assert_eq!(reports, 1, "stderr was: {stderr}");

    let quiet = Command::new(env!("CARGO_BIN_EXE_stockade-executor"))
        .args(["c1", missing.to_str().unwrap(), "none", "none"])
        .env("STOCKADE_TEMP_ROOT", dir.path())
        .env("STOCKADE_CGROUP_ROOT", dir.path().join("cg"))
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&quiet.stderr).starts_with("error: "));
}
