//! # stockade-cli
//!
//! Shared plumbing for the Stockade binaries: logging setup, the runtime
//! root options, argument parsing with the runtime's exit-code policy, and
//! the `stockade` subcommands.

#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser};
use stockade_common::config::RuntimeConfig;
use stockade_common::constants::{DEFAULT_CGROUP_ROOT, DEFAULT_STATE_DIR, DEFAULT_TEMP_ROOT};
use tracing_subscriber::EnvFilter;

/// Host roots every binary accepts, with environment fallbacks.
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Directory holding the `<hostname>-merged/-upper/-work` directories.
    #[arg(long, env = "STOCKADE_TEMP_ROOT", default_value = DEFAULT_TEMP_ROOT, global = true)]
    pub temp_root: PathBuf,

    /// Parent cgroup for per-container nodes.
    #[arg(long, env = "STOCKADE_CGROUP_ROOT", default_value = DEFAULT_CGROUP_ROOT, global = true)]
    pub cgroup_root: PathBuf,

    /// Directory holding container records.
    #[arg(long, env = "STOCKADE_STATE_DIR", default_value = DEFAULT_STATE_DIR, global = true)]
    pub state_dir: PathBuf,
}

impl RootArgs {
    /// Runtime configuration with these roots and defaults elsewhere.
    #[must_use]
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            temp_root: self.temp_root.clone(),
            cgroup_root: self.cgroup_root.clone(),
            state_dir: self.state_dir.clone(),
            ..RuntimeConfig::default()
        }
    }
}

/// Installs the stderr `fmt` subscriber, filtered by `RUST_LOG` (default
/// `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses the command line, mapping any usage error to exit status 1.
///
/// `--help` and `--version` print and yield a successful exit instead.
///
/// # Errors
///
/// Returns the exit code to terminate with when parsing did not produce
/// arguments.
pub fn parse_args<P: Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    })
}

/// Reports a fatal error on stderr and returns exit status 1.
///
/// Printed directly so it survives `RUST_LOG=off`.
pub fn fail(err: &anyhow::Error) -> ExitCode {
    eprintln!("error: {err:#}");
    ExitCode::FAILURE
}
