//! # stockade-executor
//!
//! Launches one container and exits, leaving its init running.
//!
//! ```text
//! stockade-executor <hostname> <rootfs> <memory> <cpu-quota> [command...]
//! ```
//!
//! `none` for a limit leaves that cgroup control file untouched.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use stockade_common::config::ContainerConfig;
use stockade_common::types::ResourceLimits;
use stockade_core::host::LinuxHost;
use stockade_runtime::launch;

/// Launch a container in fresh namespaces.
#[derive(Parser, Debug)]
#[command(name = "stockade-executor", version, about, long_about = None)]
struct ExecutorArgs {
    #[command(flatten)]
    roots: stockade_cli::RootArgs,

    /// Hostname inside the container; also keys its overlay directories.
    hostname: String,

    /// Read-only lower root filesystem.
    rootfs: String,

    /// Value for `memory.max`, or `none`.
    memory: String,

    /// CPU quota in microseconds per 100ms period, or `none`.
    cpu_quota: String,

    /// Reserved; accepted and recorded but not run.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    stockade_cli::init_logging();
    let args = match stockade_cli::parse_args::<ExecutorArgs>() {
        Ok(args) => args,
        Err(code) => return code,
    };
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => stockade_cli::fail(&e),
    }
}

fn execute(args: ExecutorArgs) -> anyhow::Result<()> {
    let runtime = args.roots.runtime_config();
    let limits = ResourceLimits {
        memory: runtime.parse_limit(&args.memory),
        cpu_quota: runtime.parse_limit(&args.cpu_quota),
    };
    let config = ContainerConfig::new(&runtime, args.hostname, args.rootfs, limits, args.command);

    let launched = launch::launch(&LinuxHost, &runtime, &config)
        .with_context(|| format!("launching container '{}'", config.hostname))?;
    tracing::info!(
        pid = %launched.pid,
        "parent process is exiting, child container remains active"
    );
    Ok(())
}
