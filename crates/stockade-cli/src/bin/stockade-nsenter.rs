//! # stockade-nsenter
//!
//! Runs a command inside a running container's namespaces and root.
//!
//! ```text
//! stockade-nsenter <pid> <chroot-path> <command> [args...]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use nix::unistd::Pid;
use stockade_core::host::LinuxHost;
use stockade_runtime::join::{self, JoinRequest};

/// Join a container's namespaces and execute a command there.
#[derive(Parser, Debug)]
#[command(name = "stockade-nsenter", version, about, long_about = None)]
struct NsenterArgs {
    #[command(flatten)]
    roots: stockade_cli::RootArgs,

    /// Host PID of the target container's init.
    pid: i32,

    /// Container root to `chroot` into.
    root: PathBuf,

    /// Command and its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    stockade_cli::init_logging();
    let args = match stockade_cli::parse_args::<NsenterArgs>() {
        Ok(args) => args,
        Err(code) => return code,
    };
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => stockade_cli::fail(&e),
    }
}

fn execute(args: NsenterArgs) -> anyhow::Result<()> {
    let runtime = args.roots.runtime_config();
    tracing::info!(pid = args.pid, "attempting to join namespaces");
    let request = JoinRequest {
        pid: Pid::from_raw(args.pid),
        root: args.root,
        command: args.command,
    };
    let _ = join::join(&LinuxHost, &runtime, &request)
        .with_context(|| format!("entering container of pid {}", args.pid))?;
    Ok(())
}
