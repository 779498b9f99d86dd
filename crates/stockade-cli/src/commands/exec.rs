//! `stockade exec`: Execute a command inside a running container.

use anyhow::Context;
use clap::Args;
use stockade_core::host::Host;
use stockade_runtime::manager::ContainerManager;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Container ID or unique prefix.
    pub container: String,

    /// Command to execute.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command.
///
/// Joins the container's namespaces and replaces this process with the
/// command, so it only returns on failure.
///
/// # Errors
///
/// Returns an error if the container is not running or joining fails.
pub fn execute<H: Host>(manager: &ContainerManager<'_, H>, args: ExecArgs) -> anyhow::Result<()> {
    tracing::info!(container = %args.container, command = ?args.command, "entering container");
    let _ = manager
        .exec(&args.container, args.command)
        .with_context(|| format!("executing in container {}", args.container))?;
    Ok(())
}
