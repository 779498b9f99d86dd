//! `stockade start`: Relaunch a stopped or failed container.

use anyhow::Context;
use clap::Args;
use stockade_core::host::Host;
use stockade_runtime::manager::ContainerManager;

/// Arguments for the `start` command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Container ID or unique prefix.
    pub container: String,
}

/// Executes the `start` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, running, or fails to
/// launch.
pub fn execute<H: Host>(manager: &ContainerManager<'_, H>, args: &StartArgs) -> anyhow::Result<()> {
    let record = manager
        .start(&args.container)
        .with_context(|| format!("starting container {}", args.container))?;
    eprintln!(
        "Container {} started (pid {}).",
        record.id,
        crate::output::format_pid(record.pid)
    );
    Ok(())
}
