//! `stockade stop`: Stop a running container.

use anyhow::Context;
use clap::Args;
use stockade_core::host::Host;
use stockade_runtime::manager::ContainerManager;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Container ID or unique prefix.
    pub container: String,
}

/// Executes the `stop` command.
///
/// Sends `SIGTERM` to the container's init, which exits cleanly.
///
/// # Errors
///
/// Returns an error if the container is unknown or cannot be signalled.
pub fn execute<H: Host>(manager: &ContainerManager<'_, H>, args: &StopArgs) -> anyhow::Result<()> {
    let record = manager
        .stop(&args.container)
        .with_context(|| format!("stopping container {}", args.container))?;
    eprintln!("Container {} stopped.", record.id);
    Ok(())
}
