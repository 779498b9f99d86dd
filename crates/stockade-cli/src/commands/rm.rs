//! `stockade rm`: Remove a stopped container and its resources.

use anyhow::Context;
use clap::Args;
use stockade_core::host::Host;
use stockade_runtime::manager::ContainerManager;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Container ID or unique prefix.
    pub container: String,
}

/// Executes the `rm` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, still running, or its
/// record cannot be removed.
pub fn execute<H: Host>(manager: &ContainerManager<'_, H>, args: &RmArgs) -> anyhow::Result<()> {
    let id = manager
        .remove(&args.container)
        .with_context(|| format!("removing container {}", args.container))?;
    eprintln!("Container {id} removed.");
    Ok(())
}
