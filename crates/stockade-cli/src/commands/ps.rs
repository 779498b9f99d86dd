//! `stockade ps`: List containers and their state.

use clap::Args;
use stockade_common::types::ContainerState;
use stockade_core::host::Host;
use stockade_runtime::manager::ContainerManager;

use crate::output;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show only running containers.
    #[arg(short, long)]
    pub running: bool,
}

/// Executes the `ps` command.
///
/// Records whose init has exited are updated to `stopped` on the way.
///
/// # Errors
///
/// Returns an error if the state store cannot be read or updated.
pub fn execute<H: Host>(manager: &ContainerManager<'_, H>, args: &PsArgs) -> anyhow::Result<()> {
    let records: Vec<_> = manager
        .list()?
        .into_iter()
        .filter(|r| !args.running || r.status == ContainerState::Running)
        .collect();

    if records.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    println!("{:<15} {:<10} {:<10} {:<20}", "CONTAINER ID", "STATUS", "PID", "CREATED");
    for r in &records {
        println!(
            "{:<15} {:<10} {:<10} {:<20}",
            r.id.as_str(),
            r.status.to_string(),
            output::format_pid(r.pid),
            r.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }
    Ok(())
}
