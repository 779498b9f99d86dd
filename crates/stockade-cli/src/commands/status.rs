//! `stockade status`: Show a container's state and resource usage.

use clap::Args;
use stockade_core::host::Host;
use stockade_runtime::manager::ContainerManager;

use crate::output;

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Container ID or unique prefix.
    pub container: String,
}

/// Executes the `status` command.
///
/// # Errors
///
/// Returns an error if the container is unknown.
pub fn execute<H: Host>(manager: &ContainerManager<'_, H>, args: &StatusArgs) -> anyhow::Result<()> {
    let status = manager.status(&args.container)?;
    let record = &status.record;
    if !status.alive {
        println!("Container {} is not running.", record.id);
        return Ok(());
    }

    println!("--- Status for container {} ---", record.id);
    println!("Status: {}", record.status);
    println!("PID: {}", output::format_pid(record.pid));
    match &status.stats {
        Some(stats) => {
            println!("Memory usage: {}", output::format_mib(stats.memory_current_mib()));
            println!("Memory limit: {}", stats.memory_max);
            println!("CPU stats:\n{}", stats.cpu_stat);
        }
        None => println!("Could not retrieve cgroup stats."),
    }
    Ok(())
}
