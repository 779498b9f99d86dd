//! `stockade run`: Create and launch a new container.

use anyhow::Context;
use clap::Args;
use stockade_common::types::ResourceLimits;
use stockade_core::host::Host;
use stockade_runtime::manager::{ContainerManager, cpu_quota_from_fraction};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Memory limit written to `memory.max` (e.g. `100M`), or `none`.
    #[arg(long, default_value = stockade_common::constants::UNLIMITED_SENTINEL)]
    pub memory: String,

    /// CPU share as a fraction of one core (e.g. `0.5`).
    #[arg(long)]
    pub cpu: Option<f64>,

    /// Read-only lower root filesystem.
    pub rootfs: String,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the limits are invalid or the launch fails.
pub fn execute<H: Host>(manager: &ContainerManager<'_, H>, args: RunArgs) -> anyhow::Result<()> {
    let runtime = manager.runtime();
    let limits = ResourceLimits {
        memory: runtime.parse_limit(&args.memory),
        cpu_quota: cpu_quota_from_fraction(args.cpu, runtime.cpu_period_us)?,
    };
    let record = manager
        .run(&args.rootfs, limits)
        .with_context(|| format!("running container from {}", args.rootfs))?;

    println!("{}", record.id);
    eprintln!(
        "Container {} started (pid {}, hostname {}).",
        record.id,
        crate::output::format_pid(record.pid),
        record.hostname
    );
    Ok(())
}
