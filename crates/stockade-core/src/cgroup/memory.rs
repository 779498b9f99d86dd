//! Memory resource control via cgroups v2.
//!
//! Manages `memory.max`.

use std::path::Path;

use stockade_common::error::Result;

use crate::host::Host;
use crate::writer::write_control_file;

/// Sets the hard memory limit for a cgroup.
///
/// `value` is passed through verbatim (`256M`, `1073741824`, `max`, ...);
/// the kernel decides whether it is acceptable.
///
/// # Errors
///
/// Returns an error if writing to `memory.max` fails.
pub fn set_memory_max<H: Host>(host: &H, cgroup_path: &Path, value: &str) -> Result<()> {
    write_control_file(host, &cgroup_path.join("memory.max"), value)?;
    tracing::debug!(value, "memory max set");
    Ok(())
}
