//! CPU resource control via cgroups v2.
//!
//! Manages `cpu.max`.

use std::path::Path;

use stockade_common::error::Result;

use crate::host::Host;
use crate::writer::write_control_file;

/// Formats the two-number `cpu.max` value.
///
/// The quota is not checked against the period; a quota larger than the
/// period grants more than one CPU and a malformed one is rejected by the
/// kernel at write time.
#[must_use]
pub fn cpu_max_value(quota: &str, period_us: u64) -> String {
    format!("{quota} {period_us}")
}

/// Sets the CPU bandwidth limit (max microseconds per period).
///
/// Writes `quota period_us` to `cpu.max`, where `quota` is the maximum CPU
/// time allowed per `period_us` window.
///
/// # Errors
///
/// Returns an error if writing to `cpu.max` fails.
pub fn set_cpu_max<H: Host>(host: &H, cgroup_path: &Path, quota: &str, period_us: u64) -> Result<()> {
    let value = cpu_max_value(quota, period_us);
    write_control_file(host, &cgroup_path.join("cpu.max"), &value)?;
    tracing::debug!(quota, period_us, "CPU max quota set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_paired_with_period() {
        assert_eq!(cpu_max_value("50000", 100_000), "50000 100000");
    }
}
