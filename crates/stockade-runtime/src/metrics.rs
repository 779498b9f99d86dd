//! Resource usage readings.
//!
//! Reads a container's cgroup interface files to report current memory
//! use, the effective memory ceiling, and CPU accounting.

use serde::{Deserialize, Serialize};
use stockade_common::error::{Result, StockadeError};
use stockade_core::cgroup::CgroupNode;
use stockade_core::host::Host;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Snapshot of a container's cgroup statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgroupStats {
    /// `memory.current`, in bytes.
    pub memory_current_bytes: u64,
    /// `memory.max`, verbatim (`max` when unlimited).
    pub memory_max: String,
    /// `cpu.stat`, verbatim.
    pub cpu_stat: String,
}

impl CgroupStats {
    /// Current memory use in MiB.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn memory_current_mib(&self) -> f64 {
        self.memory_current_bytes as f64 / BYTES_PER_MIB
    }
}

/// Reads the statistics of `node`.
///
/// # Errors
///
/// Returns an error if any interface file is missing or `memory.current`
/// is not a number.
pub fn collect<H: Host>(host: &H, node: &CgroupNode) -> Result<CgroupStats> {
    let current = node.read(host, "memory.current")?;
    let memory_current_bytes = current.parse().map_err(|_| StockadeError::Config {
        message: format!("unexpected memory.current value '{current}'"),
    })?;
    let stats = CgroupStats {
        memory_current_bytes,
        memory_max: node.read(host, "memory.max")?,
        cpu_stat: node.read(host, "cpu.stat")?,
    };
    tracing::debug!(path = %node.path().display(), "collected cgroup stats");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use stockade_core::testing::RecordingHost;

    use super::*;

    fn node() -> CgroupNode {
        CgroupNode::at(PathBuf::from("/cg/4242"))
    }

    #[test]
    fn collects_all_three_files() {
        let host = RecordingHost::new();
        host.set_file("/cg/4242/memory.current", "2097152\n");
        host.set_file("/cg/4242/memory.max", "268435456\n");
        host.set_file("/cg/4242/cpu.stat", "usage_usec 1200\nuser_usec 800\n");

        let stats = collect(&host, &node()).unwrap();
        assert_eq!(stats.memory_current_bytes, 2_097_152);
        assert!((stats.memory_current_mib() - 2.0).abs() < f64::EPSILON);
        assert_eq!(stats.memory_max, "268435456");
        assert_eq!(stats.cpu_stat, "usage_usec 1200\nuser_usec 800");
    }

    #[test]
    fn missing_file_is_an_error() {
        let host = RecordingHost::new();
        host.set_file("/cg/4242/memory.current", "0");
        assert!(collect(&host, &node()).is_err());
    }

    #[test]
    fn garbage_memory_reading_is_rejected() {
        let host = RecordingHost::new();
        host.set_file("/cg/4242/memory.current", "lots");
        assert!(matches!(collect(&host, &node()), Err(StockadeError::Config { .. })));
    }
}
