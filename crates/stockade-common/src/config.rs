//! Configuration model for the Stockade runtime.
//!
//! [`RuntimeConfig`] carries every host path and tunable a component needs,
//! so several launches with distinct roots can coexist (tests rely on it).
//! [`ContainerConfig`] describes one container invocation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::{ResourceLimit, ResourceLimits};

/// Host-level configuration shared by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory holding `<hostname>-merged`, `-upper` and `-work`.
    pub temp_root: PathBuf,
    /// Parent cgroup under which per-PID nodes are created.
    pub cgroup_root: PathBuf,
    /// Host procfs mount point.
    pub proc_root: PathBuf,
    /// Directory holding persisted container records.
    pub state_dir: PathBuf,
    /// Size in bytes of the stack handed to the cloned init.
    pub stack_size: usize,
    /// CFS period paired with every CPU quota.
    pub cpu_period_us: u64,
    /// Argument value meaning "unlimited".
    pub unlimited_sentinel: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            temp_root: PathBuf::from(constants::DEFAULT_TEMP_ROOT),
            cgroup_root: PathBuf::from(constants::DEFAULT_CGROUP_ROOT),
            proc_root: PathBuf::from(constants::DEFAULT_PROC_ROOT),
            state_dir: PathBuf::from(constants::DEFAULT_STATE_DIR),
            stack_size: constants::DEFAULT_STACK_SIZE,
            cpu_period_us: constants::DEFAULT_CPU_PERIOD_US,
            unlimited_sentinel: constants::UNLIMITED_SENTINEL.to_owned(),
        }
    }
}

impl RuntimeConfig {
    /// Parses a limit argument against the configured sentinel.
    #[must_use]
    pub fn parse_limit(&self, raw: &str) -> ResourceLimit {
        ResourceLimit::parse(raw, &self.unlimited_sentinel)
    }

    /// Path of the cgroup node for a given init PID.
    #[must_use]
    pub fn cgroup_path(&self, pid: i32) -> PathBuf {
        self.cgroup_root.join(pid.to_string())
    }

    /// Path of `/proc/<pid>/<entry>` on the host.
    #[must_use]
    pub fn proc_path(&self, pid: i32, entry: &str) -> PathBuf {
        self.proc_root.join(pid.to_string()).join(entry)
    }
}

/// The three directories backing a container's overlay root.
///
/// Keyed by hostname only, so two containers sharing a hostname collide;
/// callers keep hostnames unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayPaths {
    /// Mount point of the union view; becomes the container's `/`.
    pub merged: PathBuf,
    /// Writable layer receiving every modification.
    pub upper: PathBuf,
    /// Scratch directory required by overlayfs.
    pub work: PathBuf,
}

impl OverlayPaths {
    /// Derives the paths for `hostname` under `temp_root`.
    #[must_use]
    pub fn new(temp_root: &Path, hostname: &str) -> Self {
        Self {
            merged: temp_root.join(format!("{hostname}-merged")),
            upper: temp_root.join(format!("{hostname}-upper")),
            work: temp_root.join(format!("{hostname}-work")),
        }
    }

    /// Directories in creation order.
    #[must_use]
    pub fn dirs(&self) -> [&Path; 3] {
        [&self.merged, &self.upper, &self.work]
    }
}

/// Everything needed to launch one container.
///
/// Read-only once built; the overlay paths are derived at construction and
/// the cgroup path is only known after spawn (see [`RuntimeConfig::cgroup_path`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Hostname applied inside the new UTS namespace.
    pub hostname: String,
    /// Lower, read-only root filesystem.
    pub rootfs: PathBuf,
    /// Memory and CPU limits.
    pub limits: ResourceLimits,
    /// Command vector, reserved for running a workload inside the container.
    pub command: Vec<String>,
    /// Derived overlay directories.
    pub overlay: OverlayPaths,
}

impl ContainerConfig {
    /// Builds a container configuration, deriving the overlay paths.
    #[must_use]
    pub fn new(
        runtime: &RuntimeConfig,
        hostname: impl Into<String>,
        rootfs: impl Into<PathBuf>,
        limits: ResourceLimits,
        command: Vec<String>,
    ) -> Self {
        let hostname = hostname.into();
        let overlay = OverlayPaths::new(&runtime.temp_root, &hostname);
        Self {
            hostname,
            rootfs: rootfs.into(),
            limits,
            command,
            overlay,
        }
    }
}
