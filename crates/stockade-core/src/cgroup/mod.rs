//! Cgroups v2 resource management.
//!
//! Every container gets a node named after its init PID beneath a shared
//! parent cgroup. The parent must delegate the `cpu`, `memory`, and `io`
//! controllers through `cgroup.subtree_control` before any node can
//! enforce `memory.max` or `cpu.max`.
//!
//! Any write failure here is fatal: a container that believes it is
//! constrained but is not must never start.

pub mod cpu;
pub mod memory;

use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::Pid;
use stockade_common::config::RuntimeConfig;
use stockade_common::constants::SUBTREE_CONTROLLERS;
use stockade_common::error::{Result, StockadeError};
use stockade_common::types::ResourceLimits;

use crate::host::Host;
use crate::writer::write_control_file;

/// Creates per-container cgroup nodes under a configured parent.
#[derive(Debug, Clone)]
pub struct CgroupController {
    root: PathBuf,
    cpu_period_us: u64,
}

impl CgroupController {
    /// Creates a controller rooted at `config.cgroup_root`.
    #[must_use]
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            root: config.cgroup_root.clone(),
            cpu_period_us: config.cpu_period_us,
        }
    }

    /// Ensures the parent cgroup exists and delegates the `cpu`, `memory`,
    /// and `io` controllers to its children.
    ///
    /// Repeating this is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent cannot be created or the controllers
    /// cannot be enabled.
    pub fn prepare<H: Host>(&self, host: &H) -> Result<()> {
        host.create_dir_all(&self.root)
            .map_err(|e| StockadeError::io(&self.root, e))?;
        write_control_file(
            host,
            &self.root.join("cgroup.subtree_control"),
            SUBTREE_CONTROLLERS,
        )?;
        tracing::info!(path = %self.root.display(), "cgroup controllers enabled");
        Ok(())
    }

    /// Creates the node for `pid`, enrolls the process, and applies
    /// `limits`.
    ///
    /// Requires [`CgroupController::prepare`] to have run. An unlimited
    /// limit leaves its control file untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if enrollment or any limit write fails. A node
    /// that cannot be created is only warned about; enrollment then
    /// decides.
    pub fn attach<H: Host>(&self, host: &H, pid: Pid, limits: &ResourceLimits) -> Result<CgroupNode> {
        let node = CgroupNode {
            path: self.root.join(pid.to_string()),
        };

        match host.create_dir(&node.path) {
            Ok(()) => tracing::info!(path = %node.path.display(), "cgroup created"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::warn!(%pid, path = %node.path.display(), "cgroup already exists");
            }
            Err(e) => {
                tracing::warn!(%pid, path = %node.path.display(), error = %e, "cgroup creation failed");
            }
        }

        node.add_process(host, pid)?;

        if let Some(value) = limits.memory.value() {
            memory::set_memory_max(host, &node.path, value)?;
        }
        if let Some(quota) = limits.cpu_quota.value() {
            cpu::set_cpu_max(host, &node.path, quota, self.cpu_period_us)?;
        }
        Ok(node)
    }
}

/// Handle to a container's cgroup directory.
///
/// Dropping the handle leaves the cgroup in place; it is removed only by
/// an explicit [`CgroupNode::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupNode {
    path: PathBuf,
}

impl CgroupNode {
    /// Handle to an existing node at `path`.
    #[must_use]
    pub const fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path to this cgroup directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds a process to this cgroup by writing its PID.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `cgroup.procs` fails.
    pub fn add_process<H: Host>(&self, host: &H, pid: Pid) -> Result<()> {
        write_control_file(host, &self.path.join("cgroup.procs"), &pid.to_string())?;
        tracing::debug!(%pid, "added process to cgroup");
        Ok(())
    }

    /// Reads one of this node's interface files, trimmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read<H: Host>(&self, host: &H, file: &str) -> Result<String> {
        let path = self.path.join(file);
        host.read_file(&path)
            .map(|s| s.trim().to_owned())
            .map_err(|e| StockadeError::io(path, e))
    }

    /// Removes the (empty) cgroup directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `rmdir` fails, e.g. while processes remain.
    pub fn remove<H: Host>(&self, host: &H) -> Result<()> {
        host.remove_dir(&self.path)
            .map_err(|e| StockadeError::io(&self.path, e))?;
        tracing::info!(path = %self.path.display(), "cgroup destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingHost};
    use stockade_common::types::ResourceLimit;

    fn controller() -> CgroupController {
        CgroupController::new(&RuntimeConfig {
            cgroup_root: PathBuf::from("/cg"),
            ..RuntimeConfig::default()
        })
    }

    fn limits(memory: &str, cpu: &str) -> ResourceLimits {
        ResourceLimits {
            memory: ResourceLimit::parse(memory, "none"),
            cpu_quota: ResourceLimit::parse(cpu, "none"),
        }
    }

    #[test]
    fn prepare_enables_controllers_on_parent() {
        let host = RecordingHost::new();
        controller().prepare(&host).unwrap();
        assert_eq!(
            host.writes(),
            vec![(
                PathBuf::from("/cg/cgroup.subtree_control"),
                "+cpu +memory +io".to_owned()
            )]
        );
    }

    #[test]
    fn attach_writes_pid_then_limits() {
        let host = RecordingHost::new();
        let node = controller()
            .attach(&host, Pid::from_raw(4242), &limits("256M", "50000"))
            .unwrap();
        assert_eq!(node.path(), Path::new("/cg/4242"));
        assert_eq!(
            host.writes(),
            vec![
                (PathBuf::from("/cg/4242/cgroup.procs"), "4242".to_owned()),
                (PathBuf::from("/cg/4242/memory.max"), "256M".to_owned()),
                (PathBuf::from("/cg/4242/cpu.max"), "50000 100000".to_owned()),
            ]
        );
    }

    #[test]
    fn unlimited_limits_write_no_control_files() {
        let host = RecordingHost::new();
        let _ = controller()
            .attach(&host, Pid::from_raw(7), &limits("none", "none"))
            .unwrap();
        assert_eq!(
            host.writes(),
            vec![(PathBuf::from("/cg/7/cgroup.procs"), "7".to_owned())]
        );
        assert!(host.position(|c| matches!(c, Call::CreateDir(p) if p == Path::new("/cg/7"))).is_some());
    }

    #[test]
    fn existing_node_only_warns() {
        let host = RecordingHost::new();
        host.add_path("/cg/9");
        assert!(controller().attach(&host, Pid::from_raw(9), &limits("none", "none")).is_ok());
    }

    #[test]
    fn enrollment_failure_is_fatal_and_stops_limits() {
        let host = RecordingHost::new();
        host.fail_when(
            |c| matches!(c, Call::Write { path, .. } if path.ends_with("cgroup.procs")),
            nix::errno::Errno::EACCES as i32,
        );
        let err = controller()
            .attach(&host, Pid::from_raw(5), &limits("256M", "none"))
            .unwrap_err();
        assert!(matches!(err, StockadeError::Io { .. }));
        assert_eq!(host.writes().len(), 1);
    }

    #[test]
    fn limit_write_failure_is_fatal() {
        let host = RecordingHost::new();
        host.fail_when(
            |c| matches!(c, Call::Write { path, .. } if path.ends_with("cpu.max")),
            nix::errno::Errno::EINVAL as i32,
        );
        assert!(controller()
            .attach(&host, Pid::from_raw(5), &limits("none", "bogus"))
            .is_err());
    }

    #[test]
    fn node_reads_are_trimmed() {
        let host = RecordingHost::new();
        host.set_file("/cg/5/memory.max", "268435456\n");
        let node = CgroupNode::at(PathBuf::from("/cg/5"));
        assert_eq!(node.read(&host, "memory.max").unwrap(), "268435456");
    }
}
