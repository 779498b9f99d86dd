//! Operator-facing container lifecycle.
//!
//! Wraps the launch and join primitives with the on-disk state store so a
//! container can be created, listed, inspected, attached to, stopped, and
//! removed across separate short-lived invocations.

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use stockade_common::config::{OverlayPaths, RuntimeConfig};
use stockade_common::error::{Result, StockadeError};
use stockade_common::types::{ContainerId, ContainerState, ResourceLimit, ResourceLimits};
use stockade_core::cgroup::CgroupNode;
use stockade_core::filesystem::overlayfs;
use stockade_core::host::Host;

use crate::join::{self, JoinReport, JoinRequest};
use crate::launch;
use crate::metrics::{self, CgroupStats};
use crate::state::{ContainerRecord, StateStore};

/// Converts a fraction of one CPU into a quota for `period_us`.
///
/// `None` means no CPU limit.
///
/// # Errors
///
/// Returns [`StockadeError::Config`] for a negative or non-finite fraction,
/// or one too small to yield a non-zero quota.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn cpu_quota_from_fraction(fraction: Option<f64>, period_us: u64) -> Result<ResourceLimit> {
    let Some(fraction) = fraction else {
        return Ok(ResourceLimit::Unlimited);
    };
    if !fraction.is_finite() || fraction <= 0.0 {
        return Err(StockadeError::Config {
            message: format!("cpu fraction must be positive, got {fraction}"),
        });
    }
    let quota = (fraction * period_us as f64).trunc() as u64;
    if quota == 0 {
        return Err(StockadeError::Config {
            message: format!("cpu fraction {fraction} is below one microsecond per {period_us}us period"),
        });
    }
    Ok(ResourceLimit::Value(quota.to_string()))
}

/// Status of one container plus its cgroup readings, if available.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    /// The container's record.
    pub record: ContainerRecord,
    /// Whether the init process still exists.
    pub alive: bool,
    /// Cgroup readings, absent when the node or its files are gone.
    pub stats: Option<CgroupStats>,
}

/// Coordinates container operations against a host and a state store.
#[derive(Debug)]
pub struct ContainerManager<'h, H: Host> {
    host: &'h H,
    runtime: RuntimeConfig,
    store: StateStore,
}

impl<'h, H: Host> ContainerManager<'h, H> {
    /// Creates a manager storing records under `runtime.state_dir`.
    #[must_use]
    pub fn new(host: &'h H, runtime: RuntimeConfig) -> Self {
        let store = StateStore::new(&runtime.state_dir);
        Self {
            host,
            runtime,
            store,
        }
    }

    /// Runtime configuration in use.
    #[must_use]
    pub const fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    fn is_alive(&self, pid: i32) -> bool {
        self.host.stat(&self.runtime.proc_root.join(pid.to_string())).is_ok()
    }

    fn overlay_paths(&self, record: &ContainerRecord) -> OverlayPaths {
        OverlayPaths::new(&self.runtime.temp_root, &record.hostname)
    }

    /// Creates a new container from `rootfs` and launches it.
    ///
    /// The record is persisted as `creating` before launch, then updated to
    /// `running` or `failed`.
    ///
    /// # Errors
    ///
    /// Returns the launch error, after recording the failure.
    pub fn run(&self, rootfs: &str, limits: ResourceLimits) -> Result<ContainerRecord> {
        let record = ContainerRecord::new(ContainerId::generate(), rootfs, limits);
        self.store.save(&record)?;
        tracing::info!(id = %record.id, rootfs, "container created");
        self.launch_record(record)
    }

    /// Relaunches a container that is not running.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown, already running, or
    /// fails to launch.
    pub fn start(&self, prefix: &str) -> Result<ContainerRecord> {
        let record = self.store.find(prefix)?;
        if !record.status.is_startable() {
            return Err(StockadeError::Config {
                message: format!("container {} is already {}", record.id, record.status),
            });
        }
        self.launch_record(record)
    }

    fn launch_record(&self, mut record: ContainerRecord) -> Result<ContainerRecord> {
        let config = record.container_config(&self.runtime);
        match launch::launch(self.host, &self.runtime, &config) {
            Ok(launched) => {
                record.pid = Some(launched.pid.as_raw());
                record.status = ContainerState::Running;
                self.store.save(&record)?;
                Ok(record)
            }
            Err(e) => {
                record.status = ContainerState::Failed;
                if let Err(save_err) = self.store.save(&record) {
                    tracing::warn!(id = %record.id, error = %save_err, "could not record launch failure");
                }
                Err(e)
            }
        }
    }

    /// Lists every container, marking running ones whose init has exited
    /// as stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or updated.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        let mut records = self.store.list()?;
        for record in &mut records {
            if record.status != ContainerState::Running {
                continue;
            }
            if !record.pid.is_some_and(|pid| self.is_alive(pid)) {
                tracing::info!(id = %record.id, "init has exited, marking stopped");
                record.status = ContainerState::Stopped;
                self.store.save(record)?;
            }
        }
        Ok(records)
    }

    /// Attaches to a running container and executes `command` there.
    ///
    /// Against the real kernel this only returns on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is not running, its root is gone,
    /// or the join fails.
    pub fn exec(&self, prefix: &str, command: Vec<String>) -> Result<JoinReport> {
        let record = self.store.find(prefix)?;
        let pid = self.live_pid(&record)?;
        let root = self.overlay_paths(&record).merged;
        self.host.stat(&root).map_err(|e| StockadeError::io(&root, e))?;

        let request = JoinRequest {
            pid: Pid::from_raw(pid),
            root,
            command,
        };
        join::join(self.host, &self.runtime, &request)
    }

    /// The record of a container and its cgroup readings.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown. Unreadable cgroup
    /// files are reported as absent stats instead.
    pub fn status(&self, prefix: &str) -> Result<ContainerStatus> {
        let record = self.store.find(prefix)?;
        let alive = record.pid.is_some_and(|pid| self.is_alive(pid));
        let stats = record.pid.and_then(|pid| {
            let node = CgroupNode::at(self.runtime.cgroup_path(pid));
            metrics::collect(self.host, &node)
                .inspect_err(|e| tracing::debug!(id = %record.id, error = %e, "cgroup stats unavailable"))
                .ok()
        });
        Ok(ContainerStatus {
            record,
            alive,
            stats,
        })
    }

    /// Asks a container's init to shut down with `SIGTERM` and records
    /// it as stopped.
    ///
    /// A container without a live init is only marked stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or the signal cannot be
    /// delivered for a reason other than the process already being gone.
    pub fn stop(&self, prefix: &str) -> Result<ContainerRecord> {
        let mut record = self.store.find(prefix)?;
        match record.pid {
            Some(pid) if self.is_alive(pid) => {
                match self.host.signal(Pid::from_raw(pid), Signal::SIGTERM) {
                    Ok(()) => tracing::info!(id = %record.id, pid, "sent SIGTERM"),
                    Err(e) if e.raw_os_error() == Some(Errno::ESRCH as i32) => {
                        tracing::info!(id = %record.id, pid, "init already exited");
                    }
                    Err(e) => return Err(StockadeError::syscall("kill", e)),
                }
            }
            _ => tracing::info!(id = %record.id, "container already stopped"),
        }
        record.status = ContainerState::Stopped;
        self.store.save(&record)?;
        Ok(record)
    }

    /// Removes a stopped container's cgroup, overlay, and record.
    ///
    /// Cgroup and overlay cleanup failures are warnings; only the record
    /// removal is fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or still alive, or the
    /// record cannot be removed.
    pub fn remove(&self, prefix: &str) -> Result<ContainerId> {
        let record = self.store.find(prefix)?;
        if let Some(pid) = record.pid.filter(|&pid| self.is_alive(pid)) {
            return Err(StockadeError::Config {
                message: format!("container {} is still running (pid {pid}); stop it first", record.id),
            });
        }

        if let Some(pid) = record.pid {
            let node = CgroupNode::at(self.runtime.cgroup_path(pid));
            if let Err(e) = node.remove(self.host) {
                tracing::warn!(id = %record.id, error = %e, "could not remove cgroup");
            }
        }

        let paths = self.overlay_paths(&record);
        if let Err(e) = overlayfs::unmount_overlay(self.host, &paths.merged) {
            tracing::warn!(id = %record.id, error = %e, "could not unmount overlay");
        }
        for dir in [&paths.upper, &paths.work, &paths.merged] {
            if let Err(e) = self.host.remove_dir_all(dir) {
                tracing::warn!(path = %dir.display(), error = %e, "could not remove overlay directory");
            }
        }

        self.store.remove(&record.id)?;
        tracing::info!(id = %record.id, "container removed");
        Ok(record.id)
    }

    fn live_pid(&self, record: &ContainerRecord) -> Result<i32> {
        match record.pid {
            Some(pid) if record.status == ContainerState::Running && self.is_alive(pid) => Ok(pid),
            _ => Err(StockadeError::Config {
                message: format!("container {} is not running", record.id),
            }),
        }
    }
}
