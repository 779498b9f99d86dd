//! Top-level container launch.
//!
//! Builds the overlay root, prepares the cgroup parent, clones the init
//! into fresh namespaces, then performs the PID-dependent setup (cgroup
//! enrollment and ID maps) before releasing the init through the barrier.
//! The child keeps running after [`launch`] returns; this process is not
//! its supervisor.

use std::path::PathBuf;

use nix::unistd::Pid;
use stockade_common::config::{ContainerConfig, RuntimeConfig};
use stockade_common::error::{Result, StockadeError};
use stockade_core::cgroup::{CgroupController, CgroupNode};
use stockade_core::filesystem::overlayfs;
use stockade_core::host::Host;
use stockade_core::namespace::{NamespaceSet, user};
use stockade_core::sync;

use crate::init;
use crate::spawn::{ExecutionStack, spawn_in_namespaces};

/// A container whose init has been released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    /// Host PID of the container init.
    pub pid: Pid,
    /// Cgroup node the init is enrolled in.
    pub cgroup: CgroupNode,
    /// Mount point of the container's root.
    pub merged: PathBuf,
}

/// Launches `config` and returns once the init has been released.
///
/// On failure before the barrier is released, the overlay is unmounted
/// and the child (if any) sees the barrier close and exits. Directories
/// and cgroup nodes created so far are left in place.
///
/// # Errors
///
/// Returns [`StockadeError::RootfsMissing`] if the lower root does not
/// exist, or the error of the first setup step that fails.
pub fn launch<H: Host>(host: &H, runtime: &RuntimeConfig, config: &ContainerConfig) -> Result<Launched> {
    host.stat(&config.rootfs)
        .map_err(|source| StockadeError::RootfsMissing {
            path: config.rootfs.clone(),
            source,
        })?;

    let overlay = overlayfs::mount_overlay(host, &config.rootfs, &config.overlay)?;

    let cgroups = CgroupController::new(runtime);
    cgroups.prepare(host)?;

    let (receiver, sender) = sync::channel()?;
    let sender_fd = sender.raw_fd();
    let mut stack = ExecutionStack::new(runtime.stack_size)?;

    // The child takes its copy of the receive half; the parent's copy stays
    // open until the barrier is released.
    let mut receiver = Some(receiver);
    let entry = Box::new(|| {
        receiver
            .take()
            .map_or(1, |rx| init::run_child(host, config, rx, sender_fd))
    });
    let pid = spawn_in_namespaces(host, &mut stack, &NamespaceSet::container(), entry)?;
    drop(stack);

    let cgroup = cgroups.attach(host, pid, &config.limits)?;
    user::map_root_to_host(host, &runtime.proc_root, pid)?;
    sender.release(host)?;
    drop(receiver);

    let merged = overlay.keep();
    tracing::info!(%pid, hostname = %config.hostname, "container launched");
    Ok(Launched { pid, cgroup, merged })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use nix::mount::MsFlags;
    use stockade_common::types::{ResourceLimit, ResourceLimits};
    use stockade_core::testing::{Call, RecordingHost};

    use super::*;

    const ROOTFS: &str = "/var/lib/images/base";

    fn runtime() -> RuntimeConfig {
        RuntimeConfig {
            cgroup_root: PathBuf::from("/cg"),
            stack_size: 64 * 1024,
            ..RuntimeConfig::default()
        }
    }

    fn config(memory: &str, cpu: &str) -> ContainerConfig {
        let rt = runtime();
        ContainerConfig::new(
            &rt,
            "c1",
            ROOTFS,
            ResourceLimits {
                memory: rt.parse_limit(memory),
                cpu_quota: rt.parse_limit(cpu),
            },
            Vec::new(),
        )
    }

    fn host() -> RecordingHost {
        let host = RecordingHost::new().with_ids(1000, 1001);
        host.add_path(ROOTFS);
        host
    }

    #[test]
    fn limited_container_writes_limits_and_mounts_overlay() {
        let host = host();
        let launched = launch(&host, &runtime(), &config("256M", "50000")).unwrap();

        assert_eq!(launched.pid, Pid::from_raw(4242));
        assert_eq!(launched.merged, PathBuf::from("/tmp/c1-merged"));
        assert_eq!(launched.cgroup.path(), Path::new("/cg/4242"));

        let writes = host.writes();
        assert!(writes.contains(&(PathBuf::from("/cg/4242/memory.max"), "256M".into())));
        assert!(writes.contains(&(PathBuf::from("/cg/4242/cpu.max"), "50000 100000".into())));
        assert!(host
            .position(|c| matches!(c, Call::Mount { target, fstype: Some(t), data: Some(d), .. }
                if target == Path::new("/tmp/c1-merged") && t == "overlay"
                    && d == "lowerdir=/var/lib/images/base,upperdir=/tmp/c1-upper,workdir=/tmp/c1-work"))
            .is_some());
        assert!(host.position(|c| matches!(c, Call::Unmount(_))).is_none());
    }

    #[test]
    fn unlimited_container_only_enrolls() {
        let host = host();
        let _ = launch(&host, &runtime(), &config("none", "none")).unwrap();

        let writes = host.writes();
        assert!(writes.iter().all(|(p, _)| !p.ends_with("memory.max") && !p.ends_with("cpu.max")));
        assert!(writes.contains(&(PathBuf::from("/cg/4242/cgroup.procs"), "4242".into())));
        assert!(host
            .position(|c| matches!(c, Call::CreateDir(p) if p == Path::new("/cg/4242")))
            .is_some());
    }

    #[test]
    fn full_write_sequence_precedes_barrier() {
        let host = host();
        let _ = launch(&host, &runtime(), &config("256M", "50000")).unwrap();

        let calls = host.calls();
        let barrier = host.position(|c| matches!(c, Call::PipeWrite)).unwrap();
        assert!(calls[barrier + 1..].iter().all(|c| !matches!(c, Call::Write { .. })));

        assert_eq!(
            host.writes(),
            vec![
                (PathBuf::from("/cg/cgroup.subtree_control"), "+cpu +memory +io".into()),
                (PathBuf::from("/cg/4242/cgroup.procs"), "4242".into()),
                (PathBuf::from("/cg/4242/memory.max"), "256M".into()),
                (PathBuf::from("/cg/4242/cpu.max"), "50000 100000".into()),
                (PathBuf::from("/proc/4242/setgroups"), "deny".into()),
                (PathBuf::from("/proc/4242/gid_map"), "0 1001 1".into()),
                (PathBuf::from("/proc/4242/uid_map"), "0 1000 1".into()),
            ]
        );
    }

    #[test]
    fn controllers_enabled_before_spawn() {
        let host = host();
        let _ = launch(&host, &runtime(), &config("none", "none")).unwrap();
        let subtree = host
            .position(|c| matches!(c, Call::Write { path, .. } if path.ends_with("cgroup.subtree_control")))
            .unwrap();
        let spawn = host.position(|c| matches!(c, Call::Spawn(_))).unwrap();
        let overlay = host
            .position(|c| matches!(c, Call::Mount { fstype: Some(t), .. } if t == "overlay"))
            .unwrap();
        assert!(overlay < subtree && subtree < spawn);
    }

    #[test]
    fn missing_rootfs_touches_nothing() {
        let host = RecordingHost::new();
        let err = launch(&host, &runtime(), &config("none", "none")).unwrap_err();
        assert!(matches!(err, StockadeError::RootfsMissing { .. }));
        assert_eq!(host.calls(), vec![Call::Stat(PathBuf::from(ROOTFS))]);
    }

    #[test]
    fn failed_map_write_releases_overlay_and_withholds_barrier() {
        let host = host();
        host.fail_when(
            |c| matches!(c, Call::Write { path, .. } if path.ends_with("uid_map")),
            nix::errno::Errno::EPERM as i32,
        );
        assert!(launch(&host, &runtime(), &config("none", "none")).is_err());
        assert!(host.position(|c| matches!(c, Call::PipeWrite)).is_none());
        assert!(host
            .position(|c| matches!(c, Call::Unmount(p) if p == Path::new("/tmp/c1-merged")))
            .is_some());
    }

    #[test]
    fn failed_enrollment_aborts_before_mapping() {
        let host = host();
        host.fail_when(
            |c| matches!(c, Call::Write { path, .. } if path.ends_with("cgroup.procs")),
            nix::errno::Errno::EACCES as i32,
        );
        assert!(launch(&host, &runtime(), &config("256M", "none")).is_err());
        assert!(host.writes().iter().all(|(p, _)| !p.starts_with("/proc")));
        assert!(host.position(|c| matches!(c, Call::PipeWrite)).is_none());
    }

    #[test]
    fn spawn_flags_cover_container_namespaces() {
        let host = host();
        let _ = launch(&host, &runtime(), &config("none", "none")).unwrap();
        assert!(host
            .position(|c| matches!(c, Call::Spawn(f) if *f == NamespaceSet::container().clone_flags()))
            .is_some());
        assert!(host
            .position(|c| matches!(c, Call::Mount { flags, .. } if flags.contains(MsFlags::MS_PRIVATE)))
            .is_none());
    }

    #[test]
    fn custom_unlimited_sentinel_is_honoured() {
        let host = host();
        let rt = RuntimeConfig {
            unlimited_sentinel: "unlimited".into(),
            ..runtime()
        };
        let cfg = ContainerConfig::new(
            &rt,
            "c1",
            ROOTFS,
            ResourceLimits {
                memory: rt.parse_limit("unlimited"),
                cpu_quota: ResourceLimit::Value("20000".into()),
            },
            Vec::new(),
        );
        let _ = launch(&host, &rt, &cfg).unwrap();
        assert!(host.writes().iter().all(|(p, _)| !p.ends_with("memory.max")));
        assert!(host.writes().contains(&(PathBuf::from("/cg/4242/cpu.max"), "20000 100000".into())));
    }
}
