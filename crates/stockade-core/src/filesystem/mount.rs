//! Mount utilities used inside the container's mount namespace.

use std::path::Path;

use nix::mount::MsFlags;
use stockade_common::error::{Result, StockadeError};

use crate::host::Host;

/// Marks every mount reachable from `/` as private, recursively, so mount
/// events in the container never propagate back to the host.
///
/// # Errors
///
/// Returns an error if the remount is refused.
pub fn make_mounts_private<H: Host>(host: &H) -> Result<()> {
    let root = Path::new("/");
    host.mount(None, root, None, MsFlags::MS_PRIVATE | MsFlags::MS_REC, None)
        .map_err(|e| StockadeError::Mount {
            target: root.to_path_buf(),
            source: e,
        })?;
    tracing::debug!("mount propagation set to private");
    Ok(())
}

/// Mounts a fresh procfs at `/proc` of the current root.
///
/// Must run after the PID namespace's init exists and the UID/GID maps are
/// written, otherwise the new procfs reports the wrong ownership.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
pub fn mount_proc<H: Host>(host: &H) -> Result<()> {
    let target = Path::new("/proc");
    host.mount(Some("proc"), target, Some("proc"), MsFlags::empty(), None)
        .map_err(|e| StockadeError::Mount {
            target: target.to_path_buf(),
            source: e,
        })?;
    tracing::debug!("procfs mounted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingHost};

    #[test]
    fn private_remount_is_recursive() {
        let host = RecordingHost::new();
        make_mounts_private(&host).unwrap();
        assert_eq!(
            host.calls(),
            vec![Call::Mount {
                source: None,
                target: "/".into(),
                fstype: None,
                flags: MsFlags::MS_PRIVATE | MsFlags::MS_REC,
                data: None,
            }]
        );
    }

    #[test]
    fn proc_is_mounted_as_procfs() {
        let host = RecordingHost::new();
        mount_proc(&host).unwrap();
        assert!(matches!(
            &host.calls()[0],
            Call::Mount { fstype: Some(t), target, .. } if t == "proc" && target == Path::new("/proc")
        ));
    }
}
