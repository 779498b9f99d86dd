//! User namespace ID mapping.
//!
//! Maps the container's root to the invoking user on the host with a
//! single one-ID range, the smallest mapping an unprivileged parent may
//! write. Maps are immutable once written.

use std::fmt;
use std::path::Path;

use nix::unistd::Pid;
use stockade_common::error::Result;

use crate::host::Host;
use crate::writer::write_control_file;

/// One line of a `uid_map` or `gid_map` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    /// First ID inside the namespace.
    pub inside: u32,
    /// First ID on the host.
    pub outside: u32,
    /// Number of consecutive IDs mapped.
    pub count: u32,
}

impl IdMapping {
    /// Maps ID 0 in the namespace to `host_id`.
    #[must_use]
    pub const fn root_to(host_id: u32) -> Self {
        Self {
            inside: 0,
            outside: host_id,
            count: 1,
        }
    }
}

impl fmt::Display for IdMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.inside, self.outside, self.count)
    }
}

/// Writes the ID maps for the user namespace of `pid`.
///
/// `setgroups` is denied first because the kernel refuses an unprivileged
/// `gid_map` write while `setgroups(2)` is still allowed; `gid_map` then
/// `uid_map` follow.
///
/// # Errors
///
/// Returns an error if any of the three writes fails; a partially mapped
/// namespace must not be used.
pub fn map_root_to_host<H: Host>(host: &H, proc_root: &Path, pid: Pid) -> Result<()> {
    let (uid, gid) = host.host_ids();
    let proc_dir = proc_root.join(pid.to_string());

    write_control_file(host, &proc_dir.join("setgroups"), "deny")?;
    write_control_file(host, &proc_dir.join("gid_map"), &IdMapping::root_to(gid).to_string())?;
    write_control_file(host, &proc_dir.join("uid_map"), &IdMapping::root_to(uid).to_string())?;

    tracing::info!(%pid, uid, gid, "user namespace mapped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::testing::{Call, RecordingHost};

    #[test]
    fn mapping_line_format() {
        assert_eq!(IdMapping::root_to(1000).to_string(), "0 1000 1");
    }

    #[test]
    fn setgroups_denied_before_gid_then_uid_map() {
        let host = RecordingHost::new().with_ids(1001, 2002);
        map_root_to_host(&host, Path::new("/proc"), Pid::from_raw(77)).unwrap();
        assert_eq!(
            host.writes(),
            vec![
                (PathBuf::from("/proc/77/setgroups"), "deny".to_owned()),
                (PathBuf::from("/proc/77/gid_map"), "0 2002 1".to_owned()),
                (PathBuf::from("/proc/77/uid_map"), "0 1001 1".to_owned()),
            ]
        );
    }

    #[test]
    fn failed_setgroups_aborts_before_maps() {
        let host = RecordingHost::new();
        host.fail_when(
            |c| matches!(c, Call::Write { path, .. } if path.ends_with("setgroups")),
            nix::errno::Errno::EPERM as i32,
        );
        assert!(map_root_to_host(&host, Path::new("/proc"), Pid::from_raw(3)).is_err());
        assert_eq!(host.writes().len(), 1);
    }
}
