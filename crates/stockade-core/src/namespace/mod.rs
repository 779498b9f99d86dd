//! Linux namespace kinds and sets.
//!
//! A container is created with a fixed [`NamespaceSet`] passed to
//! `clone(2)`; an attaching process later joins them one [`NamespaceKind`]
//! at a time through `/proc/<pid>/ns/<name>`.

pub mod user;
pub mod uts;

use std::fmt;
use std::path::Path;

use nix::sched::CloneFlags;
use stockade_common::error::{Result, StockadeError};

use crate::host::Host;

/// One namespace type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// Mount table.
    Mount,
    /// Hostname and domain name.
    Uts,
    /// System V IPC and POSIX message queues.
    Ipc,
    /// Network stack.
    Network,
    /// Process IDs.
    Pid,
    /// User and group IDs.
    User,
    /// Cgroup root view.
    Cgroup,
}

impl NamespaceKind {
    /// File name under `/proc/<pid>/ns`.
    #[must_use]
    pub const fn proc_name(self) -> &'static str {
        match self {
            Self::Mount => "mnt",
            Self::Uts => "uts",
            Self::Ipc => "ipc",
            Self::Network => "net",
            Self::Pid => "pid",
            Self::User => "user",
            Self::Cgroup => "cgroup",
        }
    }

    /// `CLONE_NEW*` flag, used both for `clone(2)` and as `setns(2)` type.
    #[must_use]
    pub const fn clone_flag(self) -> CloneFlags {
        match self {
            Self::Mount => CloneFlags::CLONE_NEWNS,
            Self::Uts => CloneFlags::CLONE_NEWUTS,
            Self::Ipc => CloneFlags::CLONE_NEWIPC,
            Self::Network => CloneFlags::CLONE_NEWNET,
            Self::Pid => CloneFlags::CLONE_NEWPID,
            Self::User => CloneFlags::CLONE_NEWUSER,
            Self::Cgroup => CloneFlags::CLONE_NEWCGROUP,
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proc_name())
    }
}

/// Set of namespaces a new container is created in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSet(Vec<NamespaceKind>);

impl NamespaceSet {
    /// The container set: UTS, PID, mount, user, and network.
    ///
    /// IPC and cgroup namespaces are not created, so an attaching process
    /// that joins them ends up in the host's.
    #[must_use]
    pub fn container() -> Self {
        Self(vec![
            NamespaceKind::Uts,
            NamespaceKind::Pid,
            NamespaceKind::Mount,
            NamespaceKind::User,
            NamespaceKind::Network,
        ])
    }

    /// Whether `kind` is in the set.
    #[must_use]
    pub fn contains(&self, kind: NamespaceKind) -> bool {
        self.0.contains(&kind)
    }

    /// Combined `clone(2)` flags.
    #[must_use]
    pub fn clone_flags(&self) -> CloneFlags {
        self.0
            .iter()
            .fold(CloneFlags::empty(), |acc, k| acc | k.clone_flag())
    }
}

/// Opens the namespace file at `path`.
///
/// # Errors
///
/// Returns [`StockadeError::Namespace`] if the file cannot be opened.
pub fn open<H: Host>(host: &H, path: &Path, kind: NamespaceKind) -> Result<H::Namespace> {
    host.open_namespace(path)
        .map_err(|source| StockadeError::Namespace {
            kind: kind.proc_name(),
            source,
        })
}

/// Joins an opened namespace via `setns(2)`.
///
/// # Errors
///
/// Returns [`StockadeError::Namespace`] if `setns(2)` fails.
pub fn enter<H: Host>(host: &H, ns: &H::Namespace, kind: NamespaceKind) -> Result<()> {
    host.enter_namespace(ns, kind.clone_flag())
        .map_err(|source| StockadeError::Namespace {
            kind: kind.proc_name(),
            source,
        })?;
    tracing::debug!(%kind, "joined namespace");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_set_excludes_ipc_and_cgroup() {
        let set = NamespaceSet::container();
        assert!(!set.contains(NamespaceKind::Ipc));
        assert!(!set.contains(NamespaceKind::Cgroup));
        assert_eq!(
            set.clone_flags(),
            CloneFlags::CLONE_NEWUTS
                | CloneFlags::CLONE_NEWPID
                | CloneFlags::CLONE_NEWNS
                | CloneFlags::CLONE_NEWUSER
                | CloneFlags::CLONE_NEWNET
        );
    }

    #[test]
    fn proc_names_match_kernel() {
        assert_eq!(NamespaceKind::Mount.proc_name(), "mnt");
        assert_eq!(NamespaceKind::Network.proc_name(), "net");
        assert_eq!(NamespaceKind::Cgroup.to_string(), "cgroup");
    }
}
