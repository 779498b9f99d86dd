//! Attaching to a running container.
//!
//! The joining process opens all of the target's namespace files up front,
//! then enters the mount namespace, switches to the container root, joins
//! the remaining namespaces, and finally the user namespace, before
//! replacing itself with the requested command.
//! Nothing here can be undone: a failure past the mount join leaves the
//! caller partially joined, and it is expected to exit.

use std::path::PathBuf;

use nix::unistd::Pid;
use stockade_common::config::RuntimeConfig;
use stockade_common::error::{Result, StockadeError};
use stockade_core::filesystem::root;
use stockade_core::host::Host;
use stockade_core::namespace::{self, NamespaceKind};

/// Namespaces joined after the root switch, in order. Each is optional.
const OPTIONAL_NAMESPACES: [NamespaceKind; 5] = [
    NamespaceKind::Ipc,
    NamespaceKind::Uts,
    NamespaceKind::Network,
    NamespaceKind::Pid,
    NamespaceKind::Cgroup,
];

/// What to attach to and what to run there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Host PID of the target process.
    pub pid: Pid,
    /// Directory to `chroot` into once inside the target mount namespace.
    pub root: PathBuf,
    /// Program and arguments to execute.
    pub command: Vec<String>,
}

/// Namespaces actually joined during an attach.
///
/// Only observable when [`Host::exec`] returns, i.e. against a fake host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    /// Joined namespaces, in join order.
    pub joined: Vec<NamespaceKind>,
    /// Optional namespaces whose files could not be opened.
    pub skipped: Vec<NamespaceKind>,
}

impl JoinReport {
    /// Whether the user namespace was joined.
    #[must_use]
    pub fn joined_user(&self) -> bool {
        self.joined.contains(&NamespaceKind::User)
    }
}

/// Joins the namespaces of `request.pid` and executes the command.
///
/// # Errors
///
/// Returns an error if the command is empty, the mount namespace cannot be
/// opened or joined, the root switch fails, an opened namespace cannot be
/// joined, or the command cannot be executed.
pub fn join<H: Host>(host: &H, runtime: &RuntimeConfig, request: &JoinRequest) -> Result<JoinReport> {
    if request.command.is_empty() {
        return Err(StockadeError::Config {
            message: "no command to execute".into(),
        });
    }

    let pid = request.pid.as_raw();
    let ns_path = |kind: NamespaceKind| runtime.proc_path(pid, &format!("ns/{}", kind.proc_name()));
    let mut report = JoinReport::default();

    // Every handle comes from the host procfs; after the root switch the
    // target's PID is no longer visible.
    let mnt = namespace::open(host, &ns_path(NamespaceKind::Mount), NamespaceKind::Mount)?;
    let mut optional = Vec::with_capacity(OPTIONAL_NAMESPACES.len());
    for kind in OPTIONAL_NAMESPACES {
        match namespace::open(host, &ns_path(kind), kind) {
            Ok(ns) => optional.push((kind, ns)),
            Err(e) => {
                tracing::warn!(%kind, error = %e, "namespace unavailable, skipping");
                report.skipped.push(kind);
            }
        }
    }
    let user = namespace::open(host, &ns_path(NamespaceKind::User), NamespaceKind::User).ok();

    namespace::enter(host, &mnt, NamespaceKind::Mount)?;
    report.joined.push(NamespaceKind::Mount);

    root::enter_root(host, &request.root)?;

    for (kind, ns) in &optional {
        namespace::enter(host, ns, *kind)?;
        report.joined.push(*kind);
    }

    // Last, since it drops the privilege needed to join the others.
    if let Some(user) = &user {
        namespace::enter(host, user, NamespaceKind::User)?;
        report.joined.push(NamespaceKind::User);
    }

    tracing::info!(%pid, command = ?request.command, "executing in container");
    host.exec(&request.command)
        .map_err(|e| StockadeError::syscall("execvp", e))?;
    Ok(report)
}
