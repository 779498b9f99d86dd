//! Process spawning inside new namespaces.
//!
//! Allocates the init's execution stack and clones the child into the
//! container's namespace set.

use nix::sched::CloneCb;
use nix::unistd::Pid;
use stockade_common::error::{Result, StockadeError};
use stockade_core::host::Host;
use stockade_core::namespace::NamespaceSet;

/// Heap-allocated stack for a cloned child.
///
/// Released when dropped. The child runs on its own copy of the address
/// space, so the parent may drop this as soon as the clone returns.
#[derive(Debug)]
pub struct ExecutionStack {
    memory: Vec<u8>,
}

impl ExecutionStack {
    /// Allocates a zeroed stack of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(StockadeError::Config {
                message: "execution stack size must be non-zero".into(),
            });
        }
        Ok(Self {
            memory: vec![0; size],
        })
    }
}

/// Clones `entry` into a child created in every namespace of `namespaces`.
///
/// Returns as soon as the child exists; it does not wait for it.
///
/// # Errors
///
/// Returns an error if `clone(2)` fails.
pub fn spawn_in_namespaces<H: Host>(
    host: &H,
    stack: &mut ExecutionStack,
    namespaces: &NamespaceSet,
    entry: CloneCb<'_>,
) -> Result<Pid> {
    let pid = host
        .spawn(&mut stack.memory, namespaces.clone_flags(), entry)
        .map_err(|e| StockadeError::syscall("clone", e))?;
    tracing::info!(%pid, "created child");
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockade_core::testing::{Call, RecordingHost};

    #[test]
    fn zero_sized_stack_is_rejected() {
        assert!(ExecutionStack::new(0).is_err());
    }

    #[test]
    fn spawn_uses_container_namespace_flags() {
        let host = RecordingHost::new();
        host.set_child_pid(31);
        let mut stack = ExecutionStack::new(4096).unwrap();
        let set = NamespaceSet::container();
        let pid = spawn_in_namespaces(&host, &mut stack, &set, Box::new(|| 0)).unwrap();
        assert_eq!(pid, Pid::from_raw(31));
        assert_eq!(host.calls(), vec![Call::Spawn(set.clone_flags())]);
    }
}
