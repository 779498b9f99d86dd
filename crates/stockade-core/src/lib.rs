//! # stockade-core
//!
//! Low-level Linux isolation primitives for the Stockade runtime.
//!
//! This crate provides safe abstractions over:
//! - **Host**: the OS boundary every privileged call goes through.
//! - **Cgroups v2**: per-container nodes with CPU and memory limits.
//! - **Filesystem**: the `OverlayFS` root, mount privacy, `/proc`, `chroot`.
//! - **Namespaces**: kinds, the container set, UID/GID mapping, hostname.
//! - **Sync**: the one-byte barrier between orchestrator and init.
//!
//! All unsafe system calls are encapsulated in [`host::LinuxHost`] with
//! `// SAFETY:` documentation.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod host;
pub mod namespace;
pub mod sync;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod writer;
