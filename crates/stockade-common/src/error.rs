//! Unified error types for the Stockade workspace.
//!
//! Every fatal condition surfaces as a [`StockadeError`] and is propagated
//! to the binary entry point, which alone decides the process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StockadeError {
    /// A filesystem operation on a specific path failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A system call that is not tied to a single path failed.
    #[error("{op} failed: {source}")]
    Syscall {
        /// Name of the failing operation.
        op: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A `mount(2)` or `umount2(2)` call failed.
    #[error("mount at {target} failed: {source}")]
    Mount {
        /// Mount point being operated on.
        target: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The lower root filesystem does not exist or cannot be inspected.
    #[error("rootfs {path} is not accessible: {source}")]
    RootfsMissing {
        /// Requested rootfs path.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Opening or joining a namespace failed.
    #[error("{kind} namespace: {source}")]
    Namespace {
        /// Namespace kind, as named under `/proc/<pid>/ns`.
        kind: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The parent/child setup handshake broke.
    #[error("setup barrier: {message}")]
    Barrier {
        /// Description of the failure.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl StockadeError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps an OS error with the name of the failing operation.
    pub fn syscall(op: &'static str, source: std::io::Error) -> Self {
        Self::Syscall { op, source }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StockadeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = StockadeError::io(
            "/sys/fs/cgroup/x/cgroup.procs",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("/sys/fs/cgroup/x/cgroup.procs"));
    }

    #[test]
    fn syscall_error_names_the_operation() {
        let err = StockadeError::syscall("chroot", std::io::Error::from_raw_os_error(2));
        assert!(err.to_string().starts_with("chroot failed"));
    }
}
