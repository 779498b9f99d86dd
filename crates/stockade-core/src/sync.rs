//! One-byte pipe handshake between the orchestrator and the cloned init.
//!
//! The parent can only write `uid_map` and enroll the cgroup once it knows
//! the child's PID, yet the child must not mount `/proc` or `chroot` until
//! those writes are done. The child therefore blocks on [`BarrierReceiver::wait`]
//! right after spawn, and the parent calls [`BarrierSender::release`] once
//! all PID-dependent setup has succeeded.
//!
//! There is no timeout: a parent that dies before releasing leaves the
//! child blocked until the pipe's last write end closes.

use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};

use nix::fcntl::OFlag;
use stockade_common::error::{Result, StockadeError};

use crate::host::Host;

const RELEASE_BYTE: [u8; 1] = [0];

/// Creates a connected barrier pair.
///
/// # Errors
///
/// Returns an error if `pipe2(2)` fails.
pub fn channel() -> Result<(BarrierReceiver, BarrierSender)> {
    let (read, write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)
        .map_err(|e| StockadeError::syscall("pipe", e.into()))?;
    Ok((
        BarrierReceiver {
            pipe: File::from(read),
        },
        BarrierSender {
            pipe: File::from(write),
        },
    ))
}

/// Receive half, owned by the init process.
#[derive(Debug)]
pub struct BarrierReceiver {
    pipe: File,
}

impl BarrierReceiver {
    /// Blocks until the parent releases the barrier.
    ///
    /// # Errors
    ///
    /// Returns [`StockadeError::Barrier`] if the pipe reaches end-of-file
    /// (the parent went away without finishing setup) or the read fails.
    /// Neither case is retried.
    pub fn wait<H: Host>(self, host: &H) -> Result<()> {
        let mut byte = [0u8; 1];
        match host.read_pipe(&self.pipe, &mut byte) {
            Ok(1) => {
                tracing::debug!("barrier passed");
                Ok(())
            }
            Ok(_) => Err(StockadeError::Barrier {
                message: "parent exited before completing setup".into(),
            }),
            Err(e) => Err(StockadeError::Barrier {
                message: format!("read failed: {e}"),
            }),
        }
    }
}

/// Send half, owned by the orchestrator.
#[derive(Debug)]
pub struct BarrierSender {
    pipe: File,
}

impl BarrierSender {
    /// Descriptor number of this half, as inherited by a cloned child.
    #[must_use]
    pub fn raw_fd(&self) -> RawFd {
        self.pipe.as_raw_fd()
    }

    /// Lets the child proceed. Consumes the sender, so the byte is
    /// written at most once; the pipe closes on return.
    ///
    /// # Errors
    ///
    /// Returns [`StockadeError::Barrier`] if the byte cannot be written.
    pub fn release<H: Host>(self, host: &H) -> Result<()> {
        match host.write_pipe(&self.pipe, &RELEASE_BYTE) {
            Ok(1) => {
                tracing::info!("setup barrier released");
                Ok(())
            }
            Ok(n) => Err(StockadeError::Barrier {
                message: format!("short write of {n} bytes"),
            }),
            Err(e) => Err(StockadeError::Barrier {
                message: format!("write failed: {e}"),
            }),
        }
    }
}

/// Closes the copy of the send half a cloned child inherits, so the
/// child's read sees end-of-file once the parent's copy is gone.
///
/// Only call this in the child, on a descriptor obtained from
/// [`BarrierSender::raw_fd`] before the clone; the child's copy of the
/// owning [`BarrierSender`] is never dropped.
///
/// # Errors
///
/// Returns an error if `close(2)` fails.
pub fn close_inherited(fd: RawFd) -> Result<()> {
    nix::unistd::close(fd).map_err(|e| StockadeError::syscall("close inherited barrier end", e.into()))
}
