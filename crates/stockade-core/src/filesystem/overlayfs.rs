//! `OverlayFS` management for the container root.
//!
//! Stacks the immutable lower rootfs under a per-hostname writable upper
//! layer, so every write made inside the container lands in `upper` and
//! the lower image is never modified.

use std::io;
use std::path::{Path, PathBuf};

use nix::mount::MsFlags;
use stockade_common::config::OverlayPaths;
use stockade_common::error::{Result, StockadeError};

use crate::host::Host;

/// Creates the merged, upper, and work directories.
///
/// Directories that already exist are accepted, so preparing the same
/// hostname twice is harmless.
///
/// # Errors
///
/// Returns [`StockadeError::Io`] for any creation failure other than
/// "already exists".
pub fn prepare_dirs<H: Host>(host: &H, paths: &OverlayPaths) -> Result<()> {
    for dir in paths.dirs() {
        match host.create_dir(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %dir.display(), "overlay directory already present");
            }
            Err(e) => return Err(StockadeError::io(dir, e)),
        }
    }
    Ok(())
}

/// Builds the `lowerdir=…,upperdir=…,workdir=…` option string.
#[must_use]
pub fn overlay_options(lower: &Path, paths: &OverlayPaths) -> String {
    format!(
        "lowerdir={},upperdir={},workdir={}",
        lower.display(),
        paths.upper.display(),
        paths.work.display()
    )
}

/// Prepares the directories and mounts the union of `lower` and `upper`
/// onto `merged`.
///
/// The returned guard unmounts on drop unless [`OverlayMount::keep`] is
/// called, so a launch that fails after this point leaves no mount behind.
///
/// # Errors
///
/// Returns an error if directory creation fails or the mount is refused.
pub fn mount_overlay<'h, H: Host>(
    host: &'h H,
    lower: &Path,
    paths: &OverlayPaths,
) -> Result<OverlayMount<'h, H>> {
    prepare_dirs(host, paths)?;

    let opts = overlay_options(lower, paths);
    tracing::info!(options = %opts, "mounting overlayfs");
    host.mount(
        Some("overlay"),
        &paths.merged,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| StockadeError::Mount {
        target: paths.merged.clone(),
        source: e,
    })?;

    tracing::info!(merged = %paths.merged.display(), "overlayfs mounted");
    Ok(OverlayMount {
        host,
        merged: paths.merged.clone(),
        armed: true,
    })
}

/// Unmounts an `OverlayFS` at the given path.
///
/// Uses `MNT_DETACH` to lazily detach the filesystem.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
pub fn unmount_overlay<H: Host>(host: &H, merged: &Path) -> Result<()> {
    host.unmount(merged).map_err(|e| StockadeError::Mount {
        target: merged.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %merged.display(), "overlayfs unmounted");
    Ok(())
}

/// Scoped handle to a mounted overlay.
#[derive(Debug)]
pub struct OverlayMount<'h, H: Host> {
    host: &'h H,
    merged: PathBuf,
    armed: bool,
}

impl<H: Host> OverlayMount<'_, H> {
    /// Leaves the overlay mounted past this handle, for a container that
    /// launched successfully.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.merged)
    }
}

impl<H: Host> Drop for OverlayMount<'_, H> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = unmount_overlay(self.host, &self.merged) {
                tracing::warn!(error = %e, "failed to release overlay mount");
            }
        }
    }
}
