//! Root filesystem switching via `chroot(2)`.

use std::path::Path;

use stockade_common::error::{Result, StockadeError};

use crate::host::Host;

/// Changes the root directory to `new_root` and resets the working
/// directory to the new `/`.
///
/// Path resolution uses the mount table visible at call time, so the
/// caller must already be in the mount namespace that holds `new_root`.
///
/// # Errors
///
/// Returns an error if `chroot(2)` or `chdir(2)` fails.
pub fn enter_root<H: Host>(host: &H, new_root: &Path) -> Result<()> {
    host.chroot(new_root).map_err(|e| StockadeError::Io {
        path: new_root.to_path_buf(),
        source: e,
    })?;
    host.chdir(Path::new("/"))
        .map_err(|e| StockadeError::syscall("chdir to new root", e))?;
    tracing::info!(root = %new_root.display(), "root switched");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingHost};

    #[test]
    fn chroot_then_chdir_to_slash() {
        let host = RecordingHost::new();
        enter_root(&host, Path::new("/tmp/c1-merged")).unwrap();
        assert_eq!(
            host.calls(),
            vec![
                Call::Chroot("/tmp/c1-merged".into()),
                Call::Chdir("/".into()),
            ]
        );
    }

    #[test]
    fn chroot_failure_skips_chdir() {
        let host = RecordingHost::new();
        host.fail_when(|c| matches!(c, Call::Chroot(_)), nix::errno::Errno::ENOENT as i32);
        assert!(enter_root(&host, Path::new("/missing")).is_err());
        assert!(host.position(|c| matches!(c, Call::Chdir(_))).is_none());
    }
}
