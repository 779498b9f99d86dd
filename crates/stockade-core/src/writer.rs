//! Scoped writes to single kernel pseudo-files.
//!
//! Cgroup control files, `uid_map`/`gid_map`, and `setgroups` all accept a
//! complete value in one `write(2)`; any failure is fatal to the caller.

use std::path::Path;

use stockade_common::error::{Result, StockadeError};

use crate::host::Host;

/// Writes `value` to the pseudo-file at `path`.
///
/// # Errors
///
/// Returns [`StockadeError::Io`] naming `path` if the file cannot be opened
/// or the value is not accepted.
pub fn write_control_file<H: Host>(host: &H, path: &Path, value: &str) -> Result<()> {
    host.write_file(path, value)
        .map_err(|e| StockadeError::io(path, e))?;
    tracing::debug!(path = %path.display(), value, "control file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LinuxHost;

    #[test]
    fn writes_value_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.max");
        write_control_file(&LinuxHost, &path, "256M").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "256M");
    }

    #[test]
    fn missing_parent_is_an_io_error_naming_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("cgroup.procs");
        let err = write_control_file(&LinuxHost, &path, "1").unwrap_err();
        assert!(matches!(err, StockadeError::Io { ref path, .. } if path.ends_with("cgroup.procs")));
    }
}
