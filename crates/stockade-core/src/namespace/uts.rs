//! UTS namespace isolation.
//!
//! Allows the container to have its own hostname.

use stockade_common::error::{Result, StockadeError};

use crate::host::Host;

/// Sets the hostname inside the UTS namespace.
///
/// # Errors
///
/// Returns an error if `sethostname(2)` fails.
pub fn set_hostname<H: Host>(host: &H, hostname: &str) -> Result<()> {
    host.set_hostname(hostname)
        .map_err(|e| StockadeError::syscall("sethostname", e))?;
    tracing::debug!(hostname, "container hostname set");
    Ok(())
}
