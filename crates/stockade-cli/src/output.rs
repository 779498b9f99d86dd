//! Formatted output helpers for CLI commands.

/// Formats a MiB quantity with two decimals (e.g., "12.50 MiB").
#[must_use]
pub fn format_mib(mib: f64) -> String {
    format!("{mib:.2} MiB")
}

/// Formats an optional PID, using `-` when absent.
#[must_use]
pub fn format_pid(pid: Option<i32>) -> String {
    pid.map_or_else(|| "-".to_owned(), |p| p.to_string())
}
