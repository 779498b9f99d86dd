//! System-wide constants and default paths.
//!
//! These values only seed [`RuntimeConfig::default`](crate::config::RuntimeConfig);
//! components read their paths from the configuration they are handed.

/// Default directory holding the per-hostname overlay directories.
pub const DEFAULT_TEMP_ROOT: &str = "/tmp";

/// Default parent cgroup under which per-container nodes are created.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup/stockade";

/// Default procfs mount point on the host.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default base directory for persisted container records.
pub const DEFAULT_STATE_DIR: &str = "/var/lib/stockade";

/// Stack size handed to the cloned init process.
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// CFS bandwidth period written alongside every CPU quota (100ms).
pub const DEFAULT_CPU_PERIOD_US: u64 = 100_000;

/// Argument value meaning "do not constrain this resource".
pub const UNLIMITED_SENTINEL: &str = "none";

/// Controllers enabled on the parent cgroup's `cgroup.subtree_control`.
pub const SUBTREE_CONTROLLERS: &str = "+cpu +memory +io";

/// Name of the per-container record file inside its state directory.
pub const RECORD_FILE: &str = "config.json";

/// Number of UUID characters kept in a container id.
pub const CONTAINER_ID_LENGTH: usize = 12;

/// Prefix prepended to a container id to form its hostname.
pub const HOSTNAME_PREFIX: &str = "cont-";
