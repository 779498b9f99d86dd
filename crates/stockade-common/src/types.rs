//! Domain primitive types used across the Stockade workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CONTAINER_ID_LENGTH, HOSTNAME_PREFIX};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random, 12-character container ID.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(CONTAINER_ID_LENGTH);
        Self(id)
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hostname given to the container's UTS namespace.
    #[must_use]
    pub fn hostname(&self) -> String {
        format!("{HOSTNAME_PREFIX}{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cgroup limit: either a literal value the kernel accepts or
/// "leave the control file alone".
///
/// `Unlimited` is not the same as writing `max`: the control file is never
/// touched, so whatever the kernel default is stays in effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceLimit {
    /// Skip writing the control file.
    Unlimited,
    /// Write this literal value.
    Value(String),
}

impl ResourceLimit {
    /// Parses a command-line value, mapping `sentinel` to [`Self::Unlimited`].
    #[must_use]
    pub fn parse(raw: &str, sentinel: &str) -> Self {
        if raw == sentinel {
            Self::Unlimited
        } else {
            Self::Value(raw.to_owned())
        }
    }

    /// Returns the literal value, or `None` when unlimited.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Unlimited => None,
            Self::Value(v) => Some(v),
        }
    }
}

/// Resource limits requested for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Value for `memory.max`.
    pub memory: ResourceLimit,
    /// Quota (microseconds per period) for `cpu.max`.
    pub cpu_quota: ResourceLimit,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory: ResourceLimit::Unlimited,
            cpu_quota: ResourceLimit::Unlimited,
        }
    }
}

/// Lifecycle state of a container, as persisted in its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Record written, launch in progress.
    Creating,
    /// Init process is alive.
    Running,
    /// Init process has exited or was signalled.
    Stopped,
    /// Launch failed.
    Failed,
}

impl ContainerState {
    /// Whether `start` may relaunch a container in this state.
    #[must_use]
    pub const fn is_startable(self) -> bool {
        matches!(self, Self::Creating | Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "creating"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_parses_as_unlimited() {
        assert_eq!(ResourceLimit::parse("none", "none"), ResourceLimit::Unlimited);
    }

    #[test]
    fn literal_max_is_a_value_not_unlimited() {
        assert_eq!(
            ResourceLimit::parse("max", "none"),
            ResourceLimit::Value("max".into())
        );
    }

    #[test]
    fn generated_id_is_twelve_hex_chars() {
        let id = ContainerId::generate();
        assert_eq!(id.as_str().len(), 12);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hostname_is_prefixed_id() {
        assert_eq!(ContainerId::new("abc123").hostname(), "cont-abc123");
    }

    #[test]
    fn running_container_is_not_startable() {
        assert!(!ContainerState::Running.is_startable());
        assert!(ContainerState::Failed.is_startable());
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&ContainerState::Stopped).unwrap();
        assert_eq!(json, "\"stopped\"");
    }
}
