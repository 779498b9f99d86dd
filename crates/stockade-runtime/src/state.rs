//! Persistent state management.
//!
//! Each container owns a directory under the state root holding a single
//! JSON record. There is no daemon; every command reads and rewrites the
//! records it touches.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockade_common::config::{ContainerConfig, RuntimeConfig};
use stockade_common::constants::RECORD_FILE;
use stockade_common::error::{Result, StockadeError};
use stockade_common::types::{ContainerId, ContainerState, ResourceLimit, ResourceLimits};

/// Persistent record of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Container identifier.
    pub id: ContainerId,
    /// Hostname inside the container; also keys the overlay directories.
    pub hostname: String,
    /// Lower root filesystem.
    pub rootfs: PathBuf,
    /// Requested `memory.max`.
    pub memory_limit: ResourceLimit,
    /// Requested CPU quota per period.
    pub cpu_quota: ResourceLimit,
    /// Current lifecycle state.
    pub status: ContainerState,
    /// Host PID of the init process, once launched.
    pub pid: Option<i32>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ContainerRecord {
    /// A fresh record in the `creating` state.
    #[must_use]
    pub fn new(id: ContainerId, rootfs: impl Into<PathBuf>, limits: ResourceLimits) -> Self {
        Self {
            hostname: id.hostname(),
            id,
            rootfs: rootfs.into(),
            memory_limit: limits.memory,
            cpu_quota: limits.cpu_quota,
            status: ContainerState::Creating,
            pid: None,
            created_at: Utc::now(),
        }
    }

    /// The recorded limits.
    #[must_use]
    pub fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            memory: self.memory_limit.clone(),
            cpu_quota: self.cpu_quota.clone(),
        }
    }

    /// Launch configuration for this record.
    #[must_use]
    pub fn container_config(&self, runtime: &RuntimeConfig) -> ContainerConfig {
        ContainerConfig::new(runtime, &self.hostname, &self.rootfs, self.limits(), Vec::new())
    }
}

/// Directory of container records.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Opens the store rooted at `root`; nothing is created until the
    /// first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_dir(&self, id: &ContainerId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Writes `record` atomically (temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub fn save(&self, record: &ContainerRecord) -> Result<()> {
        let dir = self.record_dir(&record.id);
        std::fs::create_dir_all(&dir).map_err(|e| StockadeError::io(&dir, e))?;

        let path = dir.join(RECORD_FILE);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&tmp, json).map_err(|e| StockadeError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StockadeError::io(&path, e))?;

        tracing::debug!(id = %record.id, status = %record.status, "saved container record");
        Ok(())
    }

    /// Loads the record for an exact id.
    ///
    /// # Errors
    ///
    /// Returns [`StockadeError::NotFound`] if no record exists, or an
    /// error if it cannot be read or parsed.
    pub fn load(&self, id: &ContainerId) -> Result<ContainerRecord> {
        let path = self.record_dir(id).join(RECORD_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StockadeError::NotFound {
                    kind: "container",
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(StockadeError::io(path, e)),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Every readable record, ordered by creation time.
    ///
    /// Directories without a parsable record are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory exists but cannot be listed.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StockadeError::io(&self.root, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StockadeError::io(&self.root, e))?;
            let id = ContainerId::new(entry.file_name().to_string_lossy());
            match self.load(&id) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(%id, error = %e, "skipping unreadable container record"),
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Resolves a unique id prefix to its record.
    ///
    /// # Errors
    ///
    /// Returns [`StockadeError::NotFound`] if nothing matches and
    /// [`StockadeError::Config`] if the prefix is ambiguous.
    pub fn find(&self, prefix: &str) -> Result<ContainerRecord> {
        let mut matches: Vec<_> = self
            .list()?
            .into_iter()
            .filter(|r| r.id.as_str().starts_with(prefix))
            .collect();
        match matches.len() {
            0 => Err(StockadeError::NotFound {
                kind: "container",
                id: prefix.to_owned(),
            }),
            1 => Ok(matches.remove(0)),
            n => Err(StockadeError::Config {
                message: format!("id prefix '{prefix}' matches {n} containers"),
            }),
        }
    }

    /// Deletes the record directory of `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed.
    pub fn remove(&self, id: &ContainerId) -> Result<()> {
        let dir = self.record_dir(id);
        std::fs::remove_dir_all(&dir).map_err(|e| StockadeError::io(&dir, e))?;
        tracing::debug!(%id, "removed container record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ContainerRecord {
        ContainerRecord::new(
            ContainerId::new(id),
            "/images/base",
            ResourceLimits {
                memory: ResourceLimit::Value("256M".into()),
                cpu_quota: ResourceLimit::Unlimited,
            },
        )
    }

    #[test]
    fn new_record_is_creating_with_prefixed_hostname() {
        let r = record("abc123def456");
        assert_eq!(r.status, ContainerState::Creating);
        assert_eq!(r.hostname, "cont-abc123def456");
        assert!(r.pid.is_none());
    }

    #[test]
    fn save_then_load_preserves_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let mut r = record("abc123def456");
        r.status = ContainerState::Running;
        r.pid = Some(4242);
        store.save(&r).unwrap();

        assert!(dir.path().join("abc123def456/config.json").is_file());
        assert!(!dir.path().join("abc123def456/config.json.tmp").exists());
        assert_eq!(store.load(&r.id).unwrap(), r);
    }

    #[test]
    fn record_json_uses_lowercase_status() {
        let json = serde_json::to_string(&record("abc")).unwrap();
        assert!(json.contains("\"status\":\"creating\""));
    }

    #[test]
    fn missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = StateStore::new(dir.path())
            .load(&ContainerId::new("nope"))
            .unwrap_err();
        assert!(matches!(err, StockadeError::NotFound { .. }));
    }

    #[test]
    fn list_of_absent_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StateStore::new(dir.path().join("missing")).list().unwrap().is_empty());
    }

    #[test]
    fn list_skips_directories_without_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&record("aaa111")).unwrap();
        std::fs::create_dir(dir.path().join("stray")).unwrap();
        let ids: Vec<_> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![ContainerId::new("aaa111")]);
    }

    #[test]
    fn find_resolves_unique_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&record("aaa111")).unwrap();
        store.save(&record("bbb222")).unwrap();
        assert_eq!(store.find("bb").unwrap().id.as_str(), "bbb222");
    }

    #[test]
    fn find_rejects_ambiguous_and_unknown_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&record("abc111")).unwrap();
        store.save(&record("abc222")).unwrap();
        assert!(matches!(store.find("abc"), Err(StockadeError::Config { .. })));
        assert!(matches!(store.find("zzz"), Err(StockadeError::NotFound { .. })));
    }

    #[test]
    fn remove_deletes_record_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let r = record("abc111");
        store.save(&r).unwrap();
        store.remove(&r.id).unwrap();
        assert!(!dir.path().join("abc111").exists());
    }
}
