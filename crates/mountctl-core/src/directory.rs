//! Directory of mounts currently held by this process.
//!
//! Records are keyed by mount point and own the [`Teardown`] for their
//! mount. The directory is purely in-memory: anything still listed when the
//! process exits is orphaned.
//!
//! # Locking
//!
//! One exclusive lock guards the whole map. It is independent of the
//! [`BackendRegistry`](crate::BackendRegistry) lock and the two are never
//! held together. [`MountDirectory::teardown`] keeps the lock for the whole
//! duration of the unmount so nothing else can observe or replace the record
//! while it is being torn down.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::backend::Teardown;
use crate::error::ControlError;

/// A live mount owned by the directory
#[derive(Debug)]
pub struct ActiveMount {
    /// Where the source is mounted
    pub mount_point: PathBuf,
    /// Name of the backend that performed the mount
    pub backend: String,
    /// Name of the mounted source
    pub source_name: String,
    /// When the mount was created
    pub mounted_at: DateTime<Utc>,
    /// Unmount capability, consumed by a successful teardown
    pub teardown: Teardown,
}

impl ActiveMount {
    /// Build a record stamped with the current time
    pub fn new(
        mount_point: impl Into<PathBuf>,
        backend: impl Into<String>,
        source_name: impl Into<String>,
        teardown: Teardown,
    ) -> Self {
        Self {
            mount_point: mount_point.into(),
            backend: backend.into(),
            source_name: source_name.into(),
            mounted_at: Utc::now(),
            teardown,
        }
    }

    /// The externally visible fields of this record
    pub fn info(&self) -> MountInfo {
        MountInfo {
            mount_point: self.mount_point.clone(),
            source: self.source_name.clone(),
            mounted_on: self.mounted_at,
            backend: self.backend.clone(),
        }
    }
}

/// Snapshot of an active mount, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountInfo {
    /// Where the source is mounted
    pub mount_point: PathBuf,
    /// Name of the mounted source
    pub source: String,
    /// When the mount was created
    pub mounted_on: DateTime<Utc>,
    /// Backend used for the mount
    pub backend: String,
}

/// Thread-safe map of mount point to [`ActiveMount`]
#[derive(Debug, Default)]
pub struct MountDirectory {
    mounts: Mutex<HashMap<PathBuf, ActiveMount>>,
}

impl MountDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing whatever was recorded at the same path.
    ///
    /// The displaced record is returned so the caller can decide what to do
    /// with its teardown; dropping it leaves that mount orphaned.
    pub fn insert(&self, mount: ActiveMount) -> Option<ActiveMount> {
        self.mounts.lock().insert(mount.mount_point.clone(), mount)
    }

    /// Snapshot of the record at `mount_point`
    pub fn get(&self, mount_point: &Path) -> Option<MountInfo> {
        self.mounts.lock().get(mount_point).map(ActiveMount::info)
    }

    /// Whether a record exists at `mount_point`
    pub fn contains(&self, mount_point: &Path) -> bool {
        self.mounts.lock().contains_key(mount_point)
    }

    /// Remove and return the record at `mount_point` without tearing it down
    pub fn remove(&self, mount_point: &Path) -> Option<ActiveMount> {
        self.mounts.lock().remove(mount_point)
    }

    /// Snapshot of every record, in no particular order
    pub fn list(&self) -> Vec<MountInfo> {
        self.mounts.lock().values().map(ActiveMount::info).collect()
    }

    /// Mount points currently recorded, sorted
    pub fn mount_points(&self) -> Vec<PathBuf> {
        let mut points: Vec<PathBuf> = self.mounts.lock().keys().cloned().collect();
        points.sort();
        points
    }

    /// Number of active mounts
    pub fn len(&self) -> usize {
        self.mounts.lock().len()
    }

    /// Whether nothing is mounted
    pub fn is_empty(&self) -> bool {
        self.mounts.lock().is_empty()
    }

    /// Tear down the mount at `mount_point` while holding the directory lock.
    ///
    /// On success the record is removed and its snapshot returned. If the
    /// teardown fails the record stays in place so the unmount can be retried.
    ///
    /// # Errors
    ///
    /// - [`ControlError::NotFound`] if nothing is recorded at that path
    /// - [`ControlError::UnmountFailed`] with the teardown's own error
    pub fn teardown(&self, mount_point: &Path) -> Result<MountInfo, ControlError> {
        let mut mounts = self.mounts.lock();
        let mount = mounts
            .get_mut(mount_point)
            .ok_or_else(|| ControlError::NotFound(mount_point.to_path_buf()))?;

        mount.teardown.invoke().map_err(ControlError::UnmountFailed)?;

        let info = mount.info();
        mounts.remove(mount_point);
        Ok(info)
    }
}
