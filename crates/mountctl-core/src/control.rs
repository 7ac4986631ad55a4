//! The four mount control operations.
//!
//! [`MountControl`] owns nothing global: the backend registry, the active
//! mount directory and the source resolver are injected at construction and
//! shared via `Arc`, so one process can run several independent control
//! planes (tests do).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

use crate::backend::SourceResolver;
use crate::config::ControlConfig;
use crate::directory::{ActiveMount, MountDirectory, MountInfo};
use crate::error::ControlError;
use crate::registry::BackendRegistry;

/// Parameters of a create-mount request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Source identifier, passed to the [`SourceResolver`]
    pub source: String,
    /// Where to mount
    pub mount_point: PathBuf,
    /// Backend to use; `None` or empty selects by priority
    pub backend: Option<String>,
}

impl MountRequest {
    /// Request using the priority-selected backend
    pub fn new(source: impl Into<String>, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            mount_point: mount_point.into(),
            backend: None,
        }
    }

    /// Request a specific backend
    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
}

/// Outcome of one unmount performed by [`MountControl::remove_all`]
#[derive(Debug)]
pub struct UnmountResult {
    /// Mount point that was torn down (or attempted)
    pub mount_point: PathBuf,
    /// What happened
    pub result: Result<(), ControlError>,
}

/// Control plane over a backend registry and an active mount directory
pub struct MountControl {
    backends: Arc<BackendRegistry>,
    mounts: Arc<MountDirectory>,
    resolver: Arc<dyn SourceResolver>,
    config: ControlConfig,
}

impl MountControl {
    /// Build a control plane with default configuration
    pub fn new(
        backends: Arc<BackendRegistry>,
        mounts: Arc<MountDirectory>,
        resolver: Arc<dyn SourceResolver>,
    ) -> Self {
        Self::with_config(backends, mounts, resolver, ControlConfig::default())
    }

    /// Build a control plane with explicit configuration
    pub fn with_config(
        backends: Arc<BackendRegistry>,
        mounts: Arc<MountDirectory>,
        resolver: Arc<dyn SourceResolver>,
        config: ControlConfig,
    ) -> Self {
        Self {
            backends,
            mounts,
            resolver,
            config,
        }
    }

    /// The backend registry this control plane reads
    pub fn backends(&self) -> &Arc<BackendRegistry> {
        &self.backends
    }

    /// The active mount directory this control plane mutates
    pub fn mounts(&self) -> &Arc<MountDirectory> {
        &self.mounts
    }

    /// Active configuration
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Name of the backend a request would use.
    ///
    /// An explicit, non-empty name is returned as-is (registered or not).
    /// Otherwise the first registered entry of the priority list is chosen;
    /// if none is registered the result is an empty string, which no lookup
    /// will ever match.
    pub fn select_backend(&self, requested: Option<&str>) -> String {
        match requested {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .backends
                .first_registered(&self.config.backend_priority)
                .unwrap_or_default(),
        }
    }

    /// Mount a source.
    ///
    /// The record is only added to the directory once the backend has
    /// reported success; a failed mount leaves the directory untouched.
    ///
    /// # Errors
    ///
    /// - [`ControlError::MissingParameter`] for an empty source or mount point
    /// - [`ControlError::SourceResolutionFailed`] from the resolver, unchanged
    /// - [`ControlError::InvalidBackend`] if the selected backend is unknown
    /// - [`ControlError::MountFailed`] with the backend's own error
    #[instrument(
        level = "info",
        name = "control::create_mount",
        skip_all,
        fields(source = %request.source, mount_point = %request.mount_point.display())
    )]
    pub fn create_mount(&self, request: &MountRequest) -> Result<(), ControlError> {
        if request.source.is_empty() {
            return Err(ControlError::MissingParameter("source".into()));
        }
        if request.mount_point.as_os_str().is_empty() {
            return Err(ControlError::MissingParameter("mountPoint".into()));
        }

        let backend_name = self.select_backend(request.backend.as_deref());

        let source = self.resolver.resolve(&request.source)?;

        let backend = self
            .backends
            .lookup(&backend_name)
            .ok_or_else(|| ControlError::InvalidBackend(backend_name.clone()))?;

        let teardown = match backend.mount(source.as_ref(), &request.mount_point) {
            Ok(teardown) => teardown,
            Err(e) => {
                tracing::warn!(
                    "Mount of {} at {} using {} failed: {}",
                    source,
                    request.mount_point.display(),
                    backend_name,
                    e
                );
                return Err(ControlError::MountFailed(e));
            }
        };

        let record = ActiveMount::new(
            request.mount_point.clone(),
            backend_name.clone(),
            source.name(),
            teardown,
        );
        if let Some(previous) = self.mounts.insert(record) {
            tracing::warn!(
                "Replaced existing mount record at {} (was {} via {}); its mount is no longer tracked",
                previous.mount_point.display(),
                previous.source_name,
                previous.backend
            );
        }

        tracing::debug!(
            "Mount for {} created at {} using {}",
            source,
            request.mount_point.display(),
            backend_name
        );
        Ok(())
    }

    /// Unmount and forget the mount at `mount_point`.
    ///
    /// The teardown runs while the directory lock is held.
    ///
    /// # Errors
    ///
    /// - [`ControlError::NotFound`] if nothing is mounted there
    /// - [`ControlError::UnmountFailed`] with the teardown's error; the
    ///   record stays so the call can be retried
    #[instrument(
        level = "info",
        name = "control::remove_mount",
        skip_all,
        fields(mount_point = %mount_point.display())
    )]
    pub fn remove_mount(&self, mount_point: &Path) -> Result<(), ControlError> {
        if mount_point.as_os_str().is_empty() {
            return Err(ControlError::MissingParameter("mountPoint".into()));
        }

        match self.mounts.teardown(mount_point) {
            Ok(info) => {
                tracing::debug!(
                    "Unmounted {} from {} (backend {})",
                    info.source,
                    info.mount_point.display(),
                    info.backend
                );
                Ok(())
            }
            Err(e) => {
                if matches!(e, ControlError::UnmountFailed(_)) {
                    tracing::warn!("Unmount of {} failed: {}", mount_point.display(), e);
                }
                Err(e)
            }
        }
    }

    /// Registered backend names, sorted
    pub fn list_backend_types(&self) -> Vec<String> {
        self.backends.names()
    }

    /// Snapshot of active mounts, in no particular order
    pub fn list_active_mounts(&self) -> Vec<MountInfo> {
        self.mounts.list()
    }

    /// Tear down every active mount, one at a time.
    ///
    /// Used at shutdown. Failures are reported per mount point and do not
    /// stop the remaining unmounts.
    #[instrument(level = "info", name = "control::remove_all", skip_all)]
    pub fn remove_all(&self) -> Vec<UnmountResult> {
        self.mounts
            .mount_points()
            .into_iter()
            .map(|mount_point| {
                let result = self.remove_mount(&mount_point);
                UnmountResult {
                    mount_point,
                    result,
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for MountControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountControl")
            .field("backends", &self.backends)
            .field("mounts", &self.mounts)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
