//! Mount backend abstraction
//!
//! The control plane never mounts anything itself. Backends are registered
//! at startup under a unique name and are handed a resolved [`MountSource`]
//! plus a target path; on success they return a [`Teardown`] that reverses
//! the mount.
//!
//! # Architecture
//!
//! - [`MountBackend`]: a mounting mechanism (e.g. a FUSE or bind-mount implementation)
//! - [`Teardown`]: single-use capability that unmounts and releases resources
//! - [`MountSource`] / [`SourceResolver`]: the resolved source handle and
//!   the lookup that produces it
//!
//! # Example
//!
//! ```
//! use mountctl_core::{BackendError, MountSource, Teardown, backend_fn};
//! use std::path::Path;
//!
//! let backend = backend_fn(|source: &dyn MountSource, mount_point: &Path| {
//!     let target = mount_point.to_path_buf();
//!     let name = source.name().to_string();
//!     Ok::<_, BackendError>(Teardown::new(move || {
//!         println!("unmounting {name} from {}", target.display());
//!         Ok(())
//!     }))
//! });
//! # let _ = backend;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by mount backends and their teardown capabilities
#[derive(Error, Debug)]
pub enum BackendError {
    /// OS-level mount or unmount operation failed
    #[error("Failed to mount: {0}")]
    Io(#[from] std::io::Error),

    /// The target mount point doesn't exist
    #[error("Mount point does not exist: {0}")]
    MountPointNotFound(PathBuf),

    /// The mount is in use and cannot be torn down right now
    #[error("Mount point is busy: {0}")]
    Busy(PathBuf),

    /// The backend cannot run on this system
    #[error("Backend not available: {0}")]
    Unavailable(String),

    /// The teardown capability was already consumed
    #[error("Mount was already torn down")]
    AlreadyTornDown,

    /// Any other backend-specific failure
    #[error("{0}")]
    Other(String),
}

/// Errors reported by a [`SourceResolver`]
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No source is known under that identifier
    #[error("Source not found: {0}")]
    NotFound(String),

    /// The identifier could not be parsed
    #[error("Invalid source {source_id:?}: {reason}")]
    Invalid {
        /// Identifier as supplied by the caller
        source_id: String,
        /// Why it was rejected
        reason: String,
    },

    /// Lookup failed for another reason (I/O, authentication, ...)
    #[error("Failed to resolve source: {0}")]
    Io(#[from] std::io::Error),
}

/// A resolved source, ready to be handed to a backend.
///
/// `name()` is what the active mount directory records; the `Display`
/// implementation is the full identity used in logs.
pub trait MountSource: fmt::Display + Send + Sync {
    /// Short name of the source (e.g. the remote name)
    fn name(&self) -> &str;

    /// Backend-facing location, such as a local directory or a remote root.
    ///
    /// Defaults to [`name`](MountSource::name).
    fn location(&self) -> &str {
        self.name()
    }
}

/// Resolves a caller-supplied source identifier into a [`MountSource`].
pub trait SourceResolver: Send + Sync {
    /// Resolve `source_id`.
    ///
    /// # Errors
    ///
    /// Whatever the lookup fails with; the control plane forwards it unchanged.
    fn resolve(&self, source_id: &str) -> Result<Arc<dyn MountSource>, ResolveError>;
}

type TeardownFn = Box<dyn FnMut() -> Result<(), BackendError> + Send>;

/// Single-use unmount capability returned by a successful mount.
///
/// Once [`invoke`](Teardown::invoke) succeeds the stored closure is dropped,
/// so the same mount can never be torn down twice. A failed invocation keeps
/// the closure in place so the unmount can be retried.
pub struct Teardown {
    inner: Option<TeardownFn>,
}

impl Teardown {
    /// Wrap an unmount closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut() -> Result<(), BackendError> + Send + 'static,
    {
        Self {
            inner: Some(Box::new(f)),
        }
    }

    /// A teardown that does nothing, for backends with nothing to release
    pub fn noop() -> Self {
        Self::new(|| Ok(()))
    }

    /// Run the teardown.
    ///
    /// # Errors
    ///
    /// [`BackendError::AlreadyTornDown`] if a previous call already succeeded,
    /// otherwise whatever the closure returns.
    pub fn invoke(&mut self) -> Result<(), BackendError> {
        let f = self.inner.as_mut().ok_or(BackendError::AlreadyTornDown)?;
        f()?;
        self.inner = None;
        Ok(())
    }

    /// Whether the teardown has already run successfully
    pub fn is_consumed(&self) -> bool {
        self.inner.is_none()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// A mechanism that can mount a resolved source at a path
///
/// # Thread Safety
///
/// Backends are shared across callers and must be `Send + Sync`. A mount
/// call may block for as long as the underlying mechanism needs; no timeout
/// is imposed by the control plane.
pub trait MountBackend: Send + Sync {
    /// Mount `source` at `mount_point`.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying mechanism. Nothing is recorded by the
    /// control plane when this returns an error.
    fn mount(
        &self,
        source: &dyn MountSource,
        mount_point: &Path,
    ) -> Result<Teardown, BackendError>;

    /// Brief description shown when listing backends
    fn description(&self) -> &str {
        ""
    }
}

/// Adapter turning a closure into a [`MountBackend`], see [`backend_fn`]
pub struct FnBackend<F> {
    f: F,
}

/// Build a backend from a closure `(source, mount_point) -> Result<Teardown, BackendError>`
pub fn backend_fn<F>(f: F) -> FnBackend<F>
where
    F: Fn(&dyn MountSource, &Path) -> Result<Teardown, BackendError> + Send + Sync,
{
    FnBackend { f }
}

impl<F> MountBackend for FnBackend<F>
where
    F: Fn(&dyn MountSource, &Path) -> Result<Teardown, BackendError> + Send + Sync,
{
    fn mount(
        &self,
        source: &dyn MountSource,
        mount_point: &Path,
    ) -> Result<Teardown, BackendError> {
        (self.f)(source, mount_point)
    }
}
