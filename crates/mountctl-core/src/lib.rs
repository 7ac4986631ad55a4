//! Control plane for filesystem mount lifecycles.
//!
//! This crate does not mount anything itself. Mount mechanisms are plugged
//! in as [`MountBackend`]s, registered by name at startup, and this crate
//! keeps track of what they mounted so remote callers can create, list and
//! remove mounts safely from many threads at once.
//!
//! # Components
//!
//! ## State
//!
//! - [`BackendRegistry`] - backend name to mount capability, behind its own lock
//! - [`MountDirectory`] - mount point to [`ActiveMount`], behind its own lock
//!
//! The two locks are independent and never held together.
//!
//! ## Operations
//!
//! - [`MountControl`] - create-mount, remove-mount, list-backend-types,
//!   list-active-mounts over injected registries
//! - [`rc::CallTable`] - the same operations as named-parameter calls
//!   (`mount/mount`, `mount/unmount`, `mount/types`, `mount/listmounts`)
//!
//! ## Collaborators
//!
//! - [`MountBackend`] / [`Teardown`] - the mount capability and its single-use undo
//! - [`SourceResolver`] / [`MountSource`] - turns a caller's source id into a handle
//!
//! # Example
//!
//! ```
//! use mountctl_core::testing::{MockBackend, StaticResolver};
//! use mountctl_core::{BackendRegistry, MountControl, MountDirectory, MountRequest};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(BackendRegistry::new());
//! registry.register("cmount", MockBackend::new());
//!
//! let control = MountControl::new(
//!     registry,
//!     Arc::new(MountDirectory::new()),
//!     Arc::new(StaticResolver::new()),
//! );
//!
//! // No backend named: falls back along mount, cmount, mount2
//! control.create_mount(&MountRequest::new("remote:", "/mnt/remote")).unwrap();
//! assert_eq!(control.list_active_mounts()[0].backend, "cmount");
//!
//! control.remove_mount(Path::new("/mnt/remote")).unwrap();
//! assert!(control.list_active_mounts().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod backend;
mod config;
mod control;
mod directory;
mod error;
mod registry;

/// Named-parameter call table over [`MountControl`].
pub mod rc;

pub use backend::{
    BackendError, FnBackend, MountBackend, MountSource, ResolveError, SourceResolver, Teardown,
    backend_fn,
};
pub use config::{ConfigError, ControlConfig, DEFAULT_BACKEND_PRIORITY};
pub use control::{MountControl, MountRequest, UnmountResult};
pub use directory::{ActiveMount, MountDirectory, MountInfo};
pub use error::ControlError;
pub use registry::BackendRegistry;

/// Test doubles for backends and source resolvers.
///
/// Used by this crate's tests and by downstream crates that embed the
/// control plane.
pub mod testing;
