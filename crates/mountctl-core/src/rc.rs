//! Named-parameter call table for the mount operations.
//!
//! Each operation is exposed under a call path (`mount/mount`,
//! `mount/unmount`, `mount/types`, `mount/listmounts`) that takes a map of
//! named parameters and returns a map of named results. The transport that
//! delivers calls, and any authentication it enforces, lives outside this
//! crate; [`Call::auth_required`] tells it which calls need protecting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::control::{MountControl, MountRequest};
use crate::error::ControlError;

/// A map of named parameters or results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    /// An empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to anything serialisable as JSON
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `value` cannot be represented.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), serde_json::Error> {
        self.0.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert) for string values
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// Raw value for `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A required string parameter.
    ///
    /// # Errors
    ///
    /// [`ControlError::MissingParameter`] if absent or empty,
    /// [`ControlError::InvalidParameter`] if not a string.
    pub fn get_string(&self, key: &str) -> Result<String, ControlError> {
        self.get_opt_string(key)?
            .ok_or_else(|| ControlError::MissingParameter(key.to_string()))
    }

    /// An optional string parameter; absent, null and empty all yield `None`.
    ///
    /// # Errors
    ///
    /// [`ControlError::InvalidParameter`] if present but not a string.
    pub fn get_opt_string(&self, key: &str) -> Result<Option<String>, ControlError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ControlError::InvalidParameter {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// First present key out of `keys`, for parameters with legacy aliases
    fn get_string_alias(&self, keys: &[&str]) -> Result<String, ControlError> {
        for key in keys {
            if let Some(value) = self.get_opt_string(key)? {
                return Ok(value);
            }
        }
        Err(ControlError::MissingParameter(keys[0].to_string()))
    }

    fn get_opt_string_alias(&self, keys: &[&str]) -> Result<Option<String>, ControlError> {
        for key in keys {
            if let Some(value) = self.get_opt_string(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying JSON object
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Handler signature shared by every call
pub type CallFn = fn(&MountControl, &Params) -> Result<Params, ControlError>;

/// A registered call
#[derive(Debug, Clone, Copy)]
pub struct Call {
    /// Path the call is dispatched under
    pub path: &'static str,
    /// One-line summary
    pub title: &'static str,
    /// Longer help, including parameters
    pub help: &'static str,
    /// Whether the transport must authenticate the caller
    pub auth_required: bool,
    /// The operation itself
    pub handler: CallFn,
}

/// Dispatch table of the mount calls
#[derive(Debug, Clone)]
pub struct CallTable {
    calls: Vec<Call>,
}

impl Default for CallTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CallTable {
    /// Table holding the four mount calls
    pub fn new() -> Self {
        Self {
            calls: vec![
                Call {
                    path: "mount/mount",
                    title: "Create a new mount point",
                    help: MOUNT_HELP,
                    auth_required: true,
                    handler: mount_call,
                },
                Call {
                    path: "mount/unmount",
                    title: "Unmount selected active mount",
                    help: UNMOUNT_HELP,
                    auth_required: true,
                    handler: unmount_call,
                },
                Call {
                    path: "mount/types",
                    title: "Show all possible mount types",
                    help: TYPES_HELP,
                    auth_required: true,
                    handler: types_call,
                },
                Call {
                    path: "mount/listmounts",
                    title: "Show current mount points",
                    help: LISTMOUNTS_HELP,
                    auth_required: true,
                    handler: listmounts_call,
                },
            ],
        }
    }

    /// Every call, in registration order
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// The call registered at `path`
    pub fn get(&self, path: &str) -> Option<&Call> {
        self.calls.iter().find(|c| c.path == path)
    }

    /// Dispatch `path` with `params`.
    ///
    /// # Errors
    ///
    /// [`ControlError::UnknownCall`] for an unregistered path, otherwise
    /// whatever the operation returns.
    pub fn call(
        &self,
        control: &MountControl,
        path: &str,
        params: &Params,
    ) -> Result<Params, ControlError> {
        let call = self
            .get(path)
            .ok_or_else(|| ControlError::UnknownCall(path.to_string()))?;
        tracing::trace!("Dispatching {path}");
        (call.handler)(control, params)
    }
}

fn mount_call(control: &MountControl, params: &Params) -> Result<Params, ControlError> {
    let mount_point = params.get_string("mountPoint")?;
    let backend = params.get_opt_string_alias(&["backendName", "mountType"])?;
    let source = params.get_string_alias(&["source", "fs"])?;

    let request = MountRequest {
        source,
        mount_point: PathBuf::from(mount_point),
        backend,
    };
    control.create_mount(&request)?;
    Ok(Params::new())
}

fn unmount_call(control: &MountControl, params: &Params) -> Result<Params, ControlError> {
    let mount_point = params.get_string("mountPoint")?;
    control.remove_mount(&PathBuf::from(mount_point))?;
    Ok(Params::new())
}

fn types_call(control: &MountControl, _params: &Params) -> Result<Params, ControlError> {
    let mut out = Params::new();
    out.insert("types", control.list_backend_types())?;
    Ok(out)
}

fn listmounts_call(control: &MountControl, _params: &Params) -> Result<Params, ControlError> {
    let mut out = Params::new();
    out.insert("mounts", control.list_active_mounts())?;
    Ok(out)
}

const MOUNT_HELP: &str = "\
Mount a source as a local filesystem using one of the registered backends.

If no backendName is provided, the first registered backend from the
configured priority list is used (default: mount, cmount, mount2).

This takes the following parameters

- source - the source to be mounted (required; alias: fs)
- mountPoint - valid path on the local machine (required)
- backendName - name of the backend to use (optional; alias: mountType)

Eg

    mount/mount source=mydrive: mountPoint=/home/user/mountPoint
    mount/mount source=mydrive: mountPoint=/home/user/mountPoint backendName=mount
";

const UNMOUNT_HELP: &str = "\
Unmount a mount created with mount/mount.

This takes the following parameters

- mountPoint - path on the local machine where the mount was created (required)

Eg

    mount/unmount mountPoint=/home/user/mountPoint
";

const TYPES_HELP: &str = "\
Show all registered mount types.

This takes no parameters and returns

- types - sorted list of mount types

The mount types are strings like \"mount\", \"mount2\", \"cmount\" and can
be passed to mount/mount as the backendName parameter.
";

const LISTMOUNTS_HELP: &str = "\
Show the mounts currently held by this process, for use with mount/unmount.

This takes no parameters and returns

- mounts - list of {mountPoint, source, mountedOn, backend}
";
