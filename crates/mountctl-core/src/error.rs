//! Control-plane error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::{BackendError, ResolveError};

/// Errors returned by the mount control operations and the call table
#[derive(Error, Debug)]
pub enum ControlError {
    /// A required parameter was absent or empty
    #[error("Didn't find key {0:?} in input")]
    MissingParameter(String),

    /// A parameter was present but not of the expected type
    #[error("Parameter {key:?} must be a {expected}")]
    InvalidParameter {
        /// Parameter name
        key: String,
        /// Expected JSON type
        expected: &'static str,
    },

    /// The source resolver could not produce a source handle
    #[error(transparent)]
    SourceResolutionFailed(#[from] ResolveError),

    /// The requested (or auto-selected) backend is not registered
    #[error("Mount option {0:?} is not registered, or is invalid")]
    InvalidBackend(String),

    /// The backend reported a mount failure
    #[error(transparent)]
    MountFailed(BackendError),

    /// No active mount is recorded at that path
    #[error("Mount not found: {0}")]
    NotFound(PathBuf),

    /// The teardown capability reported a failure; the record was kept
    #[error(transparent)]
    UnmountFailed(BackendError),

    /// No call is registered under that path
    #[error("Couldn't find call {0:?}")]
    UnknownCall(String),

    /// A result could not be encoded as JSON
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ControlError {
    /// Stable, machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::MissingParameter(_) => "MissingParameter",
            ControlError::InvalidParameter { .. } => "InvalidParameter",
            ControlError::SourceResolutionFailed(_) => "SourceResolutionFailed",
            ControlError::InvalidBackend(_) => "InvalidBackend",
            ControlError::MountFailed(_) => "MountFailed",
            ControlError::NotFound(_) => "NotFound",
            ControlError::UnmountFailed(_) => "UnmountFailed",
            ControlError::UnknownCall(_) => "UnknownCall",
            ControlError::Encode(_) => "EncodeFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_are_forwarded_verbatim() {
        let err = ControlError::MountFailed(BackendError::Other("fuse: device not found".into()));
        assert_eq!(err.to_string(), "fuse: device not found");

        let err = ControlError::from(ResolveError::NotFound("drive:".into()));
        assert_eq!(err.to_string(), "Source not found: drive:");
        assert_eq!(err.kind(), "SourceResolutionFailed");
    }

    #[test]
    fn invalid_backend_names_the_backend() {
        let err = ControlError::InvalidBackend("bogus".into());
        assert_eq!(
            err.to_string(),
            "Mount option \"bogus\" is not registered, or is invalid"
        );
        assert_eq!(err.kind(), "InvalidBackend");
    }
}
