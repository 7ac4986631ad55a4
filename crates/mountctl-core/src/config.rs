//! Control-plane configuration.
//!
//! Loaded from the `[control]` table of a TOML file:
//!
//! ```toml
//! [control]
//! backend_priority = ["mount", "cmount", "mount2"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Backends probed, in order, when a mount request names none
pub const DEFAULT_BACKEND_PRIORITY: &[&str] = &["mount", "cmount", "mount2"];

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for [`MountControl`](crate::MountControl)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Order in which backends are tried when none is requested
    pub backend_priority: Vec<String>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            backend_priority: DEFAULT_BACKEND_PRIORITY
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    control: ControlConfig,
}

impl ControlConfig {
    /// Parse the `[control]` table out of a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(s)?;
        Ok(file.control)
    }

    /// Load from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] for I/O failures other than not-found,
    /// [`ConfigError::Parse`] for malformed content.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
