//! Configuration file loading.
//!
//! ```toml
//! [control]
//! backend_priority = ["bind", "mount", "cmount", "mount2"]
//!
//! [log]
//! filter = "info"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use mountctl_core::ControlConfig;

/// Overrides the directory `config.toml` is read from
pub const CONFIG_DIR_ENV: &str = "MOUNTCTL_CONFIG_DIR";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub control: ControlConfig,
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when neither `RUST_LOG` nor `-v` is given
    pub filter: Option<String>,
}

/// Directory holding `config.toml`
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("", "", "mountctl").map(|d| d.config_dir().to_path_buf())
}

/// Load `explicit` if given, else `config.toml` from [`config_dir`].
///
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        return parse(&contents, path);
    }

    let Some(path) = config_dir().map(|d| d.join("config.toml")) else {
        return Ok(Config::default());
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse(&contents, &path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to read config: {}", path.display())),
    }
}

fn parse(contents: &str, path: &Path) -> Result<Config> {
    toml::from_str(contents).with_context(|| format!("Invalid config: {}", path.display()))
}
