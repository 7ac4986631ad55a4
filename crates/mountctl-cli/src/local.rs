//! Local directories as mount sources.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use mountctl_core::{MountSource, ResolveError, SourceResolver};

/// An existing local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSource {
    /// Path as the caller gave it
    name: String,
    /// Canonical absolute path
    root: String,
}

impl fmt::Display for LocalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local:{}", self.root)
    }
}

impl MountSource for LocalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &str {
        &self.root
    }
}

/// Resolves source ids as local directory paths
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalResolver;

impl SourceResolver for LocalResolver {
    fn resolve(&self, source_id: &str) -> Result<Arc<dyn MountSource>, ResolveError> {
        let canonical = Path::new(source_id).canonicalize().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResolveError::NotFound(source_id.to_string())
            } else {
                ResolveError::Io(e)
            }
        })?;

        if !canonical.is_dir() {
            return Err(ResolveError::Invalid {
                source_id: source_id.to_string(),
                reason: "not a directory".into(),
            });
        }

        let root = canonical
            .to_str()
            .ok_or_else(|| ResolveError::Invalid {
                source_id: source_id.to_string(),
                reason: "path is not valid UTF-8".into(),
            })?
            .to_string();

        Ok(Arc::new(LocalSource {
            name: source_id.to_string(),
            root,
        }))
    }
}
