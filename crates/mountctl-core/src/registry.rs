//! Registry of mount backends, keyed by name.
//!
//! Backends register themselves once during startup; every mount request
//! reads the registry. The lock is only held for the map access, never
//! while a backend runs.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::MountBackend;

/// Thread-safe map from backend name to mount capability.
///
/// ```
/// use mountctl_core::{BackendRegistry, Teardown, backend_fn};
///
/// let registry = BackendRegistry::new();
/// registry.register("mount2", backend_fn(|_, _| Ok(Teardown::noop())));
/// registry.register("cmount", backend_fn(|_, _| Ok(Teardown::noop())));
///
/// assert!(registry.lookup("cmount").is_some());
/// assert_eq!(registry.names(), vec!["cmount", "mount2"]);
/// ```
#[derive(Default)]
pub struct BackendRegistry {
    backends: Mutex<HashMap<String, Arc<dyn MountBackend>>>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under `name`, replacing any earlier registration.
    pub fn register<B>(&self, name: impl Into<String>, backend: B)
    where
        B: MountBackend + 'static,
    {
        self.register_arc(name, Arc::new(backend));
    }

    /// Register an already shared backend under `name`.
    pub fn register_arc(&self, name: impl Into<String>, backend: Arc<dyn MountBackend>) {
        let name = name.into();
        let replaced = self.backends.lock().insert(name.clone(), backend).is_some();
        if replaced {
            tracing::debug!("Replaced mount backend {name:?}");
        } else {
            tracing::debug!("Registered mount backend {name:?}");
        }
    }

    /// Look up a backend by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn MountBackend>> {
        self.backends.lock().get(name).cloned()
    }

    /// Whether a backend is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.backends.lock().contains_key(name)
    }

    /// All registered names in lexicographic order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Description of every registered backend, sorted by name
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .backends
            .lock()
            .iter()
            .map(|(name, backend)| (name.clone(), backend.description().to_string()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Pick the first name of `priority` that is registered.
    pub fn first_registered<'a, I>(&self, priority: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let backends = self.backends.lock();
        priority
            .into_iter()
            .find(|name| backends.contains_key(name.as_str()))
            .cloned()
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.backends.lock().len()
    }

    /// Whether no backend is registered
    pub fn is_empty(&self) -> bool {
        self.backends.lock().is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
