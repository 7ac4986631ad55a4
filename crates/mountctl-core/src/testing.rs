//! Test doubles for the control plane.
//!
//! - [`MockBackend`]: counts mounts and teardowns, can fail on demand and
//!   records the highest number of teardowns that ever ran at once
//! - [`StaticResolver`]: resolves any non-empty identifier except the ones
//!   it was told to reject
//!
//! # Usage
//!
//! ```
//! use mountctl_core::testing::{MockBackend, StaticResolver};
//! use mountctl_core::{BackendRegistry, MountControl, MountDirectory, MountRequest};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(BackendRegistry::new());
//! let backend = Arc::new(MockBackend::new());
//! registry.register_arc("mount", backend.clone());
//!
//! let control = MountControl::new(
//!     registry,
//!     Arc::new(MountDirectory::new()),
//!     Arc::new(StaticResolver::new()),
//! );
//! control.create_mount(&MountRequest::new("remote:", "/mnt/remote")).unwrap();
//! assert_eq!(backend.mount_count(), 1);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
    BackendError, MountBackend, MountSource, ResolveError, SourceResolver, Teardown,
};

#[derive(Debug, Default)]
struct MockState {
    mounts: AtomicUsize,
    teardowns: AtomicUsize,
    teardown_attempts: AtomicUsize,
    failing_mounts: AtomicUsize,
    failing_teardowns: AtomicUsize,
    active_teardowns: AtomicUsize,
    max_active_teardowns: AtomicUsize,
}

/// Backend that mounts nothing and keeps score
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
    delay: Duration,
}

impl MockBackend {
    /// A backend whose mounts and teardowns always succeed
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` mount calls
    #[must_use]
    pub fn fail_mounts(self, n: usize) -> Self {
        self.state.failing_mounts.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` teardown invocations (across all mounts)
    #[must_use]
    pub fn fail_teardowns(self, n: usize) -> Self {
        self.state.failing_teardowns.store(n, Ordering::SeqCst);
        self
    }

    /// Sleep this long inside every mount and teardown
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Successful mounts so far
    pub fn mount_count(&self) -> usize {
        self.state.mounts.load(Ordering::SeqCst)
    }

    /// Successful teardowns so far
    pub fn teardown_count(&self) -> usize {
        self.state.teardowns.load(Ordering::SeqCst)
    }

    /// Teardown invocations so far, including failed ones
    pub fn teardown_attempts(&self) -> usize {
        self.state.teardown_attempts.load(Ordering::SeqCst)
    }

    /// Highest number of teardowns observed running at the same time
    pub fn max_concurrent_teardowns(&self) -> usize {
        self.state.max_active_teardowns.load(Ordering::SeqCst)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl MountBackend for MockBackend {
    fn mount(
        &self,
        _source: &dyn MountSource,
        mount_point: &Path,
    ) -> Result<Teardown, BackendError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if take_one(&self.state.failing_mounts) {
            return Err(BackendError::Other(format!(
                "mock mount failed at {}",
                mount_point.display()
            )));
        }
        self.state.mounts.fetch_add(1, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let delay = self.delay;
        let mount_point = mount_point.to_path_buf();
        Ok(Teardown::new(move || {
            state.teardown_attempts.fetch_add(1, Ordering::SeqCst);
            let active = state.active_teardowns.fetch_add(1, Ordering::SeqCst) + 1;
            state.max_active_teardowns.fetch_max(active, Ordering::SeqCst);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            state.active_teardowns.fetch_sub(1, Ordering::SeqCst);

            if take_one(&state.failing_teardowns) {
                return Err(BackendError::Busy(mount_point.clone()));
            }
            state.teardowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }

    fn description(&self) -> &str {
        "In-memory mock backend"
    }
}

/// A source known only by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSource {
    name: String,
}

impl NamedSource {
    /// Source called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for NamedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock:{}", self.name)
    }
}

impl MountSource for NamedSource {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Resolver that accepts every identifier it was not told to reject
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    rejected: HashSet<String>,
}

impl StaticResolver {
    /// Resolver accepting everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `source_id` fail with [`ResolveError::NotFound`]
    #[must_use]
    pub fn reject(mut self, source_id: impl Into<String>) -> Self {
        self.rejected.insert(source_id.into());
        self
    }
}

impl SourceResolver for StaticResolver {
    fn resolve(&self, source_id: &str) -> Result<Arc<dyn MountSource>, ResolveError> {
        if self.rejected.contains(source_id) {
            return Err(ResolveError::NotFound(source_id.to_string()));
        }
        Ok(Arc::new(NamedSource::new(source_id)))
    }
}

/// Mount points `/mnt/test-0` .. `/mnt/test-{n-1}`
pub fn mount_points(n: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|i| PathBuf::from(format!("/mnt/test-{i}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_fails_then_succeeds() {
        let backend = MockBackend::new().fail_mounts(1);
        let source = NamedSource::new("drive");
        assert!(backend.mount(&source, Path::new("/mnt/a")).is_err());

        let mut teardown = backend.mount(&source, Path::new("/mnt/a")).unwrap();
        assert_eq!(backend.mount_count(), 1);
        teardown.invoke().unwrap();
        assert_eq!(backend.teardown_count(), 1);
        assert_eq!(backend.max_concurrent_teardowns(), 1);
    }

    #[test]
    fn resolver_rejects_configured_ids() {
        let resolver = StaticResolver::new().reject("bad:");
        assert!(matches!(
            resolver.resolve("bad:"),
            Err(ResolveError::NotFound(id)) if id == "bad:"
        ));
        let source = resolver.resolve("good:").unwrap();
        assert_eq!(source.name(), "good:");
        assert_eq!(source.to_string(), "mock:good:");
    }
}
