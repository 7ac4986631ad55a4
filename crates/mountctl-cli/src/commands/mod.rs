pub mod calls;
pub mod serve;
pub mod types;

use std::sync::Arc;

use mountctl_core::{BackendRegistry, ControlConfig, MountControl, MountDirectory};

use crate::local::LocalResolver;

/// Registry holding every backend compiled into this binary
pub fn build_registry() -> BackendRegistry {
    let registry = BackendRegistry::new();

    #[cfg(target_os = "linux")]
    registry.register(crate::bind::NAME, crate::bind::BindBackend);

    registry
}

/// Control plane over the built-in backends and local directory sources
pub fn build_control(config: ControlConfig) -> MountControl {
    MountControl::with_config(
        Arc::new(build_registry()),
        Arc::new(MountDirectory::new()),
        Arc::new(LocalResolver),
        config,
    )
}
