//! Linux bind-mount backend.
//!
//! Makes a local directory source appear at the mount point with
//! `mount(2)` + `MS_BIND`; the teardown is `umount2(2)`. Needs
//! `CAP_SYS_ADMIN` (or a user namespace that grants it).

use std::path::Path;

use nix::errno::Errno;
use nix::mount::{mount, umount2, MntFlags, MsFlags};

use mountctl_core::{BackendError, MountBackend, MountSource, Teardown};

/// Registry name of the bind backend
pub const NAME: &str = "bind";

#[derive(Debug, Default, Clone, Copy)]
pub struct BindBackend;

impl MountBackend for BindBackend {
    fn mount(
        &self,
        source: &dyn MountSource,
        mount_point: &Path,
    ) -> Result<Teardown, BackendError> {
        if !mount_point.is_dir() {
            return Err(BackendError::MountPointNotFound(mount_point.to_path_buf()));
        }

        let from = Path::new(source.location());
        mount(
            Some(from),
            mount_point,
            None::<&str>,
            MsFlags::MS_BIND,
            None::<&str>,
        )
        .map_err(|e| BackendError::Io(e.into()))?;
        tracing::debug!("Bind-mounted {} at {}", from.display(), mount_point.display());

        let target = mount_point.to_path_buf();
        Ok(Teardown::new(move || match umount2(target.as_path(), MntFlags::empty()) {
            Ok(()) => Ok(()),
            Err(Errno::EBUSY) => Err(BackendError::Busy(target.clone())),
            Err(e) => Err(BackendError::Io(e.into())),
        }))
    }

    fn description(&self) -> &str {
        "Linux bind mount of a local directory (requires CAP_SYS_ADMIN)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalResolver;
    use mountctl_core::SourceResolver;

    #[test]
    fn missing_mount_point_is_rejected_before_mounting() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalResolver.resolve(dir.path().to_str().unwrap()).unwrap();
        let target = dir.path().join("absent");

        let err = BindBackend.mount(source.as_ref(), &target).unwrap_err();
        assert!(matches!(err, BackendError::MountPointNotFound(p) if p == target));
    }
}
