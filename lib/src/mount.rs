//! Bind-mount lifecycle around the rootfs patching phase.
//!
//! The chroot steps need the kernel filesystems visible inside the rootfs.
//! They are acquired through [`MountGuard`], whose release is best-effort,
//! idempotent, and runs on every exit path.

use std::process::Command;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fn_error_context::context;
use serde::Deserialize;

use crate::task::Task;

/// Kernel filesystems bind-mounted into the rootfs, in mount order.
pub(crate) const BIND_MOUNTS: &[&str] = &["proc", "sys", "dev"];

#[derive(Deserialize, Debug)]
pub(crate) struct Filesystem {
    pub(crate) target: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Findmnt {
    pub(crate) filesystems: Vec<Filesystem>,
}

fn parse_findmnt(data: &[u8], path: &Utf8Path) -> Result<bool> {
    let parsed: Findmnt =
        serde_json::from_slice(data).context("Parsing findmnt output")?;
    Ok(parsed
        .filesystems
        .iter()
        .any(|fs| Utf8Path::new(&fs.target) == path))
}

/// Whether `path` is currently a mountpoint.
#[context("Inspecting mountpoint {path}")]
pub(crate) fn is_mounted(path: &Utf8Path) -> Result<bool> {
    let o = Command::new("findmnt")
        .args(["-J", path.as_str()])
        .output()?;
    // findmnt exits nonzero when the path is not a mountpoint
    if !o.status.success() {
        return Ok(false);
    }
    parse_findmnt(&o.stdout, path)
}

/// Whether any of the kernel filesystem bind targets under `root` is still
/// mounted.  A failed probe counts as mounted.
pub(crate) fn any_bind_mounted(root: &Utf8Path) -> bool {
    BIND_MOUNTS
        .iter()
        .any(|name| is_mounted(&root.join(name)).unwrap_or(true))
}

/// Best-effort unmount of the bind mounts under `rootfs`, in reverse mount
/// order.  Failures are logged and swallowed; already-unmounted targets are
/// skipped, so this is safe to invoke from any exit path, repeatedly.
pub(crate) fn unmount_all(rootfs: &Utf8Path) {
    for name in BIND_MOUNTS.iter().rev() {
        let target = rootfs.join(name);
        if matches!(is_mounted(&target), Ok(false)) {
            continue;
        }
        match Command::new("umount").arg(target.as_str()).status() {
            Ok(st) if st.success() => tracing::debug!("Unmounted {target}"),
            Ok(st) => tracing::warn!("Failed to unmount {target}: {st:?}"),
            Err(e) => tracing::warn!("Failed to run umount {target}: {e}"),
        }
    }
}

/// Holds the `/proc`, `/sys` and `/dev` bind mounts for a rootfs.
#[derive(Debug)]
pub(crate) struct MountGuard {
    rootfs: Utf8PathBuf,
    released: bool,
}

impl MountGuard {
    /// Bind-mount the kernel filesystems into the rootfs.
    #[context("Mounting kernel filesystems into {rootfs}")]
    pub(crate) fn bind(rootfs: &Utf8Path) -> Result<Self> {
        // Construct first so a partial failure still unmounts on drop
        let mut guard = Self {
            rootfs: rootfs.to_owned(),
            released: false,
        };
        match guard.bind_all() {
            Ok(()) => Ok(guard),
            Err(e) => {
                guard.release();
                Err(e)
            }
        }
    }

    fn bind_all(&mut self) -> Result<()> {
        for name in BIND_MOUNTS {
            let src = format!("/{name}");
            let target = self.rootfs.join(name);
            Task::new(format!("Mounting {target}"), "mount")
                .args(["--bind", src.as_str(), target.as_str()])
                .quiet()
                .run()?;
        }
        Ok(())
    }

    /// Unmount everything we mounted.  Safe to call more than once.
    pub(crate) fn release(&mut self) {
        if self.released {
            return;
        }
        unmount_all(&self.rootfs);
        self.released = true;
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_parse_findmnt() -> Result<()> {
        let data = indoc! { r#"
            {
               "filesystems": [
                  {
                     "target": "/srv/builds/ec2/turnkey-core-16.2-jessie-amd64.rootfs/proc",
                     "source": "proc",
                     "fstype": "proc",
                     "options": "rw,nosuid,nodev,noexec,relatime"
                  }
               ]
            }
        "# };
        let target =
            Utf8Path::new("/srv/builds/ec2/turnkey-core-16.2-jessie-amd64.rootfs/proc");
        assert!(parse_findmnt(data.as_bytes(), target)?);
        assert!(!parse_findmnt(data.as_bytes(), Utf8Path::new("/proc"))?);
        assert!(parse_findmnt(b"{}", target).is_err());
        Ok(())
    }

    #[test]
    fn test_release_is_idempotent() {
        // Nothing is mounted under a fresh tempdir, so release degrades to
        // mountpoint probes which all come back negative.
        let td = tempfile::tempdir().unwrap();
        let rootfs = Utf8Path::from_path(td.path()).unwrap();
        let mut guard = MountGuard {
            rootfs: rootfs.to_owned(),
            released: false,
        };
        guard.release();
        guard.release();
        assert!(guard.released);
    }
}
