//! In-rootfs preparation steps.
//!
//! Everything here runs against the extracted root filesystem tree, either
//! chrooted into it or handing it to an external helper.  The kernel
//! filesystems must already be bind-mounted (see [`crate::mount`]).

use anyhow::Result;
use camino::Utf8Path;
use fn_error_context::context;

use crate::buildlog::BuildLog;
use crate::task::Task;

fn chroot_task(description: impl AsRef<str>, rootfs: &Utf8Path, args: &[&str]) -> Task {
    Task::new(description, "chroot")
        .args(std::iter::once(rootfs.as_str()).chain(args.iter().copied()))
        .env("DEBIAN_FRONTEND", "noninteractive")
}

/// Strip ISO-only packages that make no sense in a cloud image.
#[context("Purging packages from {rootfs}")]
pub(crate) fn purge_packages(rootfs: &Utf8Path, log: &BuildLog) -> Result<()> {
    Task::new("Purging ISO-only packages", "purge-pkgs")
        .args([rootfs.as_str()])
        .log_to(log)?
        .run()
}

/// Install pending security updates inside the rootfs.
#[context("Installing security updates in {rootfs}")]
pub(crate) fn install_security_updates(rootfs: &Utf8Path, log: &BuildLog) -> Result<()> {
    chroot_task(
        "Installing security updates",
        rootfs,
        &["turnkey-install-security-updates"],
    )
    .log_to(log)?
    .run()
}

/// Apply all pending updates, a superset of the security set.
#[context("Applying all updates in {rootfs}")]
pub(crate) fn upgrade_all(rootfs: &Utf8Path, log: &BuildLog) -> Result<()> {
    chroot_task("Updating package lists", rootfs, &["apt-get", "update"])
        .log_to(log)?
        .run()?;
    chroot_task(
        "Applying all updates",
        rootfs,
        &["apt-get", "-y", "dist-upgrade"],
    )
    .log_to(log)?
    .run()
}

/// Apply a tklpatch tree to the rootfs.
#[context("Applying patch {patch}")]
pub(crate) fn apply_patch(rootfs: &Utf8Path, patch: &Utf8Path, log: &BuildLog) -> Result<()> {
    Task::new(format!("Applying patch {patch}"), "tklpatch-apply")
        .args([rootfs.as_str(), patch.as_str()])
        .log_to(log)?
        .run()
}
