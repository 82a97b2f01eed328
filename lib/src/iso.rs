//! ISO acquisition and extraction.

use anyhow::Result;
use camino::Utf8Path;
use fn_error_context::context;

use crate::buildlog::BuildLog;
use crate::task::Task;

/// Fetch the appliance ISO into the local cache, unless already there.
#[context("Downloading {iso}")]
pub(crate) fn download(iso: &Utf8Path, log: &BuildLog) -> Result<()> {
    if iso.exists() {
        println!("Using cached {iso}");
        log.line(&format!("using cached iso {iso}"))?;
        return Ok(());
    }
    Task::new(format!("Downloading {iso}"), "iso-download")
        .args([iso.as_str()])
        .log_to(log)?
        .run()
}

/// Verify the ISO signature; a failure aborts the build.
#[context("Verifying {iso}")]
pub(crate) fn verify(iso: &Utf8Path, log: &BuildLog) -> Result<()> {
    Task::new(format!("Verifying {iso}"), "iso-verify")
        .args([iso.as_str()])
        .log_to(log)?
        .run()
}

/// Unpack the ISO; tklpatch drops `<stem>.rootfs` and `<stem>.cdroot`
/// working trees into the given output directory.
#[context("Extracting {iso}")]
pub(crate) fn extract(iso: &Utf8Path, outdir: &Utf8Path, log: &BuildLog) -> Result<()> {
    Task::new(format!("Extracting {iso}"), "tklpatch-extract-iso")
        .args([iso.as_str()])
        .cwd(outdir)
        .log_to(log)?
        .run()
}
