//! Artifact publishing.

use anyhow::Result;
use camino::Utf8Path;
use fn_error_context::context;

use crate::buildlog::BuildLog;
use crate::task::Task;

/// Upload one file to a configured destination.
#[context("Publishing {file} to {dest}")]
pub(crate) fn publish_file(file: &Utf8Path, dest: &str, log: &BuildLog) -> Result<()> {
    Task::new(format!("Publishing {file} to {dest}"), "publish-files")
        .args([file.as_str(), dest])
        .log_to(log)?
        .run()
}
