//! EBS image creation, registration and replication.

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use fn_error_context::context;

use crate::buildlog::BuildLog;
use crate::task::Task;

/// The helpers print progress on stderr and the AMI id as the final stdout
/// line.
fn parse_ami_id(out: &str) -> Result<String> {
    let ami = out
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| anyhow!("No AMI id in helper output"))?;
    anyhow::ensure!(ami.starts_with("ami-"), "Unexpected AMI id {ami:?}");
    Ok(ami.to_string())
}

/// Create and register the EBS-backed AMI from the rootfs; returns the
/// AMI id.
#[context("Creating EBS-backed AMI {name}")]
pub(crate) fn create_image(name: &str, rootfs: &Utf8Path, log: &BuildLog) -> Result<String> {
    let out = Task::new(format!("Creating AMI {name}"), "ec2-ebs")
        .args(["--name", name, rootfs.as_str()])
        .log_to(log)?
        .read()?;
    parse_ami_id(&out)
}

/// Register a paravirtual-mode variant of an already registered AMI.
#[context("Registering paravirtual variant of {ami_id}")]
pub(crate) fn register_pvm(ami_id: &str, name: &str, log: &BuildLog) -> Result<String> {
    let out = Task::new(format!("Registering paravirtual AMI {name}"), "ec2-ebs")
        .args(["--pvm", "--name", name, ami_id])
        .log_to(log)?
        .read()?;
    parse_ami_id(&out)
}

/// Replicate the AMI to all other regions.
#[context("Copying {ami_id} to all regions")]
pub(crate) fn copy_to_regions(ami_id: &str, log: &BuildLog) -> Result<()> {
    Task::new(format!("Copying {ami_id} to all regions"), "ec2-copy")
        .args([ami_id])
        .log_to(log)?
        .run()
}

/// Share the AMI for marketplace listing.
#[context("Sharing {ami_id} for marketplace listing")]
pub(crate) fn share_marketplace(ami_id: &str, log: &BuildLog) -> Result<()> {
    Task::new(format!("Sharing {ami_id} with the marketplace"), "ec2-share")
        .args([ami_id])
        .log_to(log)?
        .run()
}
