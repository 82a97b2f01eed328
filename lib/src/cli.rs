//! # TurnKey EC2 conversion CLI
//!
//! Command line tool to convert an appliance ISO into an EBS-backed AMI.

use std::ffi::OsString;

use anyhow::Result;
use clap::Parser;

use crate::flags::FlagSet;

/// Convert a TurnKey appliance ISO into an EC2 EBS-backed AMI.
///
/// The appliance is named by an identity token of the form
/// `appname-version-codename-arch`, e.g. `core-16.2-jessie-amd64`.  The
/// matching ISO is downloaded and verified if not already cached, its root
/// filesystem is extracted, patched for EC2 and imaged, and the resulting
/// AMI is registered.
///
/// Region replication and marketplace sharing are only honored for stable
/// versions (digits and dots), unless `--force` is given.
#[derive(Debug, Parser)]
#[clap(name = "tkl-ec2")]
#[clap(rename_all = "kebab-case")]
pub(crate) struct Opt {
    /// Appliance identity token (appname-version-codename-arch)
    pub(crate) app_version: String,

    /// Use as the artifact name basis instead of turnkey-appname-version
    #[clap(long)]
    pub(crate) name: Option<String>,

    /// Copy the registered AMI to all other regions
    #[clap(long)]
    pub(crate) copy: bool,

    /// Upload the build log and metadata to the configured destinations
    #[clap(long)]
    pub(crate) publish: bool,

    /// Share the AMI for marketplace listing
    #[clap(long)]
    pub(crate) marketplace: bool,

    /// Honor --copy/--marketplace even for a non-stable version
    #[clap(long)]
    pub(crate) force: bool,

    /// Install security updates before imaging
    #[clap(long)]
    pub(crate) secupdates: bool,

    /// Apply all updates and bump the version tag (e.g. 16.2 -> 16.2.1)
    #[clap(long)]
    pub(crate) increment: bool,

    /// Apply the paravirtual compatibility shim patch
    #[clap(long)]
    pub(crate) pvmshim: bool,

    /// Also register a paravirtual-mode image variant
    #[clap(long)]
    pub(crate) pvmregister: bool,
}

impl Opt {
    /// The raw flag set, before resolution.
    pub(crate) fn flags(&self) -> FlagSet {
        FlagSet {
            copy: self.copy,
            marketplace: self.marketplace,
            publish: self.publish,
            force: self.force,
            sec_updates: self.secupdates,
            increment: self.increment,
            pvm_shim: self.pvmshim,
            pvm_register: self.pvmregister,
            name_override: self.name.clone(),
        }
    }
}

/// Parse the arguments and run the conversion.
///
/// Usage errors print clap's rendition and exit 1; `--help` and friends
/// exit 0.
pub async fn run_from_iter<I>(args: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    let opt = match Opt::try_parse_from(args) {
        Ok(opt) => opt,
        Err(e) => {
            e.print().map_err(anyhow::Error::from)?;
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    crate::convert::run(opt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let opt = Opt::try_parse_from([
            "tkl-ec2",
            "--copy",
            "--secupdates",
            "--name=tkl-core-test",
            "core-16.2-jessie-amd64",
        ])
        .unwrap();
        assert_eq!(opt.app_version, "core-16.2-jessie-amd64");
        let flags = opt.flags();
        assert!(flags.copy);
        assert!(flags.sec_updates);
        assert!(!flags.marketplace);
        assert_eq!(flags.name_override.as_deref(), Some("tkl-core-test"));
    }

    #[test]
    fn test_identity_is_required() {
        assert!(Opt::try_parse_from(["tkl-ec2", "--copy"]).is_err());
        // A second positional is rejected
        assert!(Opt::try_parse_from(["tkl-ec2", "a-1-x-amd64", "b-2-y-amd64"]).is_err());
    }
}
