//! Build identity parsing, version classification and architecture checks.

use anyhow::Result;

/// The input token did not decompose into app, version, codename and arch.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed identity {0:?} (expected appname-version-codename-arch)")]
pub(crate) struct MalformedIdentity(pub(crate) String);

/// The appliance targets a different architecture than the host.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("appliance architecture {appliance} does not match host architecture {host}")]
pub(crate) struct ArchMismatch {
    pub(crate) appliance: String,
    pub(crate) host: String,
}

/// Canonical build identity, parsed once from an `appname-version` token
/// such as `core-16.2-jessie-amd64`.  Immutable after parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuildIdentity {
    pub(crate) app_name: String,
    pub(crate) version: String,
    pub(crate) codename: String,
    pub(crate) arch: String,
}

impl BuildIdentity {
    /// Split the token from the right: appliance names may themselves
    /// contain dashes, but version, codename and arch never do.
    pub(crate) fn parse(raw: &str) -> Result<Self, MalformedIdentity> {
        let mut fields = raw.rsplitn(4, '-');
        let arch = fields.next();
        let codename = fields.next();
        let version = fields.next();
        let app_name = fields.next();
        match (app_name, version, codename, arch) {
            (Some(app), Some(version), Some(codename), Some(arch))
                if ![app, version, codename, arch].iter().any(|s| s.is_empty()) =>
            {
                Ok(Self {
                    app_name: app.to_string(),
                    version: version.to_string(),
                    codename: codename.to_string(),
                    arch: arch.to_string(),
                })
            }
            _ => Err(MalformedIdentity(raw.to_string())),
        }
    }
}

/// Stability classification of a version string; governs whether region
/// replication and marketplace sharing are honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VersionClass {
    /// Digits and dots only, e.g. `16.2`.
    Stable,
    /// Anything else, e.g. `16.2rc1`.
    NonStable,
}

/// Classify a version string.  Total over any input.
pub(crate) fn classify_version(version: &str) -> VersionClass {
    let stable = regex::Regex::new(r"^[0-9.]+$").unwrap();
    if stable.is_match(version) {
        VersionClass::Stable
    } else {
        VersionClass::NonStable
    }
}

/// The Debian architecture name for the host this tool is running on.
pub(crate) fn host_architecture() -> Result<&'static str> {
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "i386",
        other => anyhow::bail!("Unsupported host architecture {other}"),
    };
    Ok(arch)
}

/// Refuse to build an appliance for a foreign architecture.  Checked before
/// any mutating step; the chroot phase cannot work across architectures.
pub(crate) fn validate_architecture(
    identity: &BuildIdentity,
    host_arch: &str,
) -> Result<(), ArchMismatch> {
    if identity.arch != host_arch {
        return Err(ArchMismatch {
            appliance: identity.arch.clone(),
            host: host_arch.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(raw: &str) -> BuildIdentity {
        BuildIdentity::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_identity() {
        let id = ident("core-16.2-jessie-amd64");
        assert_eq!(id.app_name, "core");
        assert_eq!(id.version, "16.2");
        assert_eq!(id.codename, "jessie");
        assert_eq!(id.arch, "amd64");
        // Appliance names can carry dashes of their own
        let id = ident("odoo-payroll-17.1-bookworm-arm64");
        assert_eq!(id.app_name, "odoo-payroll");
        assert_eq!(id.version, "17.1");
        assert_eq!(id.codename, "bookworm");
        assert_eq!(id.arch, "arm64");
    }

    #[test]
    fn test_parse_identity_malformed() {
        for raw in ["", "core", "core-16.2", "core-16.2-jessie", "-16.2-jessie-amd64", "core-16.2--amd64"] {
            assert_eq!(
                BuildIdentity::parse(raw),
                Err(MalformedIdentity(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_classify_version() {
        for v in ["16.2", "17", "16.2.1", "1.0.0.0"] {
            assert_eq!(classify_version(v), VersionClass::Stable, "{v}");
        }
        for v in ["16.2rc1", "16.2-beta", "rc1", "", "16.2 "] {
            assert_eq!(classify_version(v), VersionClass::NonStable, "{v:?}");
        }
    }

    #[test]
    fn test_validate_architecture() {
        let id = ident("core-16.2-jessie-amd64");
        assert!(validate_architecture(&id, "amd64").is_ok());
        let err = validate_architecture(&id, "arm64").unwrap_err();
        assert_eq!(err.appliance, "amd64");
        assert_eq!(err.host, "arm64");
    }
}
