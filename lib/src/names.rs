//! Deterministic artifact naming.

use crate::identity::BuildIdentity;

/// Output artifact names, all derived from a single stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArtifactNames {
    /// The `version-codename-arch` tag.
    pub(crate) tag: String,
    /// The displayed build name; also the stem of every filename below.
    pub(crate) name: String,
    pub(crate) rootfs: String,
    pub(crate) cdroot: String,
    pub(crate) iso: String,
    pub(crate) log: String,
    pub(crate) buildenv: String,
}

impl ArtifactNames {
    /// Derive the full name set.  Pure string composition.
    ///
    /// The increment scheme appends a literal `.1`: it is not a counter, so
    /// two incremented runs of the same version produce the same tag.
    pub(crate) fn derive(
        identity: &BuildIdentity,
        increment: bool,
        name_override: Option<&str>,
    ) -> Self {
        let version = if increment {
            format!("{}.1", identity.version)
        } else {
            identity.version.clone()
        };
        let tag = format!("{version}-{}-{}", identity.codename, identity.arch);
        let name = match name_override {
            Some(name) => name.to_string(),
            None => format!("turnkey-{}-{tag}", identity.app_name),
        };
        Self {
            tag,
            rootfs: format!("{name}.rootfs"),
            cdroot: format!("{name}.cdroot"),
            iso: format!("{name}.iso"),
            log: format!("{name}.log"),
            buildenv: format!("{name}.ec2.buildenv"),
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> BuildIdentity {
        BuildIdentity::parse("core-16.2-jessie-amd64").unwrap()
    }

    #[test]
    fn test_derive() {
        let n = ArtifactNames::derive(&core(), false, None);
        assert_eq!(n.tag, "16.2-jessie-amd64");
        assert_eq!(n.name, "turnkey-core-16.2-jessie-amd64");
        assert_eq!(n.rootfs, "turnkey-core-16.2-jessie-amd64.rootfs");
        assert_eq!(n.cdroot, "turnkey-core-16.2-jessie-amd64.cdroot");
        assert_eq!(n.iso, "turnkey-core-16.2-jessie-amd64.iso");
        assert_eq!(n.log, "turnkey-core-16.2-jessie-amd64.log");
        assert_eq!(n.buildenv, "turnkey-core-16.2-jessie-amd64.ec2.buildenv");
    }

    #[test]
    fn test_derive_increment() {
        let n = ArtifactNames::derive(&core(), true, None);
        assert_eq!(n.tag, "16.2.1-jessie-amd64");
        assert_eq!(n.name, "turnkey-core-16.2.1-jessie-amd64");
        // Deriving again does not stack another suffix
        let again = ArtifactNames::derive(&core(), true, None);
        assert_eq!(again.tag, n.tag);
    }

    #[test]
    fn test_derive_name_override() {
        let n = ArtifactNames::derive(&core(), false, Some("tkl-core-test"));
        assert_eq!(n.name, "tkl-core-test");
        assert_eq!(n.rootfs, "tkl-core-test.rootfs");
        // The tag is identity-derived either way
        assert_eq!(n.tag, "16.2-jessie-amd64");
    }
}
