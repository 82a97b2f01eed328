//! Option resolution policy.
//!
//! The raw command line flags go through two narrowing rules before any
//! side-effecting step runs: the `--secupdates`/`--increment` conflict, and
//! the suppression of release-only operations for non-stable versions.

use crate::identity::VersionClass;
use crate::utils::visible_warning;

/// Flags as given on the command line, before resolution.
#[derive(Debug, Clone, Default)]
pub(crate) struct FlagSet {
    pub(crate) copy: bool,
    pub(crate) marketplace: bool,
    pub(crate) publish: bool,
    pub(crate) force: bool,
    pub(crate) sec_updates: bool,
    pub(crate) increment: bool,
    pub(crate) pvm_shim: bool,
    pub(crate) pvm_register: bool,
    pub(crate) name_override: Option<String>,
}

/// Flags after resolution.  Resolution only ever narrows the raw set; it
/// never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EffectiveFlagSet {
    pub(crate) copy: bool,
    pub(crate) marketplace: bool,
    pub(crate) publish: bool,
    pub(crate) sec_updates: bool,
    pub(crate) increment: bool,
    pub(crate) pvm_shim: bool,
    pub(crate) pvm_register: bool,
    pub(crate) name_override: Option<String>,
}

impl FlagSet {
    /// Apply the resolution rules, warning about anything that was ignored.
    pub(crate) fn resolve(self, class: VersionClass) -> EffectiveFlagSet {
        let mut r = EffectiveFlagSet {
            copy: self.copy,
            marketplace: self.marketplace,
            publish: self.publish,
            sec_updates: self.sec_updates,
            increment: self.increment,
            pvm_shim: self.pvm_shim,
            pvm_register: self.pvm_register,
            name_override: self.name_override,
        };
        if r.sec_updates && r.increment {
            // --increment applies all updates, a superset of the security set
            visible_warning("--secupdates is implied by --increment; ignoring --secupdates");
            r.sec_updates = false;
        }
        if class == VersionClass::NonStable {
            if !self.force {
                if r.copy {
                    visible_warning("--copy ignored for non-stable version (--force overrides)");
                    r.copy = false;
                }
                if r.marketplace {
                    visible_warning(
                        "--marketplace ignored for non-stable version (--force overrides)",
                    );
                    r.marketplace = false;
                }
            } else if r.copy || r.marketplace {
                visible_warning("honoring --copy/--marketplace for non-stable version (--force)");
            }
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_set() -> FlagSet {
        FlagSet {
            copy: true,
            marketplace: true,
            publish: true,
            force: false,
            sec_updates: true,
            increment: true,
            pvm_shim: true,
            pvm_register: true,
            name_override: None,
        }
    }

    #[test]
    fn test_increment_overrides_secupdates() {
        let r = all_set().resolve(VersionClass::Stable);
        assert!(!r.sec_updates);
        assert!(r.increment);
        // --secupdates alone is untouched
        let r = FlagSet {
            sec_updates: true,
            increment: false,
            ..Default::default()
        }
        .resolve(VersionClass::Stable);
        assert!(r.sec_updates);
    }

    #[test]
    fn test_nonstable_suppresses_release_flags() {
        let r = all_set().resolve(VersionClass::NonStable);
        assert!(!r.copy);
        assert!(!r.marketplace);
        // Unrelated flags pass through
        assert!(r.publish);
        assert!(r.pvm_shim);
        assert!(r.pvm_register);
    }

    #[test]
    fn test_force_overrides_suppression() {
        let mut raw = all_set();
        raw.force = true;
        let r = raw.resolve(VersionClass::NonStable);
        assert!(r.copy);
        assert!(r.marketplace);
    }

    #[test]
    fn test_stable_passes_through() {
        for force in [false, true] {
            let mut raw = all_set();
            raw.force = force;
            raw.sec_updates = false;
            let r = raw.clone().resolve(VersionClass::Stable);
            assert!(r.copy);
            assert!(r.marketplace);
            raw.copy = false;
            raw.marketplace = false;
            let r = raw.resolve(VersionClass::Stable);
            assert!(!r.copy);
            assert!(!r.marketplace);
        }
    }
}
