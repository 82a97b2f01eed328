//! Build configuration, captured from the environment once at startup.

use anyhow::Result;
use camino::Utf8PathBuf;
use fn_error_context::context;

/// Default patch directory for an installed tool; `BT_PATCHES` overrides.
const DEFAULT_PATCHES: &str = "/usr/share/tkl-ec2/patches";

/// Immutable configuration threaded through the pipeline.  Nothing reads
/// the process environment after this is constructed.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// Root of the builds output tree; EC2 artifacts land in `ec2/` below it.
    pub(crate) builds: Utf8PathBuf,
    /// Local ISO cache directory.
    pub(crate) isos: Utf8PathBuf,
    /// Directory holding the tklpatch trees (`ec2`, `pvmshim`).
    pub(crate) patches: Utf8PathBuf,
    /// Destination for published buildenv metadata.
    pub(crate) publish_meta: Option<String>,
    /// Destination for published build logs.
    pub(crate) publish_logs: Option<String>,
    /// Retain working directories after the build.
    pub(crate) debug: bool,
}

impl Config {
    /// Capture configuration from the process environment.  The publish
    /// destinations are only required when `--publish` was given.
    #[context("Reading configuration from environment")]
    pub(crate) fn from_env(publish: bool) -> Result<Self> {
        Self::from_lookup(publish, |k| std::env::var(k).ok())
    }

    fn from_lookup(publish: bool, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("Required environment variable {key} is not set"))
        };
        let publish_meta = if publish {
            Some(required("BT_PUBLISH_META")?)
        } else {
            lookup("BT_PUBLISH_META")
        };
        let publish_logs = if publish {
            Some(required("BT_PUBLISH_LOGS")?)
        } else {
            lookup("BT_PUBLISH_LOGS")
        };
        Ok(Self {
            builds: required("BT_BUILDS")?.into(),
            isos: required("BT_ISOS")?.into(),
            patches: lookup("BT_PATCHES")
                .unwrap_or_else(|| DEFAULT_PATCHES.to_string())
                .into(),
            publish_meta,
            publish_logs,
            debug: lookup("BT_DEBUG").is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([("BT_BUILDS", "/mnt/builds"), ("BT_ISOS", "/mnt/isos")])
    }

    fn config_from(publish: bool, env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(publish, |k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_minimal() {
        let c = config_from(false, &base_env()).unwrap();
        assert_eq!(c.builds, "/mnt/builds");
        assert_eq!(c.isos, "/mnt/isos");
        assert_eq!(c.patches, DEFAULT_PATCHES);
        assert!(c.publish_meta.is_none());
        assert!(!c.debug);
    }

    #[test]
    fn test_missing_required() {
        let mut env = base_env();
        env.remove("BT_ISOS");
        let err = config_from(false, &env).unwrap_err();
        assert!(err.to_string().contains("BT_ISOS"), "{err}");
    }

    #[test]
    fn test_publish_requires_destinations() {
        let err = config_from(true, &base_env()).unwrap_err();
        assert!(err.to_string().contains("BT_PUBLISH"), "{err}");
        let mut env = base_env();
        env.insert("BT_PUBLISH_META", "s3://tkl/meta");
        env.insert("BT_PUBLISH_LOGS", "s3://tkl/logs");
        let c = config_from(true, &env).unwrap();
        assert_eq!(c.publish_meta.as_deref(), Some("s3://tkl/meta"));
        assert_eq!(c.publish_logs.as_deref(), Some("s3://tkl/logs"));
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("BT_PATCHES", "/srv/patches");
        env.insert("BT_DEBUG", "1");
        let c = config_from(false, &env).unwrap();
        assert_eq!(c.patches, "/srv/patches");
        assert!(c.debug);
    }
}
