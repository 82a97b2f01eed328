//! Build metadata (`.ec2.buildenv`).

use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use fn_error_context::context;

/// Metadata recorded for each completed build, published alongside the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuildEnv {
    pub(crate) name: String,
    pub(crate) app_name: String,
    pub(crate) tag: String,
    pub(crate) ami_id: String,
    pub(crate) created: DateTime<Utc>,
}

impl BuildEnv {
    /// Render as the traditional key=value format.
    pub(crate) fn render(&self) -> String {
        let created = self.created.format("%Y-%m-%d %H:%M:%S");
        format!(
            "BUILD_NAME={}\nBUILD_APP={}\nBUILD_VERSION_TAG={}\nBUILD_AMI_ID={}\nBUILD_STAMP={created}\n",
            self.name, self.app_name, self.tag, self.ami_id
        )
    }

    #[context("Writing buildenv {path}")]
    pub(crate) fn write(&self, path: &Utf8Path) -> Result<()> {
        std::fs::write(path, self.render()).context("Writing file")
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_render() {
        let env = BuildEnv {
            name: "turnkey-core-16.2-jessie-amd64".into(),
            app_name: "core".into(),
            tag: "16.2-jessie-amd64".into(),
            ami_id: "ami-0123456789abcdef0".into(),
            created: DateTime::from_timestamp(1700000000, 0).unwrap(),
        };
        let expected = "BUILD_NAME=turnkey-core-16.2-jessie-amd64\n\
                        BUILD_APP=core\n\
                        BUILD_VERSION_TAG=16.2-jessie-amd64\n\
                        BUILD_AMI_ID=ami-0123456789abcdef0\n\
                        BUILD_STAMP=2023-11-14 22:13:20\n";
        assert_eq!(env.render(), expected);
    }
}
