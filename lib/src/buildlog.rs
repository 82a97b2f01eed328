//! The per-build log file.
//!
//! Every external step has its output teed here so a failed build can be
//! diagnosed (and published) after the fact.

use std::fs::File;
use std::io::Write;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Append-only log capturing the output of every external build step.
#[derive(Debug)]
pub(crate) struct BuildLog {
    file: File,
    path: Utf8PathBuf,
}

impl BuildLog {
    /// Create (or truncate) the log file and write its header line.
    pub(crate) fn create(path: &Utf8Path, name: &str) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("Creating {path}"))?;
        let log = Self {
            file,
            path: path.to_owned(),
        };
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        log.line(&format!("# {name} ({now} UTC)"))?;
        Ok(log)
    }

    /// Append one line of our own commentary.
    pub(crate) fn line(&self, msg: &str) -> Result<()> {
        let mut f = &self.file;
        writeln!(f, "{msg}").with_context(|| format!("Writing {}", self.path))
    }

    /// A duplicate handle for wiring a child process stdout/stderr here.
    pub(crate) fn file_clone(&self) -> Result<File> {
        self.file.try_clone().map_err(Into::into)
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines() -> Result<()> {
        let td = tempfile::tempdir()?;
        let path = Utf8PathBuf::try_from(td.path().join("build.log"))?;
        let log = BuildLog::create(&path, "turnkey-core-16.2-jessie-amd64")?;
        log.line("step one")?;
        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.starts_with("# turnkey-core-16.2-jessie-amd64 ("));
        assert!(contents.ends_with("step one\n"));
        assert_eq!(log.path(), path);
        Ok(())
    }
}
