use std::{
    ffi::OsStr,
    fs::File,
    process::{Command, Stdio},
};

use anyhow::{Context, Result};
use camino::Utf8Path;

use crate::buildlog::BuildLog;

/// One external build step.  Announces itself on stdout, optionally tees
/// the child's output into the build log, and treats a nonzero exit status
/// as a fatal error.
pub(crate) struct Task {
    description: String,
    quiet: bool,
    logfile: Option<File>,
    cmd: Command,
}

impl Task {
    pub(crate) fn new(description: impl AsRef<str>, exe: impl AsRef<str>) -> Self {
        let description = description.as_ref().to_string();
        let mut cmd = Command::new(exe.as_ref());
        // Default to noninteractive
        cmd.stdin(Stdio::null());
        Self {
            description,
            quiet: false,
            logfile: None,
            cmd,
        }
    }

    pub(crate) fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub(crate) fn args<S: AsRef<OsStr>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.cmd.args(args);
        self
    }

    pub(crate) fn env(mut self, k: impl AsRef<OsStr>, v: impl AsRef<OsStr>) -> Self {
        self.cmd.env(k, v);
        self
    }

    pub(crate) fn cwd(mut self, dir: &Utf8Path) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    /// Tee the child's output into the build log.
    pub(crate) fn log_to(mut self, log: &BuildLog) -> Result<Self> {
        log.line(&format!("+ {}", self.description))?;
        self.logfile = Some(log.file_clone()?);
        Ok(self)
    }

    /// Run the command, returning an error if it does not exit successfully.
    pub(crate) fn run(self) -> Result<()> {
        let description = self.description;
        let mut cmd = self.cmd;
        if !self.quiet {
            println!("{description}");
        }
        if let Some(f) = self.logfile {
            cmd.stdout(Stdio::from(f.try_clone()?));
            cmd.stderr(Stdio::from(f));
        }
        tracing::debug!("exec: {cmd:?}");
        let st = cmd.status()?;
        if !st.success() {
            anyhow::bail!("Task {description} failed: {st:?}");
        }
        Ok(())
    }

    /// Like [`run()`], but return stdout.  With a log attached only stderr
    /// is teed; stdout is the return value.
    pub(crate) fn read(self) -> Result<String> {
        let description = self.description;
        let mut cmd = self.cmd;
        if !self.quiet {
            println!("{description}");
        }
        cmd.stdout(Stdio::piped());
        if let Some(f) = self.logfile {
            cmd.stderr(Stdio::from(f));
        }
        tracing::debug!("exec: {cmd:?}");
        let child = cmd
            .spawn()
            .with_context(|| format!("Spawning {description} failed"))?;
        let o = child
            .wait_with_output()
            .with_context(|| format!("Executing {description} failed"))?;
        let st = o.status;
        if !st.success() {
            anyhow::bail!("Task {description} failed: {st:?}");
        }
        Ok(String::from_utf8(o.stdout)?)
    }
}
