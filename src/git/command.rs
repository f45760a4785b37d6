//! Structured `git` subprocess runner
//!
//! Every command is an argument list handed to `std::process::Command`; no
//! shell is involved, so branch names and messages are never re-parsed.

use crate::error::{FlowError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Captured result of a git invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs git against one working directory
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        GitCli {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Check that the working directory is inside a git repository
    pub fn open(workdir: impl Into<PathBuf>) -> Result<Self> {
        let git = GitCli::new(workdir);
        let output = git.output(&["rev-parse", "--git-dir"])?;
        if !output.success {
            return Err(FlowError::backend(format!(
                "{} is not a git repository: {}",
                git.workdir.display(),
                output.stderr.trim()
            )));
        }
        Ok(git)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.workdir);

        // Stable, non-interactive output
        cmd.env("LC_ALL", "C");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.arg("-c").arg("core.quotePath=false");

        cmd
    }

    /// Run git and capture its output whatever the exit status
    pub fn output(&self, args: &[&str]) -> Result<GitOutput> {
        debug!(workdir = %self.workdir.display(), args = ?args, "git");

        let output = self.command().args(args).output().map_err(|e| {
            FlowError::backend(format!("failed to execute git {}: {}", args.join(" "), e))
        })?;

        Ok(GitOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run git and return trimmed stdout, failing on a non-zero exit
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.success {
            return Err(FlowError::backend(format!(
                "git {} failed with exit code {}: {}",
                args.join(" "),
                output.code.unwrap_or(-1),
                output.stderr.trim()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Run git and return trimmed stdout, or `default` on a non-zero exit
    pub fn run_or(&self, args: &[&str], default: &str) -> Result<String> {
        let output = self.output(args)?;
        if output.success {
            Ok(output.stdout.trim().to_string())
        } else {
            Ok(default.to_string())
        }
    }

    /// Whether git exits successfully
    pub fn succeeds(&self, args: &[&str]) -> Result<bool> {
        Ok(self.output(args)?.success)
    }

    /// Run git and split stdout into non-empty lines
    pub fn lines(&self, args: &[&str]) -> Result<Vec<String>> {
        Ok(self
            .run(args)?
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}
