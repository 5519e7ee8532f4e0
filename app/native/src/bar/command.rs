//! Shell command execution.
//!
//! Every user-supplied command (block, tail, click and menu commands) runs as
//! `<shell> -c <command>`. Children are killed when their handle is dropped,
//! which is how cancelling a block stops its in-flight process.

use std::ffi::OsStr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::core::constants::DEFAULT_SHELL;
use crate::core::{Error, Result};

/// Runs commands through a configurable shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRunner {
    shell: PathBuf,
}

impl Default for CommandRunner {
    fn default() -> Self { Self::new(DEFAULT_SHELL) }
}

impl CommandRunner {
    /// Creates a runner using `shell`.
    pub fn new(shell: impl Into<PathBuf>) -> Self { Self { shell: shell.into() } }

    /// Returns the shell used to run commands.
    #[must_use]
    pub fn shell(&self) -> &Path { &self.shell }

    fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(script).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Runs `script` to completion and returns its trimmed stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shell`] if the shell cannot be started or the command
    /// exits unsuccessfully.
    pub async fn output(&self, script: &str) -> Result<String> {
        let output = self
            .command(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| Error::shell(format!("failed to run '{script}': {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::shell(format!(
                "'{script}' exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Starts `script` with stdout piped for line-by-line reading.
    ///
    /// Stderr is inherited so diagnostics reach the bar's own stderr.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shell`] if the shell cannot be started.
    pub fn spawn_streaming(&self, script: &str) -> Result<Child> {
        self.command(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| Error::shell(format!("failed to start '{script}': {err}")))
    }

    /// Runs `script` to completion, discarding its stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shell`] if the shell cannot be started or the command
    /// exits unsuccessfully.
    pub async fn run(&self, script: &str) -> Result<()> {
        let status = self
            .command(script)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|err| Error::shell(format!("failed to run '{script}': {err}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::shell(format!("'{script}' exited with {status}")))
        }
    }

    /// Runs `script` in the background and logs the outcome.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_detached(&self, script: &str, context: &str) {
        let runner = self.clone();
        let script = script.to_string();
        let context = context.to_string();

        tokio::spawn(async move {
            match runner.run(&script).await {
                Ok(()) => tracing::debug!(%context, command = %script, "command finished"),
                Err(err) => tracing::warn!(%context, error = %err, "command failed"),
            }
        });
    }

    /// Runs the startup configuration script with output inherited.
    ///
    /// Executable scripts run directly so their shebang is honored; anything
    /// else is handed to the shell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the script is missing, cannot be started,
    /// or exits unsuccessfully.
    pub async fn run_script<I, K, V>(&self, path: &Path, envs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| Error::config(format!("cannot read {}: {err}", path.display())))?;

        let mut cmd = if metadata.permissions().mode() & 0o111 != 0 {
            Command::new(path)
        } else {
            let mut cmd = Command::new(&self.shell);
            cmd.arg(path);
            cmd
        };

        let status = cmd
            .envs(envs)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|err| Error::config(format!("failed to run {}: {err}", path.display())))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::config(format!("{} exited with {status}", path.display())))
        }
    }
}
