//! Type-safe platform CLI command builder
//!
//! This module provides a fluent API for building and executing invocations
//! of the platform's command-line binary, ensuring consistent timeout
//! handling, output capture, and error context across the harness. Every
//! external call the harness makes goes through [`PlatformCommand`], which
//! is what lets the tests swap the real binary for a scripted stand-in.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::HarnessError;

/// Builder for constructing and executing platform CLI commands
///
/// New commands default to output capture and a 5 minute timeout, which
/// covers everything short of a full deployment wait (the deployment waiter
/// does its own polling with short individual commands).
///
/// # Examples
///
/// ```rust,ignore
/// let output = PlatformCommand::new("/usr/local/bin/dcos")
///     .args(["package", "describe", "hello-world"])
///     .execute()
///     .await?;
/// ```
#[derive(Debug)]
pub struct PlatformCommand {
    /// Path to the platform CLI binary
    binary: PathBuf,

    /// Arguments to pass to the binary
    args: Vec<String>,

    /// Whether to capture output (true) or inherit stdio (false)
    capture_output: bool,

    /// Environment variables to set for the child process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Optional context string for log messages
    context: Option<String>,
}

/// Captured result of a completed platform CLI command
#[derive(Debug, Clone)]
pub struct PlatformOutput {
    /// Exit code, when the process exited normally
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// The command line that produced this output, for error reporting
    pub command: String,
}

impl PlatformOutput {
    /// Whether the command exited zero
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output with trailing whitespace removed
    #[must_use]
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim_end()
    }

    /// Convert a non-zero exit into a [`HarnessError::CommandFailed`]
    pub fn require_success(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(HarnessError::CommandFailed {
                command: self.command,
                code: self.code,
                stderr: self.stderr,
            }
            .into())
        }
    }
}

impl PlatformCommand {
    /// Create a command for the given CLI binary with default settings
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            args: Vec::new(),
            capture_output: true,
            env_vars: Vec::new(),
            timeout_duration: Some(Duration::from_secs(300)),
            context: None,
        }
    }

    /// Add a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Disable output capture and inherit the parent's stdio
    ///
    /// Used for long installs where streaming the platform CLI's own
    /// progress output to the user is more helpful than capturing it.
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Set a custom timeout (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a context label included in log messages
    ///
    /// Typically the service name, so interleaved log output from a long
    /// flow stays attributable.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Render the command line for logs and error messages
    fn render(&self) -> String {
        let mut line = self.binary.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Execute the command and return its captured output
    ///
    /// A non-zero exit is *not* an error here; callers that need one use
    /// [`PlatformOutput::require_success`] or [`execute_success`]. The
    /// version resolver in particular treats non-zero exits as retryable.
    ///
    /// [`execute_success`]: Self::execute_success
    pub async fn execute(self) -> Result<PlatformOutput> {
        let rendered = self.render();
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args);

        if let Some(ref ctx) = self.context {
            tracing::debug!(target: "platform", "({}) Executing command: {}", ctx, rendered);
        } else {
            tracing::debug!(target: "platform", "Executing command: {}", rendered);
        }

        for (key, value) in &self.env_vars {
            tracing::trace!(target: "platform", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let output_future = cmd.output();

        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.with_context(|| format!("Failed to execute {rendered}"))?
            } else {
                tracing::warn!(
                    target: "platform",
                    "Command timed out after {} seconds: {}",
                    duration.as_secs(),
                    rendered
                );
                return Err(HarnessError::CommandFailed {
                    command: rendered,
                    code: None,
                    stderr: format!(
                        "Command timed out after {} seconds. The cluster may be \
                         unreachable or the CLI may be waiting for input.",
                        duration.as_secs()
                    ),
                }
                .into());
            }
        } else {
            output_future.await.with_context(|| format!("Failed to execute {rendered}"))?
        };

        let result = PlatformOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command: rendered,
        };

        if result.success() {
            tracing::trace!(target: "platform", "Command succeeded: {}", result.command);
        } else {
            tracing::debug!(
                target: "platform",
                "Command exited {:?}: {}\nstderr: {}",
                result.code,
                result.command,
                result.stderr.trim_end()
            );
        }

        Ok(result)
    }

    /// Execute the command and require a zero exit status
    pub async fn execute_success(self) -> Result<PlatformOutput> {
        self.execute().await?.require_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_binary_and_args() {
        let cmd = PlatformCommand::new("/opt/cli").args(["package", "describe", "kafka"]);
        assert_eq!(cmd.render(), "/opt/cli package describe kafka");
    }

    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let output = PlatformCommand::new("echo").arg("hello").execute().await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_trimmed(), "hello");
    }

    #[tokio::test]
    async fn test_execute_reports_nonzero_exit_without_error() {
        let output = PlatformCommand::new("false").execute().await.unwrap();
        assert!(!output.success());
        assert_eq!(output.code, Some(1));
    }

    #[tokio::test]
    async fn test_execute_success_maps_to_command_failed() {
        let err = PlatformCommand::new("false").execute_success().await.unwrap_err();
        let harness = err.downcast::<HarnessError>().unwrap();
        assert!(matches!(harness, HarnessError::CommandFailed { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_timeout_produces_command_failed() {
        let err = PlatformCommand::new("sleep")
            .arg("5")
            .with_timeout(Some(Duration::from_millis(50)))
            .execute()
            .await
            .unwrap_err();
        let harness = err.downcast::<HarnessError>().unwrap();
        match harness {
            HarnessError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, None);
                assert!(stderr.contains("timed out"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
