//! Error handling for uplift
//!
//! This module provides the error types and user-friendly error reporting for
//! the upgrade harness. The error system is built on two types:
//!
//! - [`HarnessError`] - enumerated error types for every failure mode the
//!   harness can abort on
//! - [`ErrorContext`] - wrapper that adds user-friendly suggestions and
//!   details for CLI display
//!
//! # Error Categories
//!
//! - **Version resolution**: [`HarnessError::VersionUnavailable`],
//!   [`HarnessError::VersionDidNotChange`] - the fixed-interval retry
//!   ceilings were exhausted without a usable answer from the package index.
//! - **Repository mutation**: [`HarnessError::RepositoryMutationFailed`] -
//!   assertion-level, never retried; every later install depends on the
//!   repository list being in the expected state.
//! - **Capability contract**: [`HarnessError::CapabilityViolation`] - the
//!   caller asked for an in-place update the connected cluster cannot
//!   perform. A programming error in the calling test, not a runtime fault.
//! - **External commands**: [`HarnessError::CliNotFound`],
//!   [`HarnessError::CommandFailed`].
//! - **Deployment**: [`HarnessError::DeploymentTimeout`],
//!   [`HarnessError::TasksMismatch`].
//!
//! Use [`user_friendly_error`] to convert any [`anyhow::Error`] into a
//! displayable context with suggestions.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for uplift operations
///
/// Each variant represents a distinct, non-retryable failure mode. Transient
/// conditions never appear here; they are consumed by the retry policies in
/// [`crate::retry`] and only become one of these variants once a ceiling is
/// exhausted.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The package index never served a usable version for a package
    ///
    /// Raised when the describe-package retry budget is exhausted. Transient
    /// CLI failures, unparseable output, and responses with no version field
    /// in either known location all count as retryable misses on the way
    /// here.
    #[error("No version could be resolved for package '{package}'")]
    VersionUnavailable {
        /// Package whose version could not be resolved
        package: String,
    },

    /// The resolvable version of a package never changed
    ///
    /// Raised after a repository priority change when the package index kept
    /// serving the previous version until the polling ceiling was hit.
    #[error("Version of package '{package}' did not change from '{previous}'")]
    VersionDidNotChange {
        /// Package being polled
        package: String,
        /// Version the index kept serving
        previous: String,
    },

    /// A package repository add/remove operation failed
    ///
    /// This is fatal and never retried: if the repository list is not in the
    /// expected state, every subsequent install resolves against the wrong
    /// stream.
    #[error("Repository {operation} failed for repo '{name}'")]
    RepositoryMutationFailed {
        /// The mutation that failed ("add", "remove", or "lookup")
        operation: String,
        /// Name of the repository
        name: String,
    },

    /// The caller requested an update path the cluster does not support
    ///
    /// A contract violation in the calling test, not a runtime condition:
    /// capability predicates must be consulted before requesting an in-place
    /// version or options update.
    #[error("Unsupported update requested: {reason}")]
    CapabilityViolation {
        /// Which capability is missing and why
        reason: String,
    },

    /// The platform CLI binary could not be found
    #[error("Platform CLI '{binary}' not found in PATH")]
    CliNotFound {
        /// The binary name or path that was looked up
        binary: String,
    },

    /// An external platform CLI command exited non-zero
    #[error("Command failed: {command}")]
    CommandFailed {
        /// The command line that was executed
        command: String,
        /// Exit code, when the process exited at all
        code: Option<i32>,
        /// Captured standard error output
        stderr: String,
    },

    /// The deployment plan never reported completion within the budget
    #[error("Deployment plan for service '{service}' did not complete within {timeout_secs}s")]
    DeploymentTimeout {
        /// Service whose plan was being polled
        service: String,
        /// The configured budget in seconds
        timeout_secs: u64,
    },

    /// The task-id set did not behave as the config comparison predicted
    ///
    /// An unchanged config snapshot must leave the task set untouched and a
    /// changed snapshot must replace it. Either mismatch means the platform's
    /// deployment engine broke its restart contract.
    #[error("Task set for service '{service}' {observed}, but {expected} was expected")]
    TasksMismatch {
        /// Service whose tasks were checked
        service: String,
        /// What actually happened ("changed" or "did not change")
        observed: String,
        /// What the config comparison predicted
        expected: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

/// Wrapper that pairs a [`HarnessError`] with user-facing guidance
///
/// Suggestions are actionable steps (displayed green), details explain what
/// the error means (displayed yellow). This is how the CLI presents every
/// terminal failure.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying harness error
    pub error: HarnessError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details
    #[must_use]
    pub const fn new(error: HarnessError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with suggestions
///
/// Recognizes [`HarnessError`] variants and maps each to tailored guidance;
/// everything else is rendered generically with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // Take ownership of typed errors so the context can carry them.
    let error = match error.downcast::<HarnessError>() {
        Ok(harness_error) => return create_error_context(harness_error),
        Err(other) => other,
    };

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(HarnessError::Other { message })
}

/// Map each [`HarnessError`] variant to tailored suggestions and details
fn create_error_context(error: HarnessError) -> ErrorContext {
    match &error {
        HarnessError::VersionUnavailable { package } => {
            let details = format!(
                "The package index never returned a parseable version for '{package}' \
                 within the retry budget"
            );
            ErrorContext::new(error)
                .with_suggestion(
                    "Check that the package exists in a configured repository: \
                     run '<cli> package describe <name>' by hand",
                )
                .with_details(details)
        }
        HarnessError::VersionDidNotChange { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Verify the repository list actually changed: run '<cli> package repo list --json'",
            )
            .with_details(
                "After a repository priority change the index should start serving a \
                 different version for the package; it never did",
            ),
        HarnessError::RepositoryMutationFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Inspect the repository list and restore it manually before re-running")
            .with_details(
                "Later installs resolve against the repository list, so the harness \
                 aborts rather than continue from an unknown state",
            ),
        HarnessError::CapabilityViolation { .. } => ErrorContext::new(error).with_details(
            "The calling test must consult the capability predicates before requesting \
             an in-place version or options update",
        ),
        HarnessError::CliNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Install the platform CLI or point --cli at the binary"),
        HarnessError::CommandFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Re-run with --verbose to see the full command output"),
        HarnessError::DeploymentTimeout { .. } => ErrorContext::new(error)
            .with_suggestion("Increase --timeout or inspect the deployment plan on the cluster")
            .with_details(
                "The deployment plan kept reporting an incomplete status for the whole budget",
            ),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let e = HarnessError::VersionUnavailable { package: "hello-world".into() };
        assert_eq!(e.to_string(), "No version could be resolved for package 'hello-world'");

        let e = HarnessError::VersionDidNotChange {
            package: "hello-world".into(),
            previous: "1.0.0".into(),
        };
        assert!(e.to_string().contains("did not change from '1.0.0'"));

        let e = HarnessError::DeploymentTimeout { service: "/hello".into(), timeout_secs: 1500 };
        assert!(e.to_string().contains("1500s"));
    }

    #[test]
    fn test_user_friendly_error_downcasts_harness_error() {
        let err = anyhow::Error::from(HarnessError::CliNotFound { binary: "dcos".into() });
        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, HarnessError::CliNotFound { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_preserves_chain() {
        let root = anyhow::anyhow!("socket closed");
        let err = root.context("fetching plan status");
        let ctx = user_friendly_error(err);
        match ctx.error {
            HarnessError::Other { message } => {
                assert!(message.contains("fetching plan status"));
                assert!(message.contains("Caused by:"));
                assert!(message.contains("socket closed"));
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn test_error_context_builder() {
        let ctx = ErrorContext::new(HarnessError::Other { message: "boom".into() })
            .with_suggestion("try again")
            .with_details("it exploded");
        let rendered = format!("{ctx}");
        assert!(rendered.contains("boom"));
        assert!(rendered.contains("Suggestion: try again"));
        assert!(rendered.contains("Details: it exploded"));
    }
}
