//! Platform CLI execution and cluster introspection
//!
//! The harness talks to the cluster exclusively through the platform's
//! command-line binary. This module provides:
//!
//! - [`PlatformCommand`] - a fluent builder for executing that binary with
//!   consistent timeout, capture, and logging behavior
//! - [`Platform`] - a handle bundling the binary's location with the
//!   connected cluster's version and edition, which the capability
//!   predicates in [`crate::upgrade`] are computed from
//! - [`PlatformVersion`] - lenient, ordered version parsing
//!
//! A [`Platform`] is constructed once per harness run, either by
//! interrogating the cluster ([`Platform::detect`]) or directly from known
//! values ([`Platform::with_cluster`], used by tests and config overrides).

pub mod command_builder;
pub mod version;

pub use command_builder::{PlatformCommand, PlatformOutput};
pub use version::PlatformVersion;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::HarnessError;

/// Cluster identity reported by `<cli> about --json`
#[derive(Debug, Deserialize)]
struct AboutResponse {
    /// Cluster version string, e.g. "1.11.3"
    version: String,
    /// Cluster variant: "open" or "enterprise"
    #[serde(default)]
    variant: Option<String>,
}

/// Handle to the platform CLI and the cluster behind it
///
/// Owns the resolved path to the CLI binary plus the cluster facts
/// (version, edition) that gate which update mechanisms are legal. All
/// command construction goes through [`Platform::command`] or
/// [`Platform::svc_command`] so the binary path stays in one place.
#[derive(Debug, Clone)]
pub struct Platform {
    cli: PathBuf,
    version: PlatformVersion,
    open_edition: bool,
}

impl Platform {
    /// Locate the CLI binary and interrogate the cluster it points at
    ///
    /// `binary` may be a bare name (resolved via `PATH`) or a path. The
    /// cluster's version and variant come from `<cli> about --json`.
    pub async fn detect(binary: impl AsRef<Path>) -> Result<Self> {
        let cli = resolve_binary(binary.as_ref())?;

        let output = PlatformCommand::new(&cli)
            .args(["about", "--json"])
            .execute_success()
            .await
            .context("Querying cluster version and edition")?;

        let about: AboutResponse = serde_json::from_str(output.stdout_trimmed())
            .context("Parsing 'about --json' response")?;
        let version = PlatformVersion::parse(&about.version)?;
        let open_edition = about.variant.as_deref() == Some("open");

        tracing::info!(
            target: "platform",
            "Connected to cluster: version={} edition={}",
            version,
            if open_edition { "open" } else { "enterprise" }
        );

        Ok(Self { cli, version, open_edition })
    }

    /// Construct a handle from already-known cluster facts
    ///
    /// Used by tests and by configurations that pin the cluster identity
    /// instead of querying it.
    #[must_use]
    pub fn with_cluster(cli: PathBuf, version: PlatformVersion, open_edition: bool) -> Self {
        Self { cli, version, open_edition }
    }

    /// Path to the CLI binary
    #[must_use]
    pub fn cli(&self) -> &Path {
        &self.cli
    }

    /// Whether the cluster runs the open (non-enterprise) edition
    #[must_use]
    pub const fn is_open_edition(&self) -> bool {
        self.open_edition
    }

    /// Whether the cluster version is at least `threshold`
    ///
    /// `threshold` is a static two-component version like "1.9"; an
    /// unparseable threshold is a bug in the caller and evaluates false
    /// with a warning rather than panicking mid-flow.
    #[must_use]
    pub fn version_at_least(&self, threshold: &str) -> bool {
        match PlatformVersion::parse(threshold) {
            Ok(min) => self.version.at_least(&min),
            Err(e) => {
                tracing::warn!(target: "platform", "Bad version threshold '{threshold}': {e}");
                false
            }
        }
    }

    /// Start building a raw CLI command
    #[must_use]
    pub fn command(&self) -> PlatformCommand {
        PlatformCommand::new(&self.cli)
    }

    /// Start building a service-scoped CLI command
    ///
    /// Service subcommands are routed through the package's CLI module:
    /// `<cli> <package> --name=<service> <args...>`.
    #[must_use]
    pub fn svc_command(&self, package: &str, service: &str) -> PlatformCommand {
        self.command().arg(package).arg(format!("--name={service}"))
    }
}

/// Resolve a binary name or path to an executable path
fn resolve_binary(binary: &Path) -> Result<PathBuf> {
    if binary.components().count() > 1 {
        if binary.is_file() {
            return Ok(binary.to_path_buf());
        }
        return Err(HarnessError::CliNotFound { binary: binary.display().to_string() }.into());
    }

    which::which(binary)
        .map_err(|_| HarnessError::CliNotFound { binary: binary.display().to_string() }.into())
}
