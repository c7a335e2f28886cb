//! Package version resolution against the platform's package index
//!
//! The index is consulted through `<cli> package describe <name>`, whose
//! JSON response has carried the version field in two different places
//! across platform releases. Resolution is deliberately forgiving: a failed
//! command, unparseable output, or a response with the version in neither
//! location are all treated as transient misses and retried on a fixed
//! interval, because the index is routinely a few seconds behind a
//! repository change. Only the retry ceiling turns a miss into an error.

use anyhow::Result;
use serde_json::Value;
use std::fmt;

use crate::core::HarnessError;
use crate::platform::Platform;
use crate::retry::FixedRetry;

/// An opaque package version identifier
///
/// Versions are compared for equality only; the harness never orders them.
/// "Has a different version appeared?" is the sole question asked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion(String);

impl PackageVersion {
    /// Wrap a version string
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The underlying version string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PackageVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Extract the version field from a describe response
///
/// The schema moved between platform releases: newer clusters nest it at
/// `package.version`, older ones keep it at the top-level `version`. Both
/// absent yields `None`, which the caller treats as a retryable miss rather
/// than an error.
#[must_use]
pub fn extract_version(describe: &Value) -> Option<PackageVersion> {
    let version = describe
        .get("package")
        .and_then(|pkg| pkg.get("version"))
        .or_else(|| describe.get("version"))?;

    version.as_str().map(PackageVersion::new)
}

/// Resolve the version the index currently serves for `package`
///
/// Runs `package describe` on the given retry policy until a version is
/// extracted; exhaustion fails with [`HarnessError::VersionUnavailable`].
/// Describe output is only logged when something goes wrong.
pub async fn resolve_version(
    platform: &Platform,
    package: &str,
    policy: &FixedRetry,
) -> Result<PackageVersion> {
    let resolved = policy
        .run_until_some(|| async { describe_version_attempt(platform, package).await })
        .await;

    resolved.ok_or_else(|| {
        HarnessError::VersionUnavailable { package: package.to_string() }.into()
    })
}

/// Poll until the resolvable version differs from `previous`
///
/// Used after a repository priority change to detect that the index has
/// switched streams. Exhaustion fails with
/// [`HarnessError::VersionDidNotChange`].
pub async fn wait_for_new_version(
    platform: &Platform,
    package: &str,
    previous: &PackageVersion,
    resolve_policy: &FixedRetry,
    change_policy: &FixedRetry,
) -> Result<PackageVersion> {
    let changed = change_policy
        .run_until_some(|| async {
            let current = resolve_version(platform, package, resolve_policy).await.ok()?;
            tracing::info!(target: "package", "Current version of {} is: {}", package, current);
            (current != *previous).then_some(current)
        })
        .await;

    changed.ok_or_else(|| {
        HarnessError::VersionDidNotChange {
            package: package.to_string(),
            previous: previous.to_string(),
        }
        .into()
    })
}

/// One describe attempt; `None` means "retry"
async fn describe_version_attempt(platform: &Platform, package: &str) -> Option<PackageVersion> {
    let output = match platform
        .command()
        .args(["package", "describe", package])
        .execute()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(target: "package", "Failed to run package describe: {e}");
            return None;
        }
    };

    if !output.success() {
        tracing::warn!(
            target: "package",
            "'package describe {}' exited {:?}:\nSTDOUT:\n{}\nSTDERR:\n{}",
            package,
            output.code,
            output.stdout.trim_end(),
            output.stderr.trim_end()
        );
        return None;
    }

    match serde_json::from_str::<Value>(output.stdout_trimmed()) {
        Ok(describe) => {
            let version = extract_version(&describe);
            if version.is_none() {
                tracing::warn!(
                    target: "package",
                    "No version field in describe response for {}:\n{}",
                    package,
                    output.stdout.trim_end()
                );
            }
            version
        }
        Err(e) => {
            tracing::warn!(
                target: "package",
                "Unparseable describe response for {package}: {e}"
            );
            None
        }
    }
}
