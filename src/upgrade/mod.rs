//! Upgrade and downgrade orchestration
//!
//! This module sequences the external calls that make up an upgrade
//! validation run. Two top-level flows exist:
//!
//! - [`test_upgrade`] - uninstall any existing instance, install the
//!   released (production-stream) version of the package, then upgrade it
//!   to the candidate build. The production repository is temporarily moved
//!   to the front of the repository list so the released version resolves,
//!   and is restored to the default priority afterwards **even when the
//!   baseline install fails**.
//! - [`soak_upgrade_downgrade`] - on soak clusters the released version is
//!   already installed and the repositories are already in place, so this
//!   flow only upgrades to the candidate build and downgrades back.
//!
//! Both funnel through [`update_or_upgrade_or_downgrade`], which picks the
//! mechanism per call: the in-place `update start` flow when the cluster's
//! capability predicates allow it, or a destroy-and-reinstall fallback when
//! they do not. There is no persisted state between calls; every value is
//! created fresh per invocation and discarded at the end.

pub mod capabilities;

pub use capabilities::{
    ensure_options_update_supported, ensure_version_upgrade_supported, options_update_supported,
    version_upgrade_supported,
};

use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

use crate::package::{self, PackageVersion};
use crate::platform::Platform;
use crate::repository;
use crate::retry::FixedRetry;
use crate::service::{self, InstallRequest, plan, tasks};

/// Default overall budget for installs and deployment plans (25 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25 * 60);

/// The version label the candidate stream publishes under on soak clusters
const STUB_VERSION: &str = "stub-universe";

/// Retry policies and polling cadences for one harness run
///
/// The defaults are the production values; tests substitute
/// millisecond-scale ones so full flows run in well under a second.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Policy for resolving a package version
    pub resolve: FixedRetry,
    /// Policy for detecting a changed package version after a repo swap
    pub new_version: FixedRetry,
    /// Policy for fetching a service's target config
    pub config_fetch: FixedRetry,
    /// Policy for waiting until restarted tasks replace the old set
    pub task_change: FixedRetry,
    /// Cadence for deployment-plan and task-count polling
    pub poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            resolve: FixedRetry::resolve_version(),
            new_version: FixedRetry::new_version(),
            config_fetch: FixedRetry::config_fetch(),
            task_change: FixedRetry::attempts(Duration::from_secs(1), 60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl Timing {
    /// Millisecond-scale timing for tests
    #[must_use]
    pub fn fast() -> Self {
        let quick = FixedRetry::attempts(Duration::from_millis(10), 5);
        Self {
            resolve: quick,
            new_version: FixedRetry::attempts(Duration::from_millis(10), 15),
            config_fetch: quick,
            task_change: quick,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Input parameters for one upgrade or soak run
///
/// `options` applies to the baseline (released) install; the candidate
/// phase uses `test_options` when given and falls back to `options`
/// otherwise, so a single options document covers the common case of
/// identical settings across both versions.
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    /// Package under test
    pub package: String,
    /// Service instance name
    pub service: String,
    /// Running-task count that marks an install as up
    pub expected_running_tasks: usize,
    /// Options for the baseline install
    pub options: Option<Value>,
    /// Options for the candidate phase; defaults to `options`
    pub test_options: Option<Value>,
    /// Budget for installs and deployment plans
    pub timeout: Duration,
    /// Whether to block until deployment plans complete
    pub wait_for_deployment: bool,
}

impl UpgradeRequest {
    /// Create a request with default timeout and blocking-wait semantics
    #[must_use]
    pub fn new(
        package: impl Into<String>,
        service: impl Into<String>,
        expected_running_tasks: usize,
    ) -> Self {
        Self {
            package: package.into(),
            service: service.into(),
            expected_running_tasks,
            options: None,
            test_options: None,
            timeout: DEFAULT_TIMEOUT,
            wait_for_deployment: true,
        }
    }

    /// Set the baseline install options
    #[must_use]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Set candidate-phase options distinct from the baseline ones
    #[must_use]
    pub fn with_test_options(mut self, options: Value) -> Self {
        self.test_options = Some(options);
        self
    }

    /// Override the install/deployment budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Opt out of blocking until deployment plans complete
    #[must_use]
    pub const fn no_wait(mut self) -> Self {
        self.wait_for_deployment = false;
        self
    }

    /// Options for the candidate phase (falling back to the baseline ones)
    #[must_use]
    pub fn test_phase_options(&self) -> Option<&Value> {
        self.test_options.as_ref().or(self.options.as_ref())
    }
}

/// Install the released version of a package, then upgrade to the candidate
///
/// The full validation flow:
///
/// 1. uninstall any existing instance of the service
/// 2. resolve the candidate ("test") version the index currently serves
/// 3. move the production repository to the front of the priority list and
///    wait for the released version to become resolvable
/// 4. install the released baseline
/// 5. restore the production repository to the default priority and wait
///    for the candidate version to become resolvable again - this step runs
///    even when the baseline install failed, as long as the released
///    version was resolved
/// 6. upgrade the service to the candidate version
pub async fn test_upgrade(
    platform: &Platform,
    production_repo: &str,
    request: &UpgradeRequest,
    timing: &Timing,
) -> Result<()> {
    service::uninstall(platform, &request.package, &request.service).await?;

    let test_version =
        package::resolve_version(platform, &request.package, &timing.resolve).await?;
    tracing::info!(target: "upgrade", "Found test version: {}", test_version);

    let production_uri = repository::uri_of(platform, production_repo).await?;

    let (production_version, install_result) =
        install_production_baseline(platform, production_repo, &production_uri, &test_version, request, timing)
            .await;

    // Restore the repository order even when the baseline install failed,
    // provided the production version was actually resolved.
    if let Some(ref production_version) = production_version {
        let restore = restore_repository_order(
            platform,
            production_repo,
            &production_uri,
            &request.package,
            production_version,
            timing,
        )
        .await;

        match (&install_result, restore) {
            (Ok(()), Err(e)) => return Err(e),
            (Err(install_err), Err(restore_err)) => {
                tracing::error!(
                    target: "upgrade",
                    "Repository restore failed after install failure ({install_err:#}): {restore_err:#}"
                );
            }
            _ => {}
        }
    }
    install_result?;

    tracing::info!(
        target: "upgrade",
        "Upgrading {}: {} => {}",
        request.package,
        production_version.as_ref().map_or("?", PackageVersion::as_str),
        test_version
    );
    update_or_upgrade_or_downgrade(
        platform,
        request,
        Some(&test_version),
        request.test_phase_options(),
        timing,
    )
    .await
}

/// Upgrade to the candidate version and back down to the released one
///
/// Soak clusters keep the released version installed and the repository
/// list in its default order, so no toggling happens: upgrade to the
/// candidate stream's fixed version label, then resolve whatever the
/// default repository order serves and downgrade to it.
pub async fn soak_upgrade_downgrade(
    platform: &Platform,
    request: &UpgradeRequest,
    timing: &Timing,
) -> Result<()> {
    platform
        .command()
        .args(["package", "install", "--cli", "--yes"])
        .arg(&request.package)
        .execute_success()
        .await?;

    let candidate = PackageVersion::new(STUB_VERSION);
    tracing::info!(
        target: "upgrade",
        "Upgrading to test version: {} {}",
        request.package,
        candidate
    );
    update_or_upgrade_or_downgrade(
        platform,
        request,
        Some(&candidate),
        request.options.as_ref(),
        timing,
    )
    .await?;

    // The production repository sits at the default priority, so plain
    // resolution yields the released version to downgrade to.
    let released = package::resolve_version(platform, &request.package, &timing.resolve).await?;
    tracing::info!(
        target: "upgrade",
        "Downgrading to production version: {} {}",
        request.package,
        released
    );
    update_or_upgrade_or_downgrade(
        platform,
        request,
        Some(&released),
        request.options.as_ref(),
        timing,
    )
    .await
}

/// Move a service to a target version and/or options set
///
/// Captures the config snapshot and task-id set, issues the change through
/// the in-place CLI flow when the cluster supports everything the change
/// needs and through destroy-and-reinstall otherwise, then (unless the
/// request opted out) verifies the restart behavior and waits for the
/// deployment plan.
///
/// A request that opted out of waiting succeeds as soon as the change is
/// issued.
pub async fn update_or_upgrade_or_downgrade(
    platform: &Platform,
    request: &UpgradeRequest,
    to_version: Option<&PackageVersion>,
    options: Option<&Value>,
    timing: &Timing,
) -> Result<()> {
    let initial_config =
        service::get_config(platform, &request.package, &request.service, &timing.config_fetch)
            .await?;
    let task_ids = tasks::get_task_ids(platform, &request.service).await?;

    let needs_fallback = (to_version.is_some() && !version_upgrade_supported(platform))
        || (options.is_some() && !options_update_supported(platform));

    if needs_fallback {
        tracing::info!(
            target: "upgrade",
            "Using destroy-and-reinstall flow to move {} to version [{}]",
            request.service,
            to_version.map_or("current", PackageVersion::as_str)
        );
        service::destroy_app(platform, &request.service).await?;
        service::install(
            platform,
            &InstallRequest {
                package: &request.package,
                service: &request.service,
                expected_running_tasks: request.expected_running_tasks,
                version: to_version,
                options,
                timeout: request.timeout,
                wait_for_deployment: request.wait_for_deployment,
                poll_interval: timing.poll_interval,
            },
        )
        .await?;
    } else {
        update_service_with_cli(platform, request, to_version, options).await?;
    }

    if !request.wait_for_deployment {
        return Ok(());
    }
    wait_for_deployment(platform, request, &initial_config, &task_ids, timing).await
}

/// Issue an in-place `update start` through the package's CLI module
///
/// Appending `--package-version` requires the version upgrade capability
/// and `--options` the options update capability; both are contract
/// preconditions here, checked via the `ensure_*` forms. On version-
/// targeted updates the package's local CLI module is reinstalled
/// afterwards, because the update flow does not refresh it on its own.
async fn update_service_with_cli(
    platform: &Platform,
    request: &UpgradeRequest,
    to_version: Option<&PackageVersion>,
    options: Option<&Value>,
) -> Result<()> {
    let mut cmd = platform
        .svc_command(&request.package, &request.service)
        .args(["update", "start"]);

    if let Some(version) = to_version {
        ensure_version_upgrade_supported(platform)?;
        cmd = cmd.arg(format!("--package-version={version}"));
        tracing::info!(
            target: "upgrade",
            "Using CLI to upgrade {} to version [{}]",
            request.service,
            version
        );
    } else {
        tracing::info!(target: "upgrade", "Using CLI to update {}", request.service);
    }

    // The options file must outlive the update command.
    let _options_file = match options {
        Some(options) => {
            ensure_options_update_supported(platform)?;
            let file = service::write_options_file(options)?;
            cmd = cmd.arg(format!("--options={}", file.path().display()));
            Some(file)
        }
        None => None,
    };

    cmd.with_context(&request.service).execute_success().await?;

    if let Some(version) = to_version {
        // The update flow leaves the old package CLI module in place; it
        // will not replace itself through a call to the main CLI.
        platform
            .command()
            .args(["package", "install", "--yes", "--cli"])
            .arg(format!("--package-version={version}"))
            .arg(&request.package)
            .execute_success()
            .await?;
    }

    Ok(())
}

/// Verify restart behavior and wait for the deploy plan to complete
///
/// An unchanged config snapshot means the tasks must not have restarted; a
/// changed one means every captured task must be replaced. Both are
/// required behavior of the platform's deployment engine, so either
/// mismatch fails the run.
async fn wait_for_deployment(
    platform: &Platform,
    request: &UpgradeRequest,
    initial_config: &Value,
    task_ids: &std::collections::HashSet<String>,
    timing: &Timing,
) -> Result<()> {
    let updated_config =
        service::get_config(platform, &request.package, &request.service, &timing.config_fetch)
            .await?;

    if updated_config == *initial_config {
        tracing::info!(
            target: "upgrade",
            "No config change detected. Tasks should not be restarted"
        );
        tasks::check_tasks_not_updated(platform, &request.service, task_ids).await?;
    } else {
        tracing::info!(target: "upgrade", "Checking that all tasks have restarted");
        tasks::check_tasks_updated(platform, &request.service, task_ids, &timing.task_change)
            .await?;
    }

    plan::wait_for_completed_deployment(
        platform,
        &request.package,
        &request.service,
        request.timeout,
        timing.poll_interval,
    )
    .await
}

/// Baseline phase: repo to front, resolve released version, install it
///
/// Returns the released version (when it was resolved) alongside the phase
/// result, so the caller can run the repository restore in both outcomes.
async fn install_production_baseline(
    platform: &Platform,
    production_repo: &str,
    production_uri: &str,
    test_version: &PackageVersion,
    request: &UpgradeRequest,
    timing: &Timing,
) -> (Option<PackageVersion>, Result<()>) {
    if let Err(e) = repository::move_to_front(platform, production_repo, production_uri).await {
        return (None, Err(e));
    }

    tracing::info!(
        target: "upgrade",
        "Waiting for production release version of {} to appear: version != {}",
        request.package,
        test_version
    );
    let production_version = match package::wait_for_new_version(
        platform,
        &request.package,
        test_version,
        &timing.resolve,
        &timing.new_version,
    )
    .await
    {
        Ok(version) => version,
        Err(e) => return (None, Err(e)),
    };

    tracing::info!(
        target: "upgrade",
        "Installing production version: {}={}",
        request.package,
        production_version
    );
    let result = service::install(
        platform,
        &InstallRequest {
            package: &request.package,
            service: &request.service,
            expected_running_tasks: request.expected_running_tasks,
            version: Some(&production_version),
            options: request.options.as_ref(),
            timeout: request.timeout,
            wait_for_deployment: request.wait_for_deployment,
            poll_interval: timing.poll_interval,
        },
    )
    .await;

    (Some(production_version), result)
}

/// Restore phase: repo back to default priority, candidate resolvable again
async fn restore_repository_order(
    platform: &Platform,
    production_repo: &str,
    production_uri: &str,
    package_name: &str,
    production_version: &PackageVersion,
    timing: &Timing,
) -> Result<()> {
    repository::move_to_default(platform, production_repo, production_uri).await?;
    tracing::info!(
        target: "upgrade",
        "Waiting for test build version of {} to appear: version != {}",
        package_name,
        production_version
    );
    package::wait_for_new_version(
        platform,
        package_name,
        production_version,
        &timing.resolve,
        &timing.new_version,
    )
    .await
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request = UpgradeRequest::new("hello-world", "/hello", 3);
        assert_eq!(request.timeout, DEFAULT_TIMEOUT);
        assert!(request.wait_for_deployment);
        assert!(request.options.is_none());
        assert!(request.test_phase_options().is_none());
    }

    #[test]
    fn test_phase_options_fall_back_to_baseline() {
        let request =
            UpgradeRequest::new("hello-world", "/hello", 3).with_options(json!({"count": 3}));
        assert_eq!(request.test_phase_options(), Some(&json!({"count": 3})));

        let request = request.with_test_options(json!({"count": 5}));
        assert_eq!(request.test_phase_options(), Some(&json!({"count": 5})));
        // Baseline options stay untouched
        assert_eq!(request.options, Some(json!({"count": 3})));
    }

    #[test]
    fn test_no_wait_and_timeout_builders() {
        let request = UpgradeRequest::new("kafka", "/kafka", 5)
            .with_timeout(Duration::from_secs(60))
            .no_wait();
        assert_eq!(request.timeout, Duration::from_secs(60));
        assert!(!request.wait_for_deployment);
    }
}
