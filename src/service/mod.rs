//! Service lifecycle operations
//!
//! Everything the harness does to a concrete service instance lives here:
//! fresh installs and uninstalls through the package manager, target-config
//! snapshots, task-id set checks ([`tasks`]), deployment-plan polling
//! ([`plan`]), and the application-manager destroy call used by the
//! destroy-and-reinstall fallback.

pub mod plan;
pub mod tasks;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::core::HarnessError;
use crate::package::PackageVersion;
use crate::platform::Platform;
use crate::retry::FixedRetry;

/// Parameters for a fresh service install
#[derive(Debug)]
pub struct InstallRequest<'a> {
    /// Package to install
    pub package: &'a str,
    /// Service instance name
    pub service: &'a str,
    /// Running-task count that marks the install as up
    pub expected_running_tasks: usize,
    /// Specific package version, or whatever the index serves when `None`
    pub version: Option<&'a PackageVersion>,
    /// Service options JSON passed to the installer
    pub options: Option<&'a Value>,
    /// Budget for the task-count wait and the deployment plan
    pub timeout: Duration,
    /// Whether to block until the deployment plan completes
    pub wait_for_deployment: bool,
    /// Cadence for task-count and plan polling
    pub poll_interval: Duration,
}

/// Install a service and wait for it to come up
///
/// Runs `package install --yes` with the requested version and options,
/// polls until the expected running-task count is met, then (unless the
/// caller opted out) waits for the deployment plan to complete. The task
/// count and plan waits share the request's timeout budget.
pub async fn install(platform: &Platform, request: &InstallRequest<'_>) -> Result<()> {
    tracing::info!(
        target: "service",
        "Installing {}={} as service {}",
        request.package,
        request.version.map_or("latest", PackageVersion::as_str),
        request.service
    );

    let mut cmd = platform.command().args(["package", "install", "--yes"]);
    cmd = cmd.arg(format!("--app-id={}", request.service));
    if let Some(version) = request.version {
        cmd = cmd.arg(format!("--package-version={version}"));
    }

    // The options file must outlive the install command.
    let _options_file = match request.options {
        Some(options) => {
            let file = write_options_file(options)?;
            cmd = cmd.arg(format!("--options={}", file.path().display()));
            Some(file)
        }
        None => None,
    };

    cmd.arg(request.package)
        .with_timeout(Some(request.timeout))
        .with_context(request.service)
        .execute_success()
        .await?;

    wait_for_task_count(platform, request).await?;

    if request.wait_for_deployment {
        plan::wait_for_completed_deployment(
            platform,
            request.package,
            request.service,
            request.timeout,
            request.poll_interval,
        )
        .await?;
    }

    Ok(())
}

/// Uninstall a service instance, tolerating its absence
///
/// Uninstall is the cleanup that precedes every fresh install; a service
/// that is not installed is already in the desired state, so a non-zero
/// exit only gets logged.
pub async fn uninstall(platform: &Platform, package: &str, service: &str) -> Result<()> {
    tracing::info!(target: "service", "Uninstalling {} (service {})", package, service);

    let output = platform
        .command()
        .args(["package", "uninstall", "--yes"])
        .arg(format!("--app-id={service}"))
        .arg(package)
        .with_context(service)
        .execute()
        .await?;

    if !output.success() {
        tracing::warn!(
            target: "service",
            "Uninstall of {} exited {:?} (continuing): {}",
            package,
            output.code,
            output.stderr.trim_end()
        );
    }
    Ok(())
}

/// Fetch the active target config for a service, with retries
///
/// Runs `debug config target` through the package's CLI module. A non-zero
/// exit or unparseable output is a transient miss (schedulers briefly drop
/// the endpoint while restarting) and is retried on `policy`. The full
/// config is deliberately not echoed to the log.
pub async fn get_config(
    platform: &Platform,
    package: &str,
    service: &str,
    policy: &FixedRetry,
) -> Result<Value> {
    let config = policy
        .run_until_some(|| async { get_config_attempt(platform, package, service).await })
        .await;

    config.ok_or_else(|| {
        anyhow!("Target config for service '{service}' never became available")
    })
}

/// Destroy the application definition of a running service
///
/// The fallback path for clusters that cannot update in place: the
/// application manager forgets the service, then a fresh install recreates
/// it at the target version.
pub async fn destroy_app(platform: &Platform, service: &str) -> Result<()> {
    tracing::info!(target: "service", "Destroying application {}", service);
    platform
        .command()
        .args(["marathon", "app", "remove", service])
        .with_context(service)
        .execute_success()
        .await
        .map(|_| ())
}

/// Serialize option overrides to a temp file the CLI can read
pub(crate) fn write_options_file(options: &Value) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("Creating options temp file")?;
    serde_json::to_writer(&mut file, options).map_err(HarnessError::JsonError)?;
    // Ensure the JSON is on disk before the CLI reads the path.
    file.flush().context("Flushing options temp file")?;
    Ok(file)
}

async fn get_config_attempt(platform: &Platform, package: &str, service: &str) -> Option<Value> {
    let output = match platform
        .svc_command(package, service)
        .args(["debug", "config", "target"])
        .execute()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(target: "service", "Could not determine target config: {e}");
            return None;
        }
    };

    if !output.success() {
        tracing::error!(
            target: "service",
            "Target config fetch for {} exited {:?}",
            service,
            output.code
        );
        return None;
    }

    match serde_json::from_str(output.stdout_trimmed()) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!(target: "service", "Unparseable target config for {service}: {e}");
            None
        }
    }
}

async fn wait_for_task_count(platform: &Platform, request: &InstallRequest<'_>) -> Result<()> {
    let deadline = tokio::time::Instant::now() + request.timeout;

    loop {
        match tasks::get_task_ids(platform, request.service).await {
            Ok(ids) if ids.len() >= request.expected_running_tasks => {
                tracing::info!(
                    target: "service",
                    "Service {} reached {} running tasks",
                    request.service,
                    ids.len()
                );
                return Ok(());
            }
            Ok(ids) => {
                tracing::debug!(
                    target: "service",
                    "Service {} has {}/{} tasks",
                    request.service,
                    ids.len(),
                    request.expected_running_tasks
                );
            }
            Err(e) => {
                tracing::debug!(target: "service", "Task listing failed (will retry): {e}");
            }
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(HarnessError::DeploymentTimeout {
                service: request.service.to_string(),
                timeout_secs: request.timeout.as_secs(),
            }
            .into());
        }
        tokio::time::sleep(request.poll_interval).await;
    }
}
