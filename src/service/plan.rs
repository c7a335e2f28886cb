//! Deployment plan polling
//!
//! After an update is issued, the scheduler works through a deployment
//! plan. The harness polls `plan status deploy --json` through the
//! package's CLI module until the plan reports `COMPLETE`, or the caller's
//! budget elapses. Transient fetch failures during the poll are expected
//! (the scheduler itself restarts mid-deployment) and simply skipped.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::core::HarnessError;
use crate::platform::Platform;

#[derive(Debug, Deserialize)]
struct PlanStatus {
    status: String,
}

/// Whether a reported plan status means the deployment is done
fn is_complete(status: &str) -> bool {
    status.eq_ignore_ascii_case("COMPLETE")
}

/// Block until the service's deploy plan reports completion
///
/// Polls every `poll_interval` until `timeout` elapses, then fails with
/// [`HarnessError::DeploymentTimeout`]. This can legitimately take a long
/// time; the expected running-task count can be reached through short-lived
/// tasks well before the plan is actually complete, which is why the plan
/// is the source of truth and not the task count.
pub async fn wait_for_completed_deployment(
    platform: &Platform,
    package: &str,
    service: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    tracing::info!(
        target: "plan",
        "Waiting for package={} service={} to finish deployment plan...",
        package,
        service
    );

    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Some(status) = fetch_status(platform, package, service).await {
            if is_complete(&status) {
                tracing::info!(target: "plan", "Deploy plan of {} is complete", service);
                return Ok(());
            }
            tracing::debug!(target: "plan", "Deploy plan of {} is {}", service, status);
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(HarnessError::DeploymentTimeout {
                service: service.to_string(),
                timeout_secs: timeout.as_secs(),
            }
            .into());
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// One status fetch; `None` means the plan endpoint was not usable yet
async fn fetch_status(platform: &Platform, package: &str, service: &str) -> Option<String> {
    let output = match platform
        .svc_command(package, service)
        .args(["plan", "status", "deploy", "--json"])
        .execute()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(target: "plan", "Plan status fetch failed (will retry): {e}");
            return None;
        }
    };

    if !output.success() {
        tracing::debug!(
            target: "plan",
            "Plan status for {} exited {:?} (will retry)",
            service,
            output.code
        );
        return None;
    }

    match serde_json::from_str::<PlanStatus>(output.stdout_trimmed()) {
        Ok(plan) => Some(plan.status),
        Err(e) => {
            tracing::debug!(target: "plan", "Unparseable plan status for {service}: {e}");
            None
        }
    }
}
