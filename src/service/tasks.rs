//! Task-id set inspection and restart checks
//!
//! The deployment engine's restart contract is checked through task-id
//! sets: an update that did not change the service's config must leave the
//! task set untouched, and one that did must eventually replace every old
//! task. Task ids come from `<cli> task --json`, filtered to the tasks
//! whose name carries the service's prefix.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;

use crate::core::HarnessError;
use crate::platform::Platform;
use crate::retry::FixedRetry;

#[derive(Debug, Deserialize)]
struct TaskEntry {
    id: String,
    name: String,
}

/// Normalize a service name into the prefix its task names carry
///
/// `/group/hello` becomes `group.hello`, matching how the platform flattens
/// service paths into task names.
fn task_prefix(service: &str) -> String {
    service.trim_start_matches('/').replace('/', ".")
}

/// Fetch the current task-id set of a service
pub async fn get_task_ids(platform: &Platform, service: &str) -> Result<HashSet<String>> {
    let output = platform
        .command()
        .args(["task", "--json"])
        .with_context(service)
        .execute_success()
        .await?;

    let entries: Vec<TaskEntry> = serde_json::from_str(output.stdout_trimmed())
        .map_err(HarnessError::JsonError)?;

    let prefix = task_prefix(service);
    Ok(entries
        .into_iter()
        .filter(|task| task.name.starts_with(&prefix))
        .map(|task| task.id)
        .collect())
}

/// Check that a service's tasks were not restarted
///
/// Called when the config snapshot did not change. A single fetch suffices:
/// the update already completed, so any restart would be visible now.
pub async fn check_tasks_not_updated(
    platform: &Platform,
    service: &str,
    old_ids: &HashSet<String>,
) -> Result<()> {
    let current = get_task_ids(platform, service).await?;
    if current == *old_ids {
        tracing::info!(target: "tasks", "Tasks of {} unchanged, as expected", service);
        Ok(())
    } else {
        tracing::error!(
            target: "tasks",
            "Tasks of {} changed: before={:?} after={:?}",
            service,
            old_ids,
            current
        );
        Err(HarnessError::TasksMismatch {
            service: service.to_string(),
            observed: "changed".to_string(),
            expected: "no restart".to_string(),
        }
        .into())
    }
}

/// Check that all of a service's tasks were restarted
///
/// Called when the config snapshot changed. Polls on `policy` until none of
/// the captured ids survive; task replacement lags the update, so this is a
/// wait, not a one-shot assertion.
pub async fn check_tasks_updated(
    platform: &Platform,
    service: &str,
    old_ids: &HashSet<String>,
    policy: &FixedRetry,
) -> Result<()> {
    let replaced = policy
        .run_until_some(|| async {
            let current = get_task_ids(platform, service).await.ok()?;
            let surviving: Vec<&String> = old_ids.intersection(&current).collect();
            if surviving.is_empty() {
                Some(())
            } else {
                tracing::debug!(
                    target: "tasks",
                    "{} old task(s) of {} still running",
                    surviving.len(),
                    service
                );
                None
            }
        })
        .await;

    match replaced {
        Some(()) => {
            tracing::info!(target: "tasks", "All tasks of {} restarted, as expected", service);
            Ok(())
        }
        None => Err(HarnessError::TasksMismatch {
            service: service.to_string(),
            observed: "did not change".to_string(),
            expected: "a restart".to_string(),
        }
        .into()),
    }
}
