//! Deployment verification tests: restart checks and plan polling

use std::time::Duration;

use uplift::core::HarnessError;
use uplift::package::PackageVersion;
use uplift::retry::FixedRetry;
use uplift::service::{self, plan};
use uplift::test_utils::{FakeCli, init_test_logging};
use uplift::upgrade::{self, Timing, UpgradeRequest};

#[tokio::test]
async fn test_changed_config_requires_replaced_tasks() {
    init_test_logging(None);
    let fake = FakeCli::new();
    // The update changes the config, and every task id gets replaced
    fake.stage("config_after.json", r#"{"service": {"name": "/hello", "count": 5}}"#);
    fake.stage(
        "tasks_after.json",
        r#"[
            {"id": "hello-0-node__new0", "name": "hello-0-node"},
            {"id": "hello-1-node__new1", "name": "hello-1-node"},
            {"id": "hello-2-node__new2", "name": "hello-2-node"}
        ]"#,
    );
    let platform = fake.platform("1.11.0", false);
    let request =
        UpgradeRequest::new("hello-world", "/hello", 3).with_timeout(Duration::from_secs(5));
    let target = PackageVersion::from("2.0.0-test");

    upgrade::update_or_upgrade_or_downgrade(
        &platform,
        &request,
        Some(&target),
        None,
        &Timing::fast(),
    )
    .await
    .unwrap();

    // The plan wait ran, so the replaced task set satisfied the check
    assert!(!fake.calls_matching("hello-world --name=/hello plan status").is_empty());
}

#[tokio::test]
async fn test_restart_without_config_change_is_a_mismatch() {
    init_test_logging(None);
    let fake = FakeCli::new();
    // Config stays identical but the task ids change anyway
    fake.stage(
        "tasks_after.json",
        r#"[
            {"id": "hello-0-node__new0", "name": "hello-0-node"},
            {"id": "hello-1-node__new1", "name": "hello-1-node"},
            {"id": "hello-2-node__new2", "name": "hello-2-node"}
        ]"#,
    );
    let platform = fake.platform("1.11.0", false);
    let request =
        UpgradeRequest::new("hello-world", "/hello", 3).with_timeout(Duration::from_secs(5));
    let target = PackageVersion::from("2.0.0-test");

    let err = upgrade::update_or_upgrade_or_downgrade(
        &platform,
        &request,
        Some(&target),
        None,
        &Timing::fast(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast::<HarnessError>().unwrap(),
        HarnessError::TasksMismatch { .. }
    ));
}

#[tokio::test]
async fn test_stuck_plan_times_out() {
    init_test_logging(None);
    let fake = FakeCli::new();
    fake.stage("plan.json", r#"{"status": "IN_PROGRESS"}"#);
    let platform = fake.platform("1.11.0", false);

    let err = plan::wait_for_completed_deployment(
        &platform,
        "hello-world",
        "/hello",
        Duration::from_millis(100),
        Duration::from_millis(10),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast::<HarnessError>().unwrap(),
        HarnessError::DeploymentTimeout { .. }
    ));
    // The plan was actually polled, not just timed out on the first miss
    assert!(fake.calls_matching("hello-world --name=/hello plan status").len() >= 2);
}

#[tokio::test]
async fn test_unparseable_config_is_retried_then_fails() {
    init_test_logging(None);
    let fake = FakeCli::new();
    fake.stage("config.json", "not json at all");
    let platform = fake.platform("1.11.0", false);
    let policy = FixedRetry::attempts(Duration::from_millis(10), 3);

    let err = service::get_config(&platform, "hello-world", "/hello", &policy)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("never became available"));
    assert_eq!(
        fake.calls_matching("hello-world --name=/hello debug config target").len(),
        3
    );
}
