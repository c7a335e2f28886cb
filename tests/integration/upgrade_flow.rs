//! End-to-end tests of the full upgrade validation flow

use std::time::Duration;

use uplift::core::HarnessError;
use uplift::package::PackageVersion;
use uplift::test_utils::{FakeCli, init_test_logging};
use uplift::upgrade::{self, Timing, UpgradeRequest};

use crate::common::assert_call_sequence;

#[tokio::test]
async fn test_upgrade_issues_full_command_sequence() {
    init_test_logging(None);
    let fake = FakeCli::new();
    let platform = fake.platform("1.11.0", false);
    let request =
        UpgradeRequest::new("hello-world", "/hello", 3).with_timeout(Duration::from_secs(5));

    upgrade::test_upgrade(&platform, "Universe", &request, &Timing::fast())
        .await
        .unwrap();

    assert_call_sequence(
        &fake.calls(),
        &[
            // cleanup, then the candidate ("test") version resolves
            "package uninstall --yes --app-id=/hello hello-world",
            "package describe hello-world",
            "package repo list --json",
            // production repository to the front, baseline install
            "package repo remove Universe",
            "package repo add --index=0 Universe https://universe.example.com/repo",
            "package install --yes --app-id=/hello --package-version=1.0.0 hello-world",
            "task --json",
            "hello-world --name=/hello plan status deploy --json",
            // repository restored to the default priority
            "package repo remove Universe",
            "package repo add Universe https://universe.example.com/repo",
            // in-place upgrade to the candidate, plus CLI module refresh
            "hello-world --name=/hello debug config target",
            "hello-world --name=/hello update start --package-version=2.0.0-test",
            "package install --yes --cli --package-version=2.0.0-test hello-world",
            "hello-world --name=/hello plan status deploy --json",
        ],
    );

    // An enterprise 1.11 cluster never needs the reinstall fallback
    assert!(fake.calls_matching("marathon app remove").is_empty());
}

#[tokio::test]
async fn test_upgrade_restores_repository_when_baseline_install_fails() {
    init_test_logging(None);
    let fake = FakeCli::new();
    let platform = fake.platform("1.11.0", false);
    // Only 3 tasks ever report, so the expected count is unreachable and
    // the baseline install times out.
    let request =
        UpgradeRequest::new("hello-world", "/hello", 5).with_timeout(Duration::from_millis(200));

    let err = upgrade::test_upgrade(&platform, "Universe", &request, &Timing::fast())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast::<HarnessError>().unwrap(),
        HarnessError::DeploymentTimeout { .. }
    ));

    // The production repository still went back to the default priority.
    assert_call_sequence(
        &fake.calls(),
        &[
            "package repo add --index=0 Universe",
            "package repo add Universe https://universe.example.com/repo",
        ],
    );
}

#[tokio::test]
async fn test_version_change_falls_back_to_reinstall_on_open_edition() {
    init_test_logging(None);
    let fake = FakeCli::new();
    // Open edition cannot upgrade in place regardless of version
    let platform = fake.platform("1.12.0", true);
    let request =
        UpgradeRequest::new("hello-world", "/hello", 3).with_timeout(Duration::from_secs(5));
    let target = PackageVersion::from("1.0.0");

    upgrade::update_or_upgrade_or_downgrade(
        &platform,
        &request,
        Some(&target),
        None,
        &Timing::fast(),
    )
    .await
    .unwrap();

    assert_call_sequence(
        &fake.calls(),
        &[
            "marathon app remove /hello",
            "package install --yes --app-id=/hello --package-version=1.0.0 hello-world",
        ],
    );
    assert!(fake.calls().iter().all(|call| !call.contains("update start")));
}

#[tokio::test]
async fn test_options_change_falls_back_to_reinstall_on_old_cluster() {
    init_test_logging(None);
    let fake = FakeCli::new();
    // Pre-1.9 clusters cannot update service options in place
    let platform = fake.platform("1.8", false);
    let request =
        UpgradeRequest::new("hello-world", "/hello", 3).with_timeout(Duration::from_secs(5));
    let options = serde_json::json!({"service": {"count": 5}});

    upgrade::update_or_upgrade_or_downgrade(
        &platform,
        &request,
        None,
        Some(&options),
        &Timing::fast(),
    )
    .await
    .unwrap();

    assert_call_sequence(
        &fake.calls(),
        &[
            "marathon app remove /hello",
            "package install --yes --app-id=/hello --options=",
        ],
    );
    assert!(fake.calls().iter().all(|call| !call.contains("update start")));
}

#[tokio::test]
async fn test_enterprise_1_9_upgrades_in_place() {
    init_test_logging(None);
    let fake = FakeCli::new();
    let platform = fake.platform("1.9", false);
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

    assert_call_sequence(
        &fake.calls(),
        &["hello-world --name=/hello update start --package-version=2.0.0-test"],
    );
    assert!(fake.calls_matching("marathon app remove").is_empty());
}

#[tokio::test]
async fn test_no_wait_succeeds_without_deployment_verification() {
    init_test_logging(None);
    let fake = FakeCli::new();
    let platform = fake.platform("1.11.0", false);
    let request = UpgradeRequest::new("hello-world", "/hello", 3).no_wait();
    let target = PackageVersion::from("2.0.0-test");

    // Opting out of the wait is a success as soon as the update is issued
    upgrade::update_or_upgrade_or_downgrade(
        &platform,
        &request,
        Some(&target),
        None,
        &Timing::fast(),
    )
    .await
    .unwrap();

    assert_call_sequence(
        &fake.calls(),
        &["hello-world --name=/hello update start --package-version=2.0.0-test"],
    );
    assert!(fake.calls_matching("hello-world --name=/hello plan status").is_empty());
}
