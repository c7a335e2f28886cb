//! Package version resolution tests against the scripted index

use std::time::Duration;

use uplift::core::HarnessError;
use uplift::package::{self, PackageVersion};
use uplift::retry::FixedRetry;
use uplift::test_utils::{FakeCli, init_test_logging};

fn quick(max_attempts: usize) -> FixedRetry {
    FixedRetry::attempts(Duration::from_millis(10), max_attempts)
}

#[tokio::test]
async fn test_resolves_after_transient_index_errors() {
    init_test_logging(None);
    let fake = FakeCli::new();
    fake.fail_describes(2);
    let platform = fake.platform("1.11.0", false);

    let version = package::resolve_version(&platform, "hello-world", &quick(5))
        .await
        .unwrap();

    assert_eq!(version.as_str(), "2.0.0-test");
    // Two failing attempts, then the one that succeeded
    assert_eq!(fake.calls_matching("package describe hello-world").len(), 3);
}

#[tokio::test]
async fn test_exhausted_resolution_is_version_unavailable() {
    init_test_logging(None);
    let fake = FakeCli::new();
    fake.fail_describes(10);
    let platform = fake.platform("1.11.0", false);

    let err = package::resolve_version(&platform, "hello-world", &quick(3))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast::<HarnessError>().unwrap(),
        HarnessError::VersionUnavailable { .. }
    ));
    assert_eq!(fake.calls_matching("package describe hello-world").len(), 3);
}

#[tokio::test]
async fn test_unchanged_version_reports_no_change() {
    init_test_logging(None);
    let fake = FakeCli::new();
    let platform = fake.platform("1.11.0", false);
    // The index keeps serving exactly this version
    let previous = PackageVersion::from("2.0.0-test");

    let err = package::wait_for_new_version(&platform, "hello-world", &previous, &quick(2), &quick(3))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast::<HarnessError>().unwrap(),
        HarnessError::VersionDidNotChange { .. }
    ));
}

#[tokio::test]
async fn test_new_version_detected_once_index_catches_up() {
    init_test_logging(None);
    let fake = FakeCli::new();
    let platform = fake.platform("1.11.0", false);
    let previous = PackageVersion::from("2.0.0-test");
    let resolve_policy = quick(2);
    let change_policy = quick(10);

    let wait = package::wait_for_new_version(
        &platform,
        "hello-world",
        &previous,
        &resolve_policy,
        &change_policy,
    );
    // The index lags the repository change for a few polls, then serves
    // the other stream.
    let catch_up = async {
        tokio::time::sleep(Duration::from_millis(35)).await;
        fake.stage("describe.json", r#"{"package": {"version": "1.0.0"}}"#);
    };

    let (result, ()) = tokio::join!(wait, catch_up);
    assert_eq!(result.unwrap().as_str(), "1.0.0");
    assert!(fake.calls_matching("package describe hello-world").len() >= 2);
}

#[tokio::test]
async fn test_missing_version_field_is_retried_until_exhaustion() {
    init_test_logging(None);
    let fake = FakeCli::new();
    fake.stage("describe.json", r#"{"name": "hello-world"}"#);
    let platform = fake.platform("1.11.0", false);

    let err = package::resolve_version(&platform, "hello-world", &quick(2))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast::<HarnessError>().unwrap(),
        HarnessError::VersionUnavailable { .. }
    ));
    assert_eq!(fake.calls_matching("package describe hello-world").len(), 2);
}
