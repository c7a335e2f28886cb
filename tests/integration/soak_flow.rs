//! Soak cluster upgrade/downgrade flow tests

use std::time::Duration;

use uplift::test_utils::{FakeCli, init_test_logging};
use uplift::upgrade::{self, Timing, UpgradeRequest};

use crate::common::assert_call_sequence;

#[tokio::test]
async fn test_soak_upgrades_to_stub_and_downgrades_back() {
    init_test_logging(None);
    let fake = FakeCli::new();
    let platform = fake.platform("1.11.0", false);
    let request =
        UpgradeRequest::new("hello-world", "/hello", 3).with_timeout(Duration::from_secs(5));

    upgrade::soak_upgrade_downgrade(&platform, &request, &Timing::fast())
        .await
        .unwrap();

    assert_call_sequence(
        &fake.calls(),
        &[
            // local CLI module first, then up to the candidate stream's label
            "package install --cli --yes hello-world",
            "hello-world --name=/hello update start --package-version=stub-universe",
            "package install --yes --cli --package-version=stub-universe hello-world",
            // the default repository order serves the released version to
            // downgrade to
            "package describe hello-world",
            "hello-world --name=/hello update start --package-version=2.0.0-test",
            "package install --yes --cli --package-version=2.0.0-test hello-world",
        ],
    );

    // Soak clusters keep their repository list untouched
    assert!(fake.calls_matching("package repo remove").is_empty());
    assert!(fake.calls_matching("package repo add").is_empty());
}
