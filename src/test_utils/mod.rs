//! Test utilities for uplift
//!
//! Provides two things to unit and integration tests:
//!
//! - [`init_test_logging`] - one-shot tracing setup honoring `RUST_LOG`
//! - [`FakeCli`] - a scripted stand-in for the platform CLI binary
//!
//! The fake CLI is a generated shell script. Its responses are staged as
//! files under a tempdir, every invocation is appended to a call log the
//! tests inspect, and a few mutations mirror real platform behavior: adding
//! a repository at index 0 switches `package describe` to the production
//! stream, re-adding it at the default priority switches back, and issuing
//! `update start` applies any staged post-update config/task state.

use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::platform::{Platform, PlatformVersion};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests
///
/// Initializes the tracing subscriber at most once regardless of how many
/// times it is called. Respects the `RUST_LOG` environment variable when
/// set, otherwise uses the provided level; installs nothing when neither is
/// given.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_ansi(true)
            .try_init();
    });
}

/// A scripted platform CLI living in a tempdir
///
/// Construct with [`FakeCli::new`], adjust the staged responses, and hand
/// [`FakeCli::bin`] to a [`Platform`]. Dropping the fixture removes the
/// tempdir.
pub struct FakeCli {
    root: TempDir,
}

impl FakeCli {
    /// Create the fixture with a plausible default cluster staged
    ///
    /// Defaults: an enterprise 1.11 cluster, a `Universe` production
    /// repository, a candidate build `2.0.0-test` resolvable, a production
    /// build `1.0.0` staged behind the index-0 toggle, three running tasks,
    /// a stable config, and a `COMPLETE` deploy plan.
    #[must_use]
    pub fn new() -> Self {
        let root = TempDir::new().expect("creating fake CLI tempdir");
        let fake = Self { root };

        std::fs::create_dir_all(fake.dir().join("responses")).expect("responses dir");
        std::fs::create_dir_all(fake.dir().join("state")).expect("state dir");
        fake.write_script();

        fake.stage("about.json", r#"{"version": "1.11.0", "variant": "enterprise"}"#);
        fake.stage("describe.json", r#"{"package": {"version": "2.0.0-test"}}"#);
        fake.stage("describe_candidate.json", r#"{"package": {"version": "2.0.0-test"}}"#);
        fake.stage("describe_production.json", r#"{"package": {"version": "1.0.0"}}"#);
        fake.stage(
            "repo_list.json",
            r#"{"repositories": [
                {"name": "Universe", "uri": "https://universe.example.com/repo"},
                {"name": "candidate-stub", "uri": "https://stub.example.com/repo.json"}
            ]}"#,
        );
        fake.stage(
            "tasks.json",
            r#"[
                {"id": "hello-0-node__aaa", "name": "hello-0-node"},
                {"id": "hello-1-node__bbb", "name": "hello-1-node"},
                {"id": "hello-2-node__ccc", "name": "hello-2-node"}
            ]"#,
        );
        fake.stage("config.json", r#"{"service": {"name": "/hello", "count": 3}}"#);
        fake.stage("plan.json", r#"{"status": "COMPLETE"}"#);

        fake
    }

    /// Path to the generated CLI script
    #[must_use]
    pub fn bin(&self) -> PathBuf {
        self.dir().join("cli")
    }

    /// A platform handle pointing at the script, with pinned cluster facts
    #[must_use]
    pub fn platform(&self, version: &str, open_edition: bool) -> Platform {
        Platform::with_cluster(
            self.bin(),
            PlatformVersion::parse(version).expect("test version"),
            open_edition,
        )
    }

    /// Overwrite a staged response file
    pub fn stage(&self, name: &str, content: &str) {
        std::fs::write(self.dir().join("responses").join(name), content)
            .expect("staging response");
    }

    /// Make the next `n` describe invocations exit non-zero
    pub fn fail_describes(&self, n: usize) {
        std::fs::write(self.dir().join("state").join("describe_failures"), n.to_string())
            .expect("staging describe failures");
    }

    /// All invocations so far, one argument line per call
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        match std::fs::read_to_string(self.dir().join("calls.log")) {
            Ok(log) => log.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Invocations matching a prefix
    #[must_use]
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls().into_iter().filter(|call| call.starts_with(prefix)).collect()
    }

    /// Forget all recorded invocations
    pub fn clear_calls(&self) {
        let _ = std::fs::remove_file(self.dir().join("calls.log"));
    }

    fn dir(&self) -> &Path {
        self.root.path()
    }

    fn write_script(&self) {
        let script = format!(
            r#"#!/bin/sh
# Scripted stand-in for the platform CLI, generated by uplift test support.
ROOT='{root}'
printf '%s\n' "$*" >> "$ROOT/calls.log"

respond() {{
    cat "$ROOT/responses/$1"
}}

case "$*" in
  "about --json")
    respond about.json ;;
  "package describe "*)
    if [ -f "$ROOT/state/describe_failures" ]; then
      n=$(cat "$ROOT/state/describe_failures")
      if [ "$n" -gt 0 ]; then
        echo $((n - 1)) > "$ROOT/state/describe_failures"
        echo "transient index error" >&2
        exit 1
      fi
    fi
    respond describe.json ;;
  "package repo list --json")
    respond repo_list.json ;;
  "package repo add --index=0 "*)
    # Front of the list: the production stream resolves first.
    cp "$ROOT/responses/describe_production.json" "$ROOT/responses/describe.json" ;;
  "package repo add "*)
    # Default (lowest) priority: the candidate stream resolves again.
    cp "$ROOT/responses/describe_candidate.json" "$ROOT/responses/describe.json" ;;
  "package repo remove "*)
    ;;
  "package uninstall "*)
    ;;
  "package install "*)
    ;;
  "marathon app remove "*)
    ;;
  "task --json")
    respond tasks.json ;;
  *" update start"*)
    # A staged post-update state takes effect once the update is issued.
    if [ -f "$ROOT/responses/config_after.json" ]; then
      cp "$ROOT/responses/config_after.json" "$ROOT/responses/config.json"
    fi
    if [ -f "$ROOT/responses/tasks_after.json" ]; then
      cp "$ROOT/responses/tasks_after.json" "$ROOT/responses/tasks.json"
    fi
    ;;
  *" debug config target")
    respond config.json ;;
  *" plan status deploy --json")
    respond plan.json ;;
  *)
    ;;
esac
exit 0
"#,
            root = self.dir().display()
        );

        let path = self.bin();
        std::fs::write(&path, script).expect("writing fake CLI script");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("marking fake CLI executable");
        }
    }
}

impl Default for FakeCli {
    fn default() -> Self {
        Self::new()
    }
}
