//! Uplift - upgrade/downgrade test harness for cluster services
//!
//! Uplift validates the upgrade and downgrade paths of a clustered service
//! package that is deployed through a package-repository-driven platform. It
//! drives the platform's command-line binary to install, upgrade, and
//! downgrade a managed service, then polls the platform until the resulting
//! deployment plan completes.
//!
//! # Architecture Overview
//!
//! The harness is a strictly sequential pipeline:
//!
//! 1. **Version resolution** - query the current and target package versions
//!    from the platform's package index, with fixed-interval retries.
//! 2. **Repository toggling** - temporarily move the production repository to
//!    the front of the repository priority list so the released version of a
//!    package resolves first, install that baseline, then restore the list.
//! 3. **Orchestration** - pick between an in-place `update start` flow and a
//!    destroy-and-reinstall fallback, based on what the connected cluster's
//!    version and edition actually support.
//! 4. **Deployment waiting** - compare configuration snapshots and task-id
//!    sets taken before and after the update to decide whether tasks should
//!    restart, then poll the deployment plan until it reports completion.
//!
//! Everything external is reached through one seam: the platform CLI binary,
//! executed via [`platform::PlatformCommand`]. Tests point that seam at a
//! scripted stand-in, so the whole pipeline is exercisable without a cluster.
//!
//! # Core Modules
//!
//! - [`cli`] - command-line interface (`upgrade`, `soak`, `resolve`)
//! - [`config`] - harness configuration file and environment overrides
//! - [`core`] - error types and user-facing error reporting
//! - [`platform`] - platform CLI execution and cluster introspection
//! - [`retry`] - fixed-interval retry policies
//!
//! # Orchestration Modules
//!
//! - [`package`] - package version resolution against the package index
//! - [`repository`] - package repository list manipulation
//! - [`service`] - service install/uninstall, config snapshots, tasks, plans
//! - [`upgrade`] - the upgrade/downgrade flows and capability predicates
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Install the released version of a package, then upgrade it to the
//! # candidate version currently served by the default repository order:
//! uplift upgrade hello-world --service /hello --tasks 3
//!
//! # Upgrade to the candidate stream and back down on a soak cluster:
//! uplift soak hello-world --service /hello --tasks 3
//!
//! # Resolve whatever version the package index currently serves:
//! uplift resolve hello-world
//! ```

// Core functionality
pub mod cli;
pub mod config;
pub mod core;
pub mod platform;
pub mod retry;

// Orchestration
pub mod package;
pub mod repository;
pub mod service;
pub mod upgrade;

// test_utils is available to both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
