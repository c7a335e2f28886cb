//! Command-line interface for uplift
//!
//! Each command lives in its own module with its own argument structure and
//! execution logic:
//!
//! - `upgrade` - install the released version of a package, upgrade to the
//!   candidate build ([`upgrade::UpgradeCommand`])
//! - `soak` - upgrade to the candidate build and downgrade back, for soak
//!   clusters where the released version is already running
//!   ([`soak::SoakCommand`])
//! - `resolve` - print the package version the index currently serves
//!   ([`resolve::ResolveCommand`])
//!
//! # Global Options
//!
//! All commands support:
//! - `--verbose` / `--quiet` - output level
//! - `--config` - path to a custom `uplift.toml`
//! - `--cli` - platform CLI binary (also `UPLIFT_CLI`)
//!
//! # Example
//!
//! ```bash
//! uplift upgrade hello-world --service /hello --tasks 3
//! uplift --verbose soak kafka --service /kafka --tasks 5 --options kafka.json
//! uplift resolve hello-world
//! ```

pub mod common;
mod resolve;
mod soak;
mod upgrade;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::HarnessConfig;
use crate::platform::{Platform, PlatformVersion};

/// Main CLI structure for uplift
///
/// Global options are available to every subcommand; the mutual exclusion
/// of `--verbose` and `--quiet` is enforced by the parser.
#[derive(Parser)]
#[command(
    name = "uplift",
    about = "Upgrade/downgrade test harness for package-repository-driven cluster services",
    version,
    long_about = "Uplift drives a platform CLI to install, upgrade, and downgrade a managed \
                  service package, polling the deployment plan for completion. It validates \
                  both the in-place update flow and the destroy-and-reinstall fallback."
)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug-level) output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Platform CLI binary name or path
    #[arg(long, global = true, env = "UPLIFT_CLI", value_name = "BINARY")]
    cli: Option<String>,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Install the released version of a package, then upgrade it to the
    /// candidate version
    Upgrade(upgrade::UpgradeCommand),

    /// Upgrade to the candidate version and downgrade back to the released
    /// one (soak clusters)
    Soak(soak::SoakCommand),

    /// Resolve and print the version the package index currently serves
    Resolve(resolve::ResolveCommand),
}

impl Cli {
    /// Initialize the tracing subscriber from the verbosity flags
    ///
    /// An explicit `RUST_LOG` wins over the flag-derived level. Quiet mode
    /// installs no subscriber at all.
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let filter = if self.verbose {
            EnvFilter::new("debug")
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new("info")
        };

        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
    }

    /// Execute the selected command
    ///
    /// Loads the layered configuration, connects the platform handle, and
    /// dispatches.
    pub async fn execute(self) -> Result<()> {
        let mut config = HarnessConfig::load(self.config.as_deref())?;
        if let Some(cli) = self.cli {
            config.cli = cli;
        }

        let platform = connect(&config).await?;

        match self.command {
            Commands::Upgrade(cmd) => cmd.execute(&platform, &config).await,
            Commands::Soak(cmd) => cmd.execute(&platform, &config).await,
            Commands::Resolve(cmd) => cmd.execute(&platform).await,
        }
    }
}

/// Build the platform handle from configuration
///
/// A pinned `[cluster]` section skips the `about --json` query; otherwise
/// the cluster is interrogated.
async fn connect(config: &HarnessConfig) -> Result<Platform> {
    match &config.cluster {
        Some(cluster) => {
            let version = PlatformVersion::parse(&cluster.version)?;
            Ok(Platform::with_cluster(
                PathBuf::from(&config.cli),
                version,
                cluster.open_edition,
            ))
        }
        None => Platform::detect(&config.cli).await,
    }
}
