//! The `soak` command

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use super::common;
use crate::config::HarnessConfig;
use crate::platform::Platform;
use crate::upgrade::{self, Timing, UpgradeRequest};

/// Arguments for the soak upgrade/downgrade flow
///
/// Assumes the released version of the package is already installed and the
/// repository list is in its default order (as on a soak cluster): upgrades
/// the service to the candidate build and then downgrades it back to the
/// released version, without touching the repository list.
#[derive(Parser, Debug)]
pub struct SoakCommand {
    /// Package under test
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Service instance name (defaults to /<package>)
    #[arg(long, value_name = "NAME")]
    pub service: Option<String>,

    /// Running-task count that marks an install as up
    #[arg(long = "tasks", value_name = "COUNT")]
    pub expected_running_tasks: usize,

    /// JSON file with service options, used for both phases
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Budget in seconds for installs and deployment plans
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Issue updates without blocking on deployment completion
    #[arg(long)]
    pub no_wait: bool,
}

impl SoakCommand {
    /// Run the soak flow against the connected cluster
    pub async fn execute(self, platform: &Platform, config: &HarnessConfig) -> Result<()> {
        let service = self
            .service
            .clone()
            .unwrap_or_else(|| common::default_service_name(&self.package));

        let mut request = UpgradeRequest::new(&self.package, service, self.expected_running_tasks)
            .with_timeout(Duration::from_secs(self.timeout.unwrap_or(config.timeout_secs)));
        if let Some(path) = &self.options {
            request = request.with_options(common::read_options_file(path)?);
        }
        if self.no_wait {
            request = request.no_wait();
        }

        upgrade::soak_upgrade_downgrade(platform, &request, &Timing::default()).await?;

        println!(
            "{} {} upgraded to the candidate version and back",
            "✓".green(),
            request.service.bold()
        );
        Ok(())
    }
}
