//! The `upgrade` command

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use super::common;
use crate::config::HarnessConfig;
use crate::platform::Platform;
use crate::upgrade::{self, Timing, UpgradeRequest};

/// Arguments for the full upgrade validation flow
///
/// Installs the released (production-stream) version of the package, then
/// upgrades the running service to the candidate build currently served by
/// the default repository order.
#[derive(Parser, Debug)]
pub struct UpgradeCommand {
    /// Package under test
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Service instance name (defaults to /<package>)
    #[arg(long, value_name = "NAME")]
    pub service: Option<String>,

    /// Running-task count that marks an install as up
    #[arg(long = "tasks", value_name = "COUNT")]
    pub expected_running_tasks: usize,

    /// JSON file with service options for the baseline install
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// JSON file with service options for the candidate phase
    ///
    /// Defaults to the baseline options when omitted.
    #[arg(long = "test-options", value_name = "FILE")]
    pub test_options: Option<PathBuf>,

    /// Budget in seconds for installs and deployment plans
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Issue updates without blocking on deployment completion
    #[arg(long)]
    pub no_wait: bool,
}

impl UpgradeCommand {
    /// Run the upgrade flow against the connected cluster
    pub async fn execute(self, platform: &Platform, config: &HarnessConfig) -> Result<()> {
        let request = self.build_request(config)?;

        upgrade::test_upgrade(platform, &config.production_repo, &request, &Timing::default())
            .await?;

        println!(
            "{} {} upgraded to the candidate version",
            "✓".green(),
            request.service.bold()
        );
        Ok(())
    }

    fn build_request(&self, config: &HarnessConfig) -> Result<UpgradeRequest> {
        let service = self
            .service
            .clone()
            .unwrap_or_else(|| common::default_service_name(&self.package));

        let mut request = UpgradeRequest::new(&self.package, service, self.expected_running_tasks)
            .with_timeout(Duration::from_secs(self.timeout.unwrap_or(config.timeout_secs)));

        if let Some(path) = &self.options {
            request = request.with_options(common::read_options_file(path)?);
        }
        if let Some(path) = &self.test_options {
            request = request.with_test_options(common::read_options_file(path)?);
        }
        if self.no_wait {
            request = request.no_wait();
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> UpgradeCommand {
        UpgradeCommand::parse_from(args)
    }

    #[test]
    fn test_build_request_defaults() {
        let cmd = parse(&["upgrade", "hello-world", "--tasks", "3"]);
        let request = cmd.build_request(&HarnessConfig::default()).unwrap();
        assert_eq!(request.package, "hello-world");
        assert_eq!(request.service, "/hello-world");
        assert_eq!(request.expected_running_tasks, 3);
        assert_eq!(request.timeout, Duration::from_secs(1500));
        assert!(request.wait_for_deployment);
    }

    #[test]
    fn test_build_request_overrides() {
        let cmd = parse(&[
            "upgrade", "kafka", "--service", "/data/kafka", "--tasks", "5", "--timeout", "600",
            "--no-wait",
        ]);
        let request = cmd.build_request(&HarnessConfig::default()).unwrap();
        assert_eq!(request.service, "/data/kafka");
        assert_eq!(request.timeout, Duration::from_secs(600));
        assert!(!request.wait_for_deployment);
    }
}
