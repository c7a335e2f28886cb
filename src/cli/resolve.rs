//! The `resolve` command

use anyhow::Result;
use clap::Parser;

use crate::package;
use crate::platform::Platform;
use crate::retry::FixedRetry;

/// Arguments for resolving a package version
///
/// Prints the version the package index currently serves for a name. Which
/// stream that is depends on the repository priority order at the time of
/// the call.
#[derive(Parser, Debug)]
pub struct ResolveCommand {
    /// Package to resolve
    #[arg(value_name = "PACKAGE")]
    pub package: String,
}

impl ResolveCommand {
    /// Resolve and print the version
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let version =
            package::resolve_version(platform, &self.package, &FixedRetry::resolve_version())
                .await?;
        println!("{version}");
        Ok(())
    }
}
