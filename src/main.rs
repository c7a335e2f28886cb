//! Uplift CLI entry point
//!
//! This is the main executable for the uplift upgrade test harness. It
//! handles command-line argument parsing, logging setup, error display, and
//! command execution.
//!
//! Supported commands:
//! - `upgrade` - install the released version of a package, upgrade to the candidate
//! - `soak` - upgrade to the candidate version and downgrade back (soak clusters)
//! - `resolve` - print the package version the index currently serves

use anyhow::Result;
use clap::Parser;
use uplift::cli;
use uplift::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    cli.init_logging();

    match cli.execute().await {
        Ok(_) => Ok(()),
        Err(e) => {
            // Convert to a user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
