//! Harness configuration
//!
//! Configuration is layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a TOML config file - an explicit `--config` path, else `uplift.toml`
//!    in the working directory, else `uplift/config.toml` under the user's
//!    config directory
//! 3. `UPLIFT_*` environment variables
//! 4. command-line flags (applied by the CLI layer)
//!
//! # Example config file
//!
//! ```toml
//! cli = "/usr/local/bin/dcos"
//! production_repo = "Universe"
//! timeout_secs = 1500
//!
//! # Pin the cluster identity instead of querying `about --json`:
//! [cluster]
//! version = "1.11"
//! open_edition = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::HarnessError;

/// Config file name looked up in the working directory
const LOCAL_CONFIG: &str = "uplift.toml";

/// Pinned cluster identity, bypassing `about --json` detection
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterOverride {
    /// Cluster version, e.g. "1.11"
    pub version: String,
    /// Whether the cluster runs the open edition
    #[serde(default)]
    pub open_edition: bool,
}

/// Top-level harness configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Platform CLI binary name or path
    pub cli: String,
    /// Name of the production package repository
    pub production_repo: String,
    /// Default budget for installs and deployment plans, in seconds
    pub timeout_secs: u64,
    /// Pinned cluster identity, when detection is unwanted
    pub cluster: Option<ClusterOverride>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cli: "dcos".to_string(),
            production_repo: "Universe".to_string(),
            timeout_secs: 25 * 60,
            cluster: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration, layering file and environment over the defaults
    ///
    /// An explicit `path` must exist and parse; the discovered locations
    /// are optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match discover_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides(std::env::vars());
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        toml::from_str(&raw).map_err(|e| {
            HarnessError::ConfigError {
                message: format!("Invalid config file {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Apply `UPLIFT_*` overrides from an environment snapshot
    ///
    /// Takes the variables as an iterator so tests can feed a controlled
    /// environment instead of mutating the process-wide one.
    pub fn apply_env_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            match key.as_str() {
                "UPLIFT_CLI" => self.cli = value,
                "UPLIFT_PRODUCTION_REPO" => self.production_repo = value,
                "UPLIFT_TIMEOUT_SECS" => match value.parse() {
                    Ok(secs) => self.timeout_secs = secs,
                    Err(_) => {
                        tracing::warn!(
                            target: "config",
                            "Ignoring non-numeric UPLIFT_TIMEOUT_SECS: '{value}'"
                        );
                    }
                },
                _ => {}
            }
        }
    }
}

/// Find a config file in the standard locations
fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("uplift").join("config.toml");
    user.is_file().then_some(user)
}
