//! Shared helpers for CLI commands

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Read a service options document from a JSON file
pub fn read_options_file(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Reading options file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Parsing options file {}", path.display()))
}

/// Default service name for a package: a root-level path
///
/// `hello-world` installs as `/hello-world` unless the caller names the
/// service explicitly.
#[must_use]
pub fn default_service_name(package: &str) -> String {
    format!("/{package}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_default_service_name() {
        assert_eq!(default_service_name("hello-world"), "/hello-world");
    }

    #[test]
    fn test_read_options_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"count": 3}}"#).unwrap();
        assert_eq!(read_options_file(file.path()).unwrap(), json!({"count": 3}));
    }

    #[test]
    fn test_read_options_file_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(read_options_file(file.path()).is_err());
    }
}
