//! Package repository list manipulation
//!
//! The platform consults an ordered list of package repositories when
//! resolving a package name; whichever repository is closest to the front
//! wins. The harness exploits this to make two streams of the same package
//! independently installable: moving the production repository to index 0
//! makes the released version resolvable, and restoring it to the default
//! (lowest) priority makes the candidate build resolvable again.
//!
//! Mutation failures here are fatal and never retried - every install that
//! follows depends on the list being in the expected state.

use anyhow::Result;
use serde::Deserialize;

use crate::core::HarnessError;
use crate::platform::Platform;

/// One entry of the platform's repository priority list
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RepositoryEntry {
    /// Repository name, unique within the list
    pub name: String,
    /// Repository URI
    pub uri: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryList {
    repositories: Vec<RepositoryEntry>,
}

/// Fetch the ordered repository list
pub async fn list(platform: &Platform) -> Result<Vec<RepositoryEntry>> {
    let output = platform
        .command()
        .args(["package", "repo", "list", "--json"])
        .execute_success()
        .await?;

    let parsed: RepositoryList = serde_json::from_str(output.stdout_trimmed())
        .map_err(HarnessError::JsonError)?;
    Ok(parsed.repositories)
}

/// Look up the URI of a repository by name
///
/// The production repository must exist before the toggle starts; absence
/// is a fatal lookup failure, not a retry case.
pub async fn uri_of(platform: &Platform, name: &str) -> Result<String> {
    let repositories = list(platform).await?;
    match repositories.iter().find(|repo| repo.name == name) {
        Some(repo) => {
            tracing::info!(target: "repo", "Found {} URL: {}", name, repo.uri);
            Ok(repo.uri.clone())
        }
        None => {
            tracing::error!(
                target: "repo",
                "Unable to find '{}' in list of repos: {:?}",
                name,
                repositories
            );
            Err(HarnessError::RepositoryMutationFailed {
                operation: "lookup".to_string(),
                name: name.to_string(),
            }
            .into())
        }
    }
}

/// Add a repository, optionally at a specific priority index
///
/// Index 0 is the highest priority; omitting the index appends at the
/// default (lowest) priority.
pub async fn add(
    platform: &Platform,
    name: &str,
    uri: &str,
    index: Option<usize>,
) -> Result<()> {
    let mut cmd = platform.command().args(["package", "repo", "add"]);
    if let Some(index) = index {
        cmd = cmd.arg(format!("--index={index}"));
    }
    let result = cmd.arg(name).arg(uri).execute().await?;

    if result.success() {
        tracing::debug!(target: "repo", "Added repo {} at index {:?}", name, index);
        Ok(())
    } else {
        tracing::error!(target: "repo", "Failed to add repo {}: {}", name, result.stderr.trim_end());
        Err(HarnessError::RepositoryMutationFailed {
            operation: "add".to_string(),
            name: name.to_string(),
        }
        .into())
    }
}

/// Remove a repository by name
pub async fn remove(platform: &Platform, name: &str) -> Result<()> {
    let result = platform
        .command()
        .args(["package", "repo", "remove", name])
        .execute()
        .await?;

    if result.success() {
        tracing::debug!(target: "repo", "Removed repo {}", name);
        Ok(())
    } else {
        tracing::error!(
            target: "repo",
            "Failed to remove repo {}: {}",
            name,
            result.stderr.trim_end()
        );
        Err(HarnessError::RepositoryMutationFailed {
            operation: "remove".to_string(),
            name: name.to_string(),
        }
        .into())
    }
}

/// Move a repository to the front of the priority list
pub async fn move_to_front(platform: &Platform, name: &str, uri: &str) -> Result<()> {
    remove(platform, name).await?;
    add(platform, name, uri, Some(0)).await
}

/// Return a repository to the default (lowest) priority
pub async fn move_to_default(platform: &Platform, name: &str, uri: &str) -> Result<()> {
    remove(platform, name).await?;
    add(platform, name, uri, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_list_parsing() {
        let raw = r#"{"repositories": [
            {"name": "Universe", "uri": "https://universe.example.com/repo"},
            {"name": "stub", "uri": "https://stub.example.com/repo.json"}
        ]}"#;
        let parsed: RepositoryList = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.repositories.len(), 2);
        assert_eq!(parsed.repositories[0].name, "Universe");
        assert_eq!(parsed.repositories[1].uri, "https://stub.example.com/repo.json");
    }
}
