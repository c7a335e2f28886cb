//! Lenient platform version parsing and comparison
//!
//! Clusters report versions like `1.9`, `1.11.3`, or `1.13.0-beta`. The
//! capability predicates only need ordered comparison against two-component
//! thresholds, so this module parses leniently into [`semver::Version`] by
//! padding missing components with zeros.

use crate::core::HarnessError;
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// An ordered platform (cluster) version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlatformVersion(Version);

impl PlatformVersion {
    /// Parse a version string, padding missing components
    ///
    /// Accepts full semver (`1.13.0-beta`), two-component (`1.9`), and
    /// single-component (`2`) forms, with or without a leading `v`.
    pub fn parse(input: &str) -> Result<Self, HarnessError> {
        let trimmed = input.trim().trim_start_matches('v');

        if let Ok(version) = Version::parse(trimmed) {
            return Ok(Self(version));
        }

        // Pad "1.9" style versions to "1.9.0", preserving any -prerelease
        // suffix on the last component.
        let (numeric, prerelease) = match trimmed.split_once('-') {
            Some((n, p)) => (n, Some(p)),
            None => (trimmed, None),
        };

        let mut parts = numeric.split('.');
        let major = Self::component(&mut parts, input)?;
        let minor = Self::component_or_zero(&mut parts, input)?;
        let patch = Self::component_or_zero(&mut parts, input)?;
        if parts.next().is_some() {
            return Err(Self::invalid(input));
        }

        let mut version = Version::new(major, minor, patch);
        if let Some(pre) = prerelease {
            version.pre =
                semver::Prerelease::new(pre).map_err(|_| Self::invalid(input))?;
        }
        Ok(Self(version))
    }

    /// Whether this version is at least `other`
    #[must_use]
    pub fn at_least(&self, other: &Self) -> bool {
        self.0 >= other.0
    }

    fn component<'a>(
        parts: &mut impl Iterator<Item = &'a str>,
        input: &str,
    ) -> Result<u64, HarnessError> {
        parts
            .next()
            .ok_or_else(|| Self::invalid(input))?
            .parse()
            .map_err(|_| Self::invalid(input))
    }

    fn component_or_zero<'a>(
        parts: &mut impl Iterator<Item = &'a str>,
        input: &str,
    ) -> Result<u64, HarnessError> {
        match parts.next() {
            Some(part) => part.parse().map_err(|_| Self::invalid(input)),
            None => Ok(0),
        }
    }

    fn invalid(input: &str) -> HarnessError {
        HarnessError::ConfigError { message: format!("Invalid platform version: '{input}'") }
    }
}

impl FromStr for PlatformVersion {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
