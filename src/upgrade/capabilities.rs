//! Capability predicates gating the in-place update path
//!
//! Whether a cluster's CLI can update a running service in place depends on
//! the platform version and edition:
//!
//! - service **options** updates need 1.9+ enterprise, or 1.11+ open
//! - service **version** upgrades additionally need the enterprise edition
//!
//! The orchestrator consults these predicates to pick between the in-place
//! `update start` flow and the destroy-and-reinstall fallback. The
//! `ensure_*` forms are for call sites where support is a precondition:
//! violating one is a contract bug in the calling test, reported as
//! [`HarnessError::CapabilityViolation`] and never retried.

use crate::core::HarnessError;
use crate::platform::Platform;

/// Whether the CLI supports in-place service options updates
///
/// Supported on enterprise 1.9+ and open 1.11+.
#[must_use]
pub fn options_update_supported(platform: &Platform) -> bool {
    platform.version_at_least("1.9")
        && (!platform.is_open_edition() || platform.version_at_least("1.11"))
}

/// Whether the CLI supports in-place service version upgrades
///
/// Everything options updates need, plus the enterprise edition.
#[must_use]
pub fn version_upgrade_supported(platform: &Platform) -> bool {
    options_update_supported(platform) && !platform.is_open_edition()
}

/// Require options update support
pub fn ensure_options_update_supported(platform: &Platform) -> Result<(), HarnessError> {
    if options_update_supported(platform) {
        Ok(())
    } else {
        Err(HarnessError::CapabilityViolation {
            reason: "service options updates need enterprise 1.9+ or open 1.11+".to_string(),
        })
    }
}

/// Require version upgrade support
pub fn ensure_version_upgrade_supported(platform: &Platform) -> Result<(), HarnessError> {
    if version_upgrade_supported(platform) {
        Ok(())
    } else {
        Err(HarnessError::CapabilityViolation {
            reason: "service version upgrades need the enterprise edition on 1.9+".to_string(),
        })
    }
}
