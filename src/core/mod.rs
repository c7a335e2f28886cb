//! Core types for uplift
//!
//! This module holds the foundation of the harness's type system: the error
//! taxonomy and the user-facing error reporting machinery.
//!
//! # Error Management
//!
//! Uplift uses a two-layer error system:
//! - **Strongly-typed errors** ([`HarnessError`]) for precise handling in code
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions
//!   for CLI users, produced by [`user_friendly_error`]
//!
//! Transient failures (CLI hiccups, a package index that has not caught up
//! with a repository change yet) are never surfaced through these types
//! directly; the retry policies in [`crate::retry`] mask them until their
//! ceiling is hit, at which point they become a typed error such as
//! [`HarnessError::VersionUnavailable`].

pub mod error;

pub use error::{ErrorContext, HarnessError, user_friendly_error};
