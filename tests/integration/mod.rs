//! Integration test suite for uplift
//!
//! Every test here drives the real pipeline end to end against a scripted
//! platform CLI ([`uplift::test_utils::FakeCli`]); nothing talks to a live
//! cluster. The fake records each invocation, so tests assert on both the
//! outcome of a flow and the exact command sequence it issued.

mod common;

mod cli_args;
mod deployment;
mod resolver;
mod soak_flow;
mod upgrade_flow;
