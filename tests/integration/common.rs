//! Shared assertions over the fake CLI's call log

/// Assert that `expected` occurs as an in-order subsequence of `calls`
///
/// Each expected entry matches a recorded call by prefix, so assertions can
/// pin the interesting leading arguments without spelling out tempfile
/// paths and the like.
pub fn assert_call_sequence(calls: &[String], expected: &[&str]) {
    let mut remaining = calls.iter();
    for want in expected {
        assert!(
            remaining.any(|call| call.starts_with(want)),
            "expected a call starting with '{want}' (in order) among:\n{}",
            calls.join("\n")
        );
    }
}
