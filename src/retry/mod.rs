//! Fixed-interval retry policies
//!
//! Every transient-failure mask in the harness is an explicit
//! [`FixedRetry`] value wrapping a single fetch operation, rather than an
//! ad-hoc loop at each call site. The policy is retry-on-`None`: the wrapped
//! operation reports a transient miss by returning `None`, and the policy
//! keeps re-invoking it on a fixed interval until it yields `Some` or the
//! ceiling (a maximum attempt count or a maximum elapsed budget) is hit.
//!
//! Backoff is deliberately fixed, not exponential: the harness is polling
//! cluster state that converges on its own schedule, so spacing the polls
//! out further only slows detection.
//!
//! The named constructors ([`FixedRetry::resolve_version`],
//! [`FixedRetry::new_version`], [`FixedRetry::config_fetch`]) carry the
//! harness's production ceilings; call sites accept a `&FixedRetry` so tests
//! can substitute millisecond-scale policies.

use std::future::Future;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;

/// When a retry policy gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Give up after this many invocations of the operation
    MaxAttempts(usize),
    /// Give up once the sleeps between invocations would exceed this budget
    MaxElapsed(Duration),
}

/// A fixed-interval, retry-on-`None` policy
///
/// Wraps an async operation returning `Option<T>` and re-invokes it on a
/// fixed cadence until it produces `Some`, translating "not yet" into
/// bounded patience. The policy itself is pure data, so it can be unit
/// tested and substituted independently of any fetch logic.
#[derive(Debug, Clone, Copy)]
pub struct FixedRetry {
    interval: Duration,
    stop: Stop,
}

impl FixedRetry {
    /// Policy with a fixed interval and a maximum number of attempts
    #[must_use]
    pub const fn attempts(interval: Duration, max_attempts: usize) -> Self {
        Self { interval, stop: Stop::MaxAttempts(max_attempts) }
    }

    /// Policy with a fixed interval and a maximum elapsed sleep budget
    #[must_use]
    pub const fn elapsed(interval: Duration, max_elapsed: Duration) -> Self {
        Self { interval, stop: Stop::MaxElapsed(max_elapsed) }
    }

    /// Policy for resolving a package version from the index
    ///
    /// 1 second between attempts, bounded at roughly 10 seconds total.
    #[must_use]
    pub const fn resolve_version() -> Self {
        Self::elapsed(Duration::from_secs(1), Duration::from_secs(10))
    }

    /// Policy for detecting that a repository change took effect
    ///
    /// The package index can take a while to start serving the other stream
    /// after a repository priority change: 10 seconds between attempts,
    /// 15 attempts.
    #[must_use]
    pub const fn new_version() -> Self {
        Self::attempts(Duration::from_secs(10), 15)
    }

    /// Policy for fetching a service's target config snapshot
    ///
    /// The config endpoint is briefly unavailable while a scheduler
    /// restarts: 10 seconds between attempts, 15 attempts.
    #[must_use]
    pub const fn config_fetch() -> Self {
        Self::attempts(Duration::from_secs(10), 15)
    }

    /// The interval between attempts
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Total number of invocations this policy will make before giving up
    #[must_use]
    pub fn max_attempts(&self) -> usize {
        match self.stop {
            Stop::MaxAttempts(n) => n.max(1),
            Stop::MaxElapsed(budget) => {
                let interval_ms = self.interval.as_millis().max(1);
                // One initial attempt plus one per interval that fits in the budget.
                (budget.as_millis() / interval_ms) as usize + 1
            }
        }
    }

    /// Run `op` until it returns `Some` or the ceiling is hit
    ///
    /// Returns `None` when every attempt came back empty; the caller decides
    /// which typed error that exhaustion maps to.
    pub async fn run_until_some<T, F, Fut>(&self, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let retries = self.max_attempts().saturating_sub(1);
        let strategy = FixedInterval::new(self.interval).take(retries);

        Retry::start(strategy, || {
            let fut = op();
            async move { fut.await.ok_or(()) }
        })
        .await
        .ok()
    }
}
