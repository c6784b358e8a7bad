//! Core retry types and policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use nbaflow_core::FetchError;

/// How long a single unit (or a reprocessing stage) may keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Stop after this many timeout failures. A unit always gets at least
    /// one attempt, so `Bounded(0)` behaves like `Bounded(1)` per unit.
    Bounded(u32),
    /// Never give up on timeouts. Termination is not guaranteed: a remote
    /// that always times out keeps the caller looping forever.
    Unbounded,
}

impl RetryStrategy {
    /// Whether `count` failed attempts (or passes) use up the budget.
    pub fn is_exhausted(&self, count: u32) -> bool {
        match self {
            RetryStrategy::Bounded(max) => count >= *max,
            RetryStrategy::Unbounded => false,
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Unbounded
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retry budget
    pub strategy: RetryStrategy,
    /// Added to the unit's timeout after each timeout failure
    pub timeout_increment: Duration,
    /// Wait before the next attempt
    pub inter_attempt_delay: Duration,
    /// Emit a warning every N failed attempts (0 = never)
    pub verbosity_threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Unbounded,
            timeout_increment: Duration::from_secs(5),
            inter_attempt_delay: Duration::from_secs(3),
            verbosity_threshold: 5,
        }
    }
}

impl RetryPolicy {
    /// Give up on a unit after `max_attempts` timeouts.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            strategy: RetryStrategy::Bounded(max_attempts),
            ..Default::default()
        }
    }

    /// Retry timeouts until the remote answers.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout_increment(mut self, increment: Duration) -> Self {
        self.timeout_increment = increment;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_attempt_delay = delay;
        self
    }

    pub fn with_verbosity_threshold(mut self, every: u32) -> Self {
        self.verbosity_threshold = every;
        self
    }

    /// Whether the `attempts`-th failure should be surfaced as a warning.
    pub fn should_warn(&self, attempts: u32) -> bool {
        self.verbosity_threshold > 0 && attempts % self.verbosity_threshold == 0
    }
}

/// Policies for a full collection run: the batch pass, then optionally a
/// reprocessing stage over what the batch pass could not fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub policy: RetryPolicy,
    /// `None` disables reprocessing.
    pub reprocess: Option<RetryPolicy>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            policy: Self::default_batch_policy(),
            reprocess: Some(Self::default_reprocess_policy()),
        }
    }
}

impl BatchConfig {
    /// One attempt per unit; timeouts are left to the reprocessing stage.
    pub fn default_batch_policy() -> RetryPolicy {
        RetryPolicy::bounded(1)
    }

    /// Unbounded passes, 10s more timeout per pass.
    pub fn default_reprocess_policy() -> RetryPolicy {
        RetryPolicy::unbounded().with_timeout_increment(Duration::from_secs(10))
    }

    pub fn without_reprocess(mut self) -> Self {
        self.reprocess = None;
        self
    }
}

/// One fetchable item: the parameters to reissue the request plus the
/// timeout to issue it with.
///
/// Parameters are fixed at construction. The timeout only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit<P> {
    params: P,
    timeout: Duration,
}

impl<P> WorkUnit<P> {
    pub fn new(params: P, timeout: Duration) -> Self {
        Self { params, timeout }
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Grow the timeout for the next attempt.
    pub fn escalate(&mut self, by: Duration) {
        self.timeout = self.timeout.saturating_add(by);
    }

    pub fn into_params(self) -> P {
        self.params
    }
}

/// Result of running one unit until success, fatal error or exhaustion.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// Timed out until the retry budget ran out. Eligible for reprocessing.
    TransientFailure(FetchError),
    /// Failed for a reason retrying cannot fix.
    FatalFailure(FetchError),
}

impl<T> AttemptOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<T, FetchError> {
        match self {
            AttemptOutcome::Success(payload) => Ok(payload),
            AttemptOutcome::TransientFailure(err) | AttemptOutcome::FatalFailure(err) => Err(err),
        }
    }
}
