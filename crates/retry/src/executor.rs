//! Request executor with timeout escalation and reprocessing.

use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use nbaflow_core::FetchResult;

use super::records::{BatchReport, FailureRecord, FailureRecords};
use super::types::{AttemptOutcome, BatchConfig, RetryPolicy, WorkUnit};

/// One remote call for a set of parameters, bounded by `timeout`.
///
/// Implementations report timeout-class failures as
/// [`FetchError::Timeout`](nbaflow_core::FetchError::Timeout); any other
/// error is treated as fatal for the unit.
pub trait Fetch<P> {
    type Output;

    fn fetch(&self, params: &P, timeout: Duration) -> FetchResult<Self::Output>;
}

impl<P, T, F> Fetch<P> for F
where
    F: Fn(&P, Duration) -> FetchResult<T>,
{
    type Output = T;

    fn fetch(&self, params: &P, timeout: Duration) -> FetchResult<T> {
        self(params, timeout)
    }
}

/// Where the executor waits between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Does not wait at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSleeper;

impl Sleeper for NoopSleeper {
    fn sleep(&self, _duration: Duration) {}
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Runs work units against a fetcher, sequentially, in input order.
///
/// All bookkeeping lives in the values returned from each call; the
/// executor itself holds no state between calls.
pub struct RequestExecutor<F, S = ThreadSleeper> {
    fetcher: F,
    sleeper: S,
}

impl<F> RequestExecutor<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            sleeper: ThreadSleeper,
        }
    }
}

impl<F, S: Sleeper> RequestExecutor<F, S> {
    /// Replace the sleeper (tests and benches use [`NoopSleeper`]).
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> RequestExecutor<F, S2> {
        RequestExecutor {
            fetcher: self.fetcher,
            sleeper,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Run one unit until success, a fatal error, or the budget runs out.
    ///
    /// The unit's timeout is raised in place after every timeout failure, so
    /// callers see the last timeout used once this returns.
    pub fn execute_one<P>(
        &self,
        unit: &mut WorkUnit<P>,
        policy: &RetryPolicy,
    ) -> AttemptOutcome<F::Output>
    where
        F: Fetch<P>,
        P: fmt::Debug,
    {
        self.run_unit(unit, policy).0
    }

    /// Run every unit once through [`execute_one`](Self::execute_one).
    ///
    /// Never stops early: exhausted and fatal units are recorded and the
    /// batch moves on.
    pub fn execute_batch<P, I>(&self, units: I, policy: &RetryPolicy) -> BatchReport<P, F::Output>
    where
        F: Fetch<P>,
        P: fmt::Debug,
        I: IntoIterator<Item = WorkUnit<P>>,
    {
        let mut report = BatchReport::empty();

        for mut unit in units {
            report.total += 1;
            let (outcome, attempts) = self.run_unit(&mut unit, policy);
            match outcome {
                AttemptOutcome::Success(payload) => report.results.push(payload),
                AttemptOutcome::TransientFailure(reason) => {
                    report
                        .failures
                        .push(FailureRecord::transient(unit, reason, attempts));
                }
                AttemptOutcome::FatalFailure(reason) => {
                    report
                        .failures
                        .push(FailureRecord::fatal(unit, reason, attempts));
                }
            }
        }

        report
    }

    /// Retry the retriable part of `records` in whole passes.
    ///
    /// Every pass makes exactly one attempt per pending unit, its timeout
    /// first raised by `policy.timeout_increment`. `policy.strategy` bounds
    /// only the number of passes. Stops as soon as nothing retriable is
    /// left. Fatal records are passed through untouched.
    pub fn reprocess<P>(
        &self,
        records: FailureRecords<P>,
        policy: &RetryPolicy,
    ) -> BatchReport<P, F::Output>
    where
        F: Fetch<P>,
        P: fmt::Debug,
    {
        let (mut pending, mut terminal) = records.split_retriable();
        let mut report = BatchReport::empty();
        report.total = pending.len();

        let mut passes = 0u32;
        while !pending.is_empty() && !policy.strategy.is_exhausted(passes) {
            passes += 1;
            if passes > 1 {
                self.sleeper.sleep(policy.inter_attempt_delay);
            }
            debug!(pass = passes, remaining = pending.len(), "reprocessing pass");

            let mut still_failing = FailureRecords::new();
            for record in pending {
                let mut unit = record.into_unit();
                unit.escalate(policy.timeout_increment);

                match self.fetcher.fetch(unit.params(), unit.timeout()) {
                    Ok(payload) => report.results.push(payload),
                    Err(err) if err.is_timeout() => {
                        still_failing.push(FailureRecord::transient(unit, err, 1));
                    }
                    Err(err) => {
                        error!(
                            unit = ?unit.params(),
                            reason = %err,
                            "reprocessing failed, not retrying"
                        );
                        terminal.push(FailureRecord::fatal(unit, err, 1));
                    }
                }
            }
            pending = still_failing;

            if policy.should_warn(passes) && !pending.is_empty() {
                warn!(
                    pass = passes,
                    remaining = pending.len(),
                    "units still failing after reprocessing pass"
                );
            }
        }

        if !pending.is_empty() {
            warn!(
                passes,
                remaining = pending.len(),
                "reprocessing passes exhausted with failures left"
            );
        }

        terminal.extend(pending);
        report.failures = terminal;
        report
    }

    /// Batch pass followed, if configured, by reprocessing of its failures.
    pub fn run<P, I>(&self, units: I, config: &BatchConfig) -> BatchReport<P, F::Output>
    where
        F: Fetch<P>,
        P: fmt::Debug,
        I: IntoIterator<Item = WorkUnit<P>>,
    {
        let mut report = self.execute_batch(units, &config.policy);

        if let Some(reprocess_policy) = &config.reprocess {
            if report.failures.retriable_len() > 0 {
                warn!(
                    total = report.total,
                    failed = report.failures.len(),
                    pct_success = %format!("{:.1}%", report.success_rate()),
                    "batch finished with failures, reprocessing"
                );
                let failures = std::mem::take(&mut report.failures);
                let recovered = self.reprocess(failures, reprocess_policy);
                report.results.extend(recovered.results);
                report.failures = recovered.failures;
            }
        }

        info!(
            total = report.total,
            succeeded = report.results.len(),
            failed = report.failures.len(),
            pct_success = %format!("{:.1}%", report.success_rate()),
            "batch finished"
        );
        report
    }

    fn run_unit<P>(
        &self,
        unit: &mut WorkUnit<P>,
        policy: &RetryPolicy,
    ) -> (AttemptOutcome<F::Output>, u32)
    where
        F: Fetch<P>,
        P: fmt::Debug,
    {
        let mut failures = 0u32;

        loop {
            match self.fetcher.fetch(unit.params(), unit.timeout()) {
                Ok(payload) => return (AttemptOutcome::Success(payload), failures + 1),
                Err(err) if err.is_timeout() => {
                    failures += 1;

                    if policy.strategy.is_exhausted(failures) {
                        error!(
                            unit = ?unit.params(),
                            attempts = failures,
                            timeout_secs = unit.timeout().as_secs_f64(),
                            "retry budget exhausted"
                        );
                        return (AttemptOutcome::TransientFailure(err), failures);
                    }

                    if policy.should_warn(failures) {
                        let next_timeout = unit.timeout().saturating_add(policy.timeout_increment);
                        warn!(
                            unit = ?unit.params(),
                            attempts = failures,
                            timeout_secs = unit.timeout().as_secs_f64(),
                            next_timeout_secs = next_timeout.as_secs_f64(),
                            "request timed out, retrying"
                        );
                    }

                    unit.escalate(policy.timeout_increment);
                    self.sleeper.sleep(policy.inter_attempt_delay);
                }
                Err(err) => {
                    error!(unit = ?unit.params(), reason = %err, "request failed, not retrying");
                    return (AttemptOutcome::FatalFailure(err), failures + 1);
                }
            }
        }
    }
}
