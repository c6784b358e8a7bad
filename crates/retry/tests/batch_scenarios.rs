//! Batch and reprocessing scenarios against an in-memory remote.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use nbaflow_core::{FetchError, FetchResult};
use nbaflow_retry::{
    BatchConfig, FailureKind, Fetch, NoopSleeper, RequestExecutor, RetryPolicy, RetryStrategy,
    WorkUnit,
};

/// How a fake remote treats one key.
#[derive(Clone, Copy)]
enum Behaviour {
    Ok,
    /// Times out this many times, then answers
    SlowFor(u32),
    AlwaysTimesOut,
    Rejects,
}

struct FakeRemote {
    behaviour: HashMap<&'static str, Behaviour>,
    calls: RefCell<Vec<(&'static str, Duration)>>,
}

impl FakeRemote {
    fn new(behaviour: &[(&'static str, Behaviour)]) -> Self {
        Self {
            behaviour: behaviour.iter().copied().collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn calls_for(&self, key: &str) -> usize {
        self.calls.borrow().iter().filter(|(k, _)| *k == key).count()
    }

    fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Fetch<&'static str> for FakeRemote {
    type Output = String;

    fn fetch(&self, key: &&'static str, timeout: Duration) -> FetchResult<String> {
        let previous = self.calls_for(key) as u32;
        self.calls.borrow_mut().push((*key, timeout));
        match self.behaviour.get(key).copied().unwrap_or(Behaviour::Ok) {
            Behaviour::Ok => Ok(format!("payload-{key}")),
            Behaviour::SlowFor(n) if previous < n => Err(FetchError::timeout(timeout)),
            Behaviour::SlowFor(_) => Ok(format!("payload-{key}")),
            Behaviour::AlwaysTimesOut => Err(FetchError::timeout(timeout)),
            Behaviour::Rejects => {
                Err(FetchError::http(400, format!("https://stats.test/{key}")))
            }
        }
    }
}

fn units(keys: &[&'static str]) -> Vec<WorkUnit<&'static str>> {
    keys.iter()
        .map(|k| WorkUnit::new(*k, Duration::from_secs(30)))
        .collect()
}

fn fast(strategy: RetryStrategy) -> RetryPolicy {
    RetryPolicy {
        strategy,
        timeout_increment: Duration::from_secs(5),
        inter_attempt_delay: Duration::ZERO,
        verbosity_threshold: 5,
    }
}

fn executor(remote: FakeRemote) -> RequestExecutor<FakeRemote, NoopSleeper> {
    RequestExecutor::new(remote).with_sleeper(NoopSleeper)
}

#[test]
fn partial_failure_keeps_every_success() {
    let remote = FakeRemote::new(&[
        ("b", Behaviour::AlwaysTimesOut),
        ("d", Behaviour::AlwaysTimesOut),
        ("e", Behaviour::Rejects),
    ]);
    let executor = executor(remote);

    let report = executor.execute_batch(
        units(&["a", "b", "c", "d", "e", "f"]),
        &fast(RetryStrategy::Bounded(2)),
    );

    assert_eq!(report.total, 6);
    assert_eq!(report.results, vec!["payload-a", "payload-c", "payload-f"]);
    let failed: Vec<_> = report.failures.iter().map(|r| (*r.params(), r.kind)).collect();
    assert_eq!(
        failed,
        vec![
            ("b", FailureKind::Transient),
            ("d", FailureKind::Transient),
            ("e", FailureKind::Fatal)
        ]
    );
    assert_eq!(report.success_rate(), 50.0);
}

#[test]
fn batch_where_everything_fails_still_returns() {
    let remote = FakeRemote::new(&[
        ("a", Behaviour::AlwaysTimesOut),
        ("b", Behaviour::Rejects),
    ]);
    let executor = executor(remote);

    let report = executor.execute_batch(units(&["a", "b"]), &fast(RetryStrategy::Bounded(3)));

    assert!(report.results.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert_eq!(executor.fetcher().calls_for("a"), 3);
    assert_eq!(executor.fetcher().calls_for("b"), 1);
}

#[test]
fn units_are_attempted_in_input_order() {
    let remote = FakeRemote::new(&[("b", Behaviour::SlowFor(2))]);
    let executor = executor(remote);

    executor.execute_batch(units(&["a", "b", "c"]), &fast(RetryStrategy::Bounded(5)));

    let order: Vec<_> = executor
        .fetcher()
        .calls
        .borrow()
        .iter()
        .map(|(k, _)| *k)
        .collect();
    assert_eq!(order, vec!["a", "b", "b", "b", "c"]);
}

#[test]
fn one_reprocessing_pass_recovers_units_that_succeed_on_retry() {
    let remote = FakeRemote::new(&[("b", Behaviour::SlowFor(1)), ("d", Behaviour::SlowFor(1))]);
    let executor = executor(remote);

    // Single attempt per unit in the batch pass: first timeout is recorded.
    let first = executor.execute_batch(
        units(&["a", "b", "c", "d", "e"]),
        &fast(RetryStrategy::Bounded(1)),
    );
    assert_eq!(first.results, vec!["payload-a", "payload-c", "payload-e"]);
    let recorded: Vec<_> = first
        .failures
        .iter()
        .map(|r| (*r.params(), r.timeout()))
        .collect();
    assert_eq!(
        recorded,
        vec![("b", Duration::from_secs(30)), ("d", Duration::from_secs(30))]
    );

    let second = executor.reprocess(first.failures, &fast(RetryStrategy::Bounded(1)));

    assert!(second.failures.is_empty());
    assert_eq!(second.results, vec!["payload-b", "payload-d"]);
    let retried: Vec<_> = executor
        .fetcher()
        .calls
        .borrow()
        .iter()
        .skip(5)
        .copied()
        .collect();
    assert_eq!(
        retried,
        vec![("b", Duration::from_secs(35)), ("d", Duration::from_secs(35))]
    );
}

#[test]
fn retrying_batch_absorbs_transient_units_directly() {
    // Same remote as above, but the batch pass retries per unit.
    let remote = FakeRemote::new(&[("b", Behaviour::SlowFor(1)), ("d", Behaviour::SlowFor(1))]);
    let executor = executor(remote);

    let report = executor.execute_batch(
        units(&["a", "b", "c", "d", "e"]),
        &fast(RetryStrategy::Bounded(3)),
    );

    assert!(report.failures.is_empty());
    assert_eq!(
        report.results,
        vec!["payload-a", "payload-b", "payload-c", "payload-d", "payload-e"]
    );
}

#[test]
fn reprocessing_nothing_makes_no_calls() {
    let executor = executor(FakeRemote::new(&[]));

    let report = executor.reprocess(Default::default(), &fast(RetryStrategy::Unbounded));

    assert!(report.results.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(executor.fetcher().total_calls(), 0);
}

#[test]
fn bounded_reprocessing_leaves_a_residue_for_later_stages() {
    let remote = FakeRemote::new(&[
        ("b", Behaviour::SlowFor(6)),
        ("c", Behaviour::SlowFor(2)),
    ]);
    let executor = executor(remote);

    let first = executor.execute_batch(units(&["a", "b", "c"]), &fast(RetryStrategy::Bounded(1)));
    assert_eq!(first.failures.len(), 2);

    // Two single-attempt passes recover "c" but not "b".
    let report = executor.reprocess(first.failures, &fast(RetryStrategy::Bounded(2)));
    assert_eq!(report.results, vec!["payload-c"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(executor.fetcher().calls_for("b"), 3);

    let report = executor.reprocess(report.failures, &fast(RetryStrategy::Unbounded));
    assert!(report.failures.is_empty());
    assert_eq!(report.results, vec!["payload-b"]);
}

#[test]
fn run_reprocesses_only_when_configured() {
    let behaviour = [("b", Behaviour::SlowFor(1)), ("x", Behaviour::Rejects)];

    let executor_with = executor(FakeRemote::new(&behaviour));
    let config = BatchConfig {
        policy: fast(RetryStrategy::Bounded(1)),
        reprocess: Some(fast(RetryStrategy::Bounded(3))),
    };
    let report = executor_with.run(units(&["a", "b", "x"]), &config);
    assert_eq!(report.results, vec!["payload-a", "payload-b"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures.iter().next().unwrap().kind, FailureKind::Fatal);
    assert_eq!(executor_with.fetcher().calls_for("x"), 1);

    let executor_without = executor(FakeRemote::new(&behaviour));
    let report = executor_without.run(
        units(&["a", "b", "x"]),
        &config.clone().without_reprocess(),
    );
    assert_eq!(report.results, vec!["payload-a"]);
    assert_eq!(report.failures.len(), 2);
}

#[test]
fn each_reprocessing_pass_tries_every_pending_unit_once() {
    let remote = FakeRemote::new(&[
        ("a", Behaviour::AlwaysTimesOut),
        ("b", Behaviour::SlowFor(1)),
    ]);
    let executor = executor(remote);

    let first = executor.execute_batch(units(&["a", "b"]), &fast(RetryStrategy::Bounded(1)));
    assert_eq!(first.failures.len(), 2);

    let report = executor.reprocess(first.failures, &fast(RetryStrategy::Bounded(3)));

    assert_eq!(report.results, vec!["payload-b"]);
    assert_eq!(report.failures.len(), 1);
    let passes: Vec<_> = executor
        .fetcher()
        .calls
        .borrow()
        .iter()
        .skip(2)
        .copied()
        .collect();
    assert_eq!(
        passes,
        vec![
            ("a", Duration::from_secs(35)),
            ("b", Duration::from_secs(35)),
            ("a", Duration::from_secs(40)),
            ("a", Duration::from_secs(45)),
        ]
    );
}

#[test]
fn unbounded_reprocessing_does_not_starve_later_units() {
    let remote = FakeRemote::new(&[
        ("a", Behaviour::SlowFor(5)),
        ("b", Behaviour::SlowFor(1)),
    ]);
    let executor = executor(remote);

    let first = executor.execute_batch(units(&["a", "b"]), &fast(RetryStrategy::Bounded(1)));
    let report = executor.reprocess(first.failures, &fast(RetryStrategy::Unbounded));

    assert!(report.is_complete());
    assert_eq!(report.results, vec!["payload-b", "payload-a"]);
    // "b" is retried in the very first pass, right after "a".
    let keys: Vec<_> = executor.fetcher().calls.borrow().iter().map(|(k, _)| *k).collect();
    assert_eq!(keys[..4], ["a", "b", "a", "b"]);
    assert_eq!(executor.fetcher().calls_for("a"), 6);
}

#[test]
fn default_config_reaches_reprocessing() {
    let remote = FakeRemote::new(&[("b", Behaviour::SlowFor(1))]);
    let executor = executor(remote);

    let report = executor.run(units(&["a", "b"]), &BatchConfig::default());

    assert!(report.is_complete());
    assert_eq!(report.results, vec!["payload-a", "payload-b"]);
    let b_timeouts: Vec<_> = executor
        .fetcher()
        .calls
        .borrow()
        .iter()
        .filter(|(k, _)| *k == "b")
        .map(|(_, t)| *t)
        .collect();
    // Batch pass tries once, the reprocessing stage adds its larger increment.
    assert_eq!(
        b_timeouts,
        vec![Duration::from_secs(30), Duration::from_secs(40)]
    );
}
