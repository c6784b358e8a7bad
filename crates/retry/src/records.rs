//! Failure bookkeeping and batch results.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nbaflow_core::FetchError;

use super::types::WorkUnit;

/// Success payloads accumulated across all passes of one run.
pub type ResultSet<T> = Vec<T>;

/// Why a unit ended up in the failure list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retry budget exhausted on timeouts
    Transient,
    /// Non-timeout error; terminal
    Fatal,
}

impl FailureKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, FailureKind::Transient)
    }
}

/// A unit that did not produce a payload, with what is known about its
/// last attempt.
#[derive(Debug, Clone)]
pub struct FailureRecord<P> {
    pub unit: WorkUnit<P>,
    pub kind: FailureKind,
    pub reason: FetchError,
    /// Attempts made in the pass that recorded this failure
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

impl<P> FailureRecord<P> {
    pub fn transient(unit: WorkUnit<P>, reason: FetchError, attempts: u32) -> Self {
        Self::new(unit, FailureKind::Transient, reason, attempts)
    }

    pub fn fatal(unit: WorkUnit<P>, reason: FetchError, attempts: u32) -> Self {
        Self::new(unit, FailureKind::Fatal, reason, attempts)
    }

    fn new(unit: WorkUnit<P>, kind: FailureKind, reason: FetchError, attempts: u32) -> Self {
        Self {
            unit,
            kind,
            reason,
            attempts,
            failed_at: Utc::now(),
        }
    }

    /// Timeout used by the last attempt.
    pub fn timeout(&self) -> Duration {
        self.unit.timeout()
    }

    pub fn params(&self) -> &P {
        self.unit.params()
    }

    pub fn into_unit(self) -> WorkUnit<P> {
        self.unit
    }
}

/// Failures in discovery order.
#[derive(Debug, Clone)]
pub struct FailureRecords<P> {
    records: Vec<FailureRecord<P>>,
}

impl<P> FailureRecords<P> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: FailureRecord<P>) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records a reprocessing pass would retry.
    pub fn retriable_len(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind.is_retriable())
            .count()
    }

    /// Split into (retriable, terminal), each keeping discovery order.
    pub fn split_retriable(self) -> (Self, Self) {
        let (retriable, terminal): (Vec<_>, Vec<_>) = self
            .records
            .into_iter()
            .partition(|r| r.kind.is_retriable());
        (Self { records: retriable }, Self { records: terminal })
    }

    /// Append `other`, keeping its order after ours.
    pub fn extend(&mut self, other: FailureRecords<P>) {
        self.records.extend(other.records);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailureRecord<P>> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<FailureRecord<P>> {
        self.records
    }
}

impl<P> Default for FailureRecords<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> IntoIterator for FailureRecords<P> {
    type Item = FailureRecord<P>;
    type IntoIter = std::vec::IntoIter<FailureRecord<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<P> FromIterator<FailureRecord<P>> for FailureRecords<P> {
    fn from_iter<I: IntoIterator<Item = FailureRecord<P>>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Everything a batch (or reprocessing stage) produced.
#[derive(Debug, Clone)]
pub struct BatchReport<P, T> {
    pub results: ResultSet<T>,
    pub failures: FailureRecords<P>,
    /// Units submitted
    pub total: usize,
}

impl<P, T> BatchReport<P, T> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            failures: FailureRecords::new(),
            total: 0,
        }
    }

    /// Percentage of submitted units that did not end up as a failure.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let succeeded = self.total.saturating_sub(self.failures.len());
        100.0 * succeeded as f64 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &'static str) -> WorkUnit<&'static str> {
        WorkUnit::new(name, Duration::from_secs(30))
    }

    fn timeout() -> FetchError {
        FetchError::timeout(Duration::from_secs(30))
    }

    #[test]
    fn split_keeps_discovery_order() {
        let mut records = FailureRecords::new();
        records.push(FailureRecord::transient(unit("a"), timeout(), 3));
        records.push(FailureRecord::fatal(unit("b"), FetchError::decode("x"), 1));
        records.push(FailureRecord::transient(unit("c"), timeout(), 3));

        assert_eq!(records.len(), 3);
        assert_eq!(records.retriable_len(), 2);

        let (retriable, terminal) = records.split_retriable();
        let names: Vec<_> = retriable.iter().map(|r| *r.params()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(terminal.len(), 1);
        assert_eq!(*terminal.iter().next().unwrap().params(), "b");
    }

    #[test]
    fn record_exposes_last_timeout() {
        let mut u = unit("a");
        u.escalate(Duration::from_secs(5));
        let record = FailureRecord::transient(u, timeout(), 2);
        assert_eq!(record.timeout(), Duration::from_secs(35));
        assert!(record.kind.is_retriable());
    }

    #[test]
    fn success_rate_counts_failures_against_total() {
        let mut report: BatchReport<&str, u8> = BatchReport::empty();
        assert_eq!(report.success_rate(), 100.0);

        report.total = 4;
        report.results = vec![1, 2, 3];
        report
            .failures
            .push(FailureRecord::transient(unit("d"), timeout(), 1));
        assert_eq!(report.success_rate(), 75.0);
        assert!(!report.is_complete());
    }
}
