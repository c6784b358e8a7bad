//! Resilient request execution with timeout escalation and reprocessing.
//!
//! ## Design
//!
//! - A unit of work is a set of request parameters plus its current timeout
//! - Timeout-class failures are retried with a linearly growing timeout
//! - Any other failure is fatal for the unit and never retried
//! - Batches never abort: failures are returned as data next to the results
//! - A second stage reprocesses only the retry-eligible failures
//!
//! ## Components
//!
//! - `RetryPolicy`: strategy, timeout increment, delay, warning cadence
//! - `WorkUnit`: parameters + timeout, the only mutable part being the timeout
//! - `AttemptOutcome`: tagged result of running one unit to completion
//! - `FailureRecords`: ordered failures pending reprocessing
//! - `RequestExecutor`: runs units against a `Fetch` implementation

pub mod executor;
pub mod records;
pub mod types;

pub use executor::{Fetch, NoopSleeper, RequestExecutor, Sleeper, ThreadSleeper};
pub use records::{BatchReport, FailureKind, FailureRecord, FailureRecords, ResultSet};
pub use types::{AttemptOutcome, BatchConfig, RetryPolicy, RetryStrategy, WorkUnit};
