//! Tracing and logging setup shared by every binary.

/// Initialize process-wide tracing/logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LOG_FORMAT_ENV, LogFormat, LogFormatError};
