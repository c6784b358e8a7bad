use std::path::PathBuf;

use thiserror::Error;

use nbaflow_core::FetchError;

use crate::table::TableError;

/// Failures a collector cannot turn into a failure record.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Failures writing collected data to disk.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
