//! Fetch bindings for the public statistics API and headshot CDN.
//!
//! The retry executor only sees [`Fetch`](nbaflow_retry::Fetch)
//! implementations; this crate provides them for [`StatsClient`], plus the
//! tabular payload type, the collectors that drive the executor, and the
//! flat-file sinks results end up in.

pub mod client;
pub mod collect;
pub mod error;
pub mod requests;
pub mod sink;
pub mod table;

pub use client::{StatsClient, StatsConfig};
pub use collect::{CollectConfig, Collector, GameLogReport, GameLogsReport};
pub use error::{CollectError, SinkError};
pub use requests::{
    Career, GameLogRequest, Headshot, HeadshotRequest, PlayerCareerRequest, PlayersRequest,
};
pub use table::{RejectedTable, Table, TableError};
