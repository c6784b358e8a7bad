//! `nbaflow-core`: shared primitives for the collection pipeline.
//!
//! This crate contains no I/O. It defines the error taxonomy every fetch
//! reports through and the identifiers requests are keyed by.

pub mod error;
pub mod id;
pub mod season;

pub use error::{FetchError, FetchResult, ParseError};
pub use id::PlayerId;
pub use season::{Season, SeasonType};
