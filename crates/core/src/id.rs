//! Strongly-typed identifiers used by the statistics API.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Identifier of a player on the statistics site (`PERSON_ID`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u32);

impl PlayerId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for PlayerId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<PlayerId> for u32 {
    fn from(value: PlayerId) -> Self {
        value.0
    }
}

impl FromStr for PlayerId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .trim()
            .parse::<u32>()
            .map_err(|e| ParseError::InvalidId(format!("{s}: {e}")))?;
        Ok(Self(id))
    }
}
