//! Season selectors.
//!
//! The statistics API keys seasons as `YYYY-YY` strings (e.g. `2020-21`),
//! named after the calendar year the season tips off in.

use core::str::FromStr;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Month (1-based) in which a new season is considered started.
const SEASON_START_MONTH: u32 = 10;

/// One NBA season, identified by the year it starts in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Season {
    start_year: u16,
}

impl Season {
    /// Season tipping off in `year` (`starting(2020)` is `2020-21`).
    pub fn starting(year: u16) -> Self {
        Self { start_year: year }
    }

    /// Season in progress (or most recently finished) on `date`.
    pub fn on(date: NaiveDate) -> Self {
        let year = date.year() as u16;
        if date.month() >= SEASON_START_MONTH {
            Self::starting(year)
        } else {
            Self::starting(year.saturating_sub(1))
        }
    }

    pub fn current() -> Self {
        Self::on(Utc::now().date_naive())
    }

    pub fn start_year(&self) -> u16 {
        self.start_year
    }

    /// Every season starting in `from..=to`, oldest first.
    ///
    /// Career bounds come straight from the player info endpoint, which
    /// reports the starting year of the first and last season played.
    pub fn career(from: u16, to: u16) -> Vec<Season> {
        (from..=to).map(Season::starting).collect()
    }
}

impl core::fmt::Display for Season {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let end = (u32::from(self.start_year) + 1) % 100;
        write!(f, "{}-{:02}", self.start_year, end)
    }
}

impl FromStr for Season {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidSeason(s.to_string());
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        if start.len() != 4 || end.len() != 2 {
            return Err(invalid());
        }
        let start: u16 = start.parse().map_err(|_| invalid())?;
        let end: u16 = end.parse().map_err(|_| invalid())?;
        if (start + 1) % 100 != end {
            return Err(invalid());
        }
        Ok(Self::starting(start))
    }
}

impl TryFrom<String> for Season {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Season> for String {
    fn from(value: Season) -> Self {
        value.to_string()
    }
}

/// Portion of a season a game log is requested for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonType {
    #[serde(rename = "Regular Season")]
    RegularSeason,
    #[serde(rename = "Playoffs")]
    Playoffs,
}

impl SeasonType {
    pub const ALL: [SeasonType; 2] = [SeasonType::RegularSeason, SeasonType::Playoffs];

    /// Value expected by the `SeasonType` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonType::RegularSeason => "Regular Season",
            SeasonType::Playoffs => "Playoffs",
        }
    }
}

impl core::fmt::Display for SeasonType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" | "regular season" | "regular_season" => Ok(SeasonType::RegularSeason),
            "playoffs" | "playoff" => Ok(SeasonType::Playoffs),
            other => Err(ParseError::InvalidSeasonType(other.to_string())),
        }
    }
}
