//! Request types and their [`Fetch`] bindings on [`StatsClient`].
//!
//! Each request knows its endpoint and query; turning the raw payload into
//! a [`Table`] (or a smaller value) is kept in plain functions so it can be
//! tested without a network.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nbaflow_core::{FetchError, FetchResult, PlayerId, Season, SeasonType};
use nbaflow_retry::Fetch;

use crate::client::StatsClient;
use crate::table::Table;

const LEAGUE_ID: &str = "00";

/// Format the game log endpoint uses for `GAME_DATE`, e.g. `APR 10, 2022`.
const GAME_DATE_FORMAT: &str = "%b %d, %Y";

/// Every player known to the league, optionally only the active ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayersRequest {
    pub active_only: bool,
    /// Season the listing is requested for; active players are those whose
    /// last season is this one.
    pub season: Season,
}

impl PlayersRequest {
    pub fn active() -> Self {
        Self {
            active_only: true,
            season: Season::current(),
        }
    }

    pub fn all() -> Self {
        Self {
            active_only: false,
            season: Season::current(),
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("LeagueID", LEAGUE_ID.to_string()),
            ("Season", self.season.to_string()),
            ("IsOnlyCurrentSeason", "0".to_string()),
        ]
    }

    /// Shape a `commonallplayers` response.
    pub fn parse(&self, response: &Value) -> FetchResult<Table> {
        let mut table = Table::from_response(response, "CommonAllPlayers")?;
        table.lowercase_columns();

        if self.active_only {
            let season_year = self.season.start_year();
            table
                .retain_rows("to_year", |v| year_of(v) == Some(season_year))
                .map_err(|e| FetchError::decode(e.to_string()))?;
            // Players without a roster spot carry team id 0.
            if table.column_index("team_id").is_ok() {
                table
                    .retain_rows("team_id", |v| id_of(v).is_some_and(|id| id > 0))
                    .map_err(|e| FetchError::decode(e.to_string()))?;
            }
        }
        Ok(table)
    }
}

impl Fetch<PlayersRequest> for StatsClient {
    type Output = Table;

    fn fetch(&self, params: &PlayersRequest, timeout: Duration) -> FetchResult<Table> {
        let response = self.get_json("commonallplayers", &params.query(), timeout)?;
        params.parse(&response)
    }
}

/// First and last season a player appeared in, by starting year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Career {
    pub from_year: u16,
    pub to_year: u16,
}

impl Career {
    pub fn seasons(&self) -> Vec<Season> {
        Season::career(self.from_year, self.to_year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCareerRequest {
    pub player_id: PlayerId,
}

impl PlayerCareerRequest {
    pub fn new(player_id: PlayerId) -> Self {
        Self { player_id }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PlayerID", self.player_id.to_string()),
            ("LeagueID", LEAGUE_ID.to_string()),
        ]
    }

    /// Read the career span out of a `commonplayerinfo` response.
    pub fn parse(&self, response: &Value) -> FetchResult<Career> {
        let table = Table::from_response(response, "CommonPlayerInfo")?;
        if table.is_empty() {
            return Err(FetchError::decode(format!(
                "no player info for player {}",
                self.player_id
            )));
        }

        let year = |column: &str| {
            table
                .value(0, column)
                .and_then(year_of)
                .ok_or_else(|| FetchError::decode(format!("missing or invalid {column}")))
        };
        let career = Career {
            from_year: year("FROM_YEAR")?,
            to_year: year("TO_YEAR")?,
        };

        if career.from_year > career.to_year {
            return Err(FetchError::decode(format!(
                "career ends before it starts: {}..{}",
                career.from_year, career.to_year
            )));
        }
        Ok(career)
    }
}

impl Fetch<PlayerCareerRequest> for StatsClient {
    type Output = Career;

    fn fetch(&self, params: &PlayerCareerRequest, timeout: Duration) -> FetchResult<Career> {
        let response = self.get_json("commonplayerinfo", &params.query(), timeout)?;
        params.parse(&response)
    }
}

/// One player's games in one season and season type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLogRequest {
    pub player_id: PlayerId,
    pub season: Season,
    pub season_type: SeasonType,
}

impl GameLogRequest {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PlayerID", self.player_id.to_string()),
            ("Season", self.season.to_string()),
            ("SeasonType", self.season_type.as_str().to_string()),
            ("LeagueID", LEAGUE_ID.to_string()),
        ]
    }

    /// Shape a `playergamelog` response: tag every row with the season and
    /// season type, normalize game dates to ISO form, lower-case columns.
    pub fn parse(&self, response: &Value) -> FetchResult<Table> {
        let mut table = Table::from_response(response, "PlayerGameLog")?;
        table.push_constant_column("SEASON", Value::String(self.season.to_string()));
        table.push_constant_column("SEASON_TYPE", Value::String(self.season_type.to_string()));

        if table.column_index("GAME_DATE").is_ok() {
            table
                .map_column("GAME_DATE", normalize_game_date)
                .map_err(|e| FetchError::decode(e.to_string()))?;
        }

        table.lowercase_columns();
        Ok(table)
    }
}

impl Fetch<GameLogRequest> for StatsClient {
    type Output = Table;

    fn fetch(&self, params: &GameLogRequest, timeout: Duration) -> FetchResult<Table> {
        let response = self.get_json("playergamelog", &params.query(), timeout)?;
        params.parse(&response)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadshotRequest {
    pub player_id: PlayerId,
}

impl HeadshotRequest {
    pub fn new(player_id: PlayerId) -> Self {
        Self { player_id }
    }
}

/// Raw image bytes of a player's official headshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headshot {
    pub player_id: PlayerId,
    pub bytes: Vec<u8>,
}

impl Headshot {
    pub fn file_name(&self) -> String {
        format!("{}.png", self.player_id)
    }
}

impl Fetch<HeadshotRequest> for StatsClient {
    type Output = Headshot;

    fn fetch(&self, params: &HeadshotRequest, timeout: Duration) -> FetchResult<Headshot> {
        let url = self.config().headshot_url_for(params.player_id)?;
        let bytes = self.get_bytes(&url, timeout)?;
        if bytes.is_empty() {
            return Err(FetchError::decode(format!("empty image body from {url}")));
        }
        Ok(Headshot {
            player_id: params.player_id,
            bytes,
        })
    }
}

/// Years arrive either as numbers or as numeric strings.
fn year_of(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|y| u16::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `APR 10, 2022` becomes `2022-04-10`; anything unparseable is kept as is.
fn normalize_game_date(value: &Value) -> Value {
    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), GAME_DATE_FORMAT).ok())
        .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
        .unwrap_or_else(|| value.clone())
}
