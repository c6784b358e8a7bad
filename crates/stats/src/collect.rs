//! Collection workflows driving the executor against the statistics API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use nbaflow_core::{FetchError, PlayerId, Season, SeasonType};
use nbaflow_retry::{
    BatchConfig, BatchReport, Fetch, FailureRecords, RequestExecutor, RetryPolicy, Sleeper,
    ThreadSleeper, WorkUnit,
};

use crate::error::CollectError;
use crate::requests::{
    Career, GameLogRequest, Headshot, HeadshotRequest, PlayerCareerRequest, PlayersRequest,
};
use crate::table::{RejectedTable, Table};

/// Column holding the player id in the players listing.
pub const PERSON_ID_COLUMN: &str = "person_id";

/// Column game logs are ordered by, newest first.
pub const GAME_DATE_COLUMN: &str = "game_date";

/// Policies used by a [`Collector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Initial timeout of every work unit
    pub timeout: Duration,
    /// Policy for single lookups (players listing, career span)
    pub single: RetryPolicy,
    /// Policies for multi-unit collections
    pub batch: BatchConfig,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            single: RetryPolicy::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// All games of one player across the requested season types.
#[derive(Debug, Clone)]
pub struct GameLogReport {
    pub player_id: PlayerId,
    pub table: Table,
    /// Season/type combinations that could not be fetched
    pub failures: FailureRecords<GameLogRequest>,
    /// Fetched seasons whose columns disagree with the rest
    pub rejected: Vec<RejectedTable>,
    pub total: usize,
    pub success_rate: f64,
}

impl GameLogReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }
}

/// Game logs of several players, one table for all of them.
#[derive(Debug, Default)]
pub struct GameLogsReport {
    pub table: Table,
    pub failures: FailureRecords<GameLogRequest>,
    pub rejected: Vec<RejectedTable>,
    /// Players whose career span could not be looked up
    pub lookup_failures: Vec<(PlayerId, CollectError)>,
    /// Players asked for
    pub players: usize,
}

impl GameLogsReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty() && self.lookup_failures.is_empty()
    }
}

pub struct Collector<F, S = ThreadSleeper> {
    executor: RequestExecutor<F, S>,
    config: CollectConfig,
}

impl<F> Collector<F> {
    pub fn new(fetcher: F, config: CollectConfig) -> Self {
        Self {
            executor: RequestExecutor::new(fetcher),
            config,
        }
    }
}

impl<F, S: Sleeper> Collector<F, S> {
    pub fn with_executor(executor: RequestExecutor<F, S>, config: CollectConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &RequestExecutor<F, S> {
        &self.executor
    }

    pub fn config(&self) -> &CollectConfig {
        &self.config
    }

    fn unit<P>(&self, params: P) -> WorkUnit<P> {
        WorkUnit::new(params, self.config.timeout)
    }

    /// Players listing, fetched as a single unit.
    pub fn collect_players(&self, request: PlayersRequest) -> Result<Table, CollectError>
    where
        F: Fetch<PlayersRequest, Output = Table>,
    {
        let mut unit = self.unit(request);
        let table = self
            .executor
            .execute_one(&mut unit, &self.config.single)
            .into_result()?;

        info!(
            active_only = request.active_only,
            season = %request.season,
            players = table.len(),
            "players collected"
        );
        Ok(table)
    }

    /// Every game of `player_id` over their whole career.
    ///
    /// The career span is looked up first as a single unit; its failure is
    /// the only error returned. Each season and season type then becomes
    /// one work unit of a batch run, and whatever is still missing after
    /// reprocessing is reported back in [`GameLogReport::failures`].
    pub fn collect_player_gamelog(
        &self,
        player_id: PlayerId,
        season_types: &[SeasonType],
    ) -> Result<GameLogReport, CollectError>
    where
        F: Fetch<PlayerCareerRequest, Output = Career> + Fetch<GameLogRequest, Output = Table>,
    {
        let mut lookup = self.unit(PlayerCareerRequest::new(player_id));
        let career = self
            .executor
            .execute_one(&mut lookup, &self.config.single)
            .into_result()?;

        let seasons = career.seasons();
        debug!(
            %player_id,
            from_year = career.from_year,
            to_year = career.to_year,
            seasons = seasons.len(),
            "collecting game logs"
        );

        let units: Vec<_> = seasons
            .iter()
            .flat_map(|&season| {
                season_types.iter().map(move |&season_type| GameLogRequest {
                    player_id,
                    season,
                    season_type,
                })
            })
            .map(|request| self.unit(request))
            .collect();

        let report = self.executor.run(units, &self.config.batch);
        let success_rate = report.success_rate();

        let (mut table, rejected) = Table::merge(report.results);
        for set_aside in &rejected {
            warn!(%player_id, reason = %set_aside.error, "game log season left out");
        }
        if table.column_index(GAME_DATE_COLUMN).is_ok() {
            table.sort_by_desc(GAME_DATE_COLUMN)?;
        }

        info!(
            %player_id,
            games = table.len(),
            pct_success = %format!("{success_rate:.1}%"),
            "game log collected"
        );

        Ok(GameLogReport {
            player_id,
            table,
            failures: report.failures,
            rejected,
            total: report.total,
            success_rate,
        })
    }

    /// Game logs of every player in `player_ids`, appended in order.
    ///
    /// A player whose career lookup fails is recorded and skipped.
    pub fn collect_gamelogs<I>(&self, player_ids: I, season_types: &[SeasonType]) -> GameLogsReport
    where
        F: Fetch<PlayerCareerRequest, Output = Career> + Fetch<GameLogRequest, Output = Table>,
        I: IntoIterator<Item = PlayerId>,
    {
        let mut out = GameLogsReport::default();
        let mut tables = Vec::new();
        for player_id in player_ids {
            out.players += 1;
            match self.collect_player_gamelog(player_id, season_types) {
                Ok(report) => {
                    tables.push(report.table);
                    out.failures.extend(report.failures);
                    out.rejected.extend(report.rejected);
                }
                Err(err) => {
                    error!(%player_id, reason = %err, "career lookup failed, skipping player");
                    out.lookup_failures.push((player_id, err));
                }
            }
        }

        let (table, rejected) = Table::merge(tables);
        out.table = table;
        out.rejected.extend(rejected);

        info!(
            players = out.players,
            games = out.table.len(),
            skipped = out.lookup_failures.len(),
            "game logs collected"
        );
        out
    }

    /// Game logs of every player active in `season`.
    ///
    /// Only a failed players listing is an error.
    pub fn collect_active_gamelogs(
        &self,
        season: Season,
        season_types: &[SeasonType],
    ) -> Result<GameLogsReport, CollectError>
    where
        F: Fetch<PlayersRequest, Output = Table>
            + Fetch<PlayerCareerRequest, Output = Career>
            + Fetch<GameLogRequest, Output = Table>,
    {
        let players = self.collect_players(PlayersRequest {
            active_only: true,
            season,
        })?;
        let ids = player_ids(&players)?;
        Ok(self.collect_gamelogs(ids, season_types))
    }

    /// Headshots of every player in `player_ids`, one unit each.
    pub fn collect_headshots<I>(&self, player_ids: I) -> BatchReport<HeadshotRequest, Headshot>
    where
        F: Fetch<HeadshotRequest, Output = Headshot>,
        I: IntoIterator<Item = PlayerId>,
    {
        let units: Vec<_> = player_ids
            .into_iter()
            .map(|id| self.unit(HeadshotRequest::new(id)))
            .collect();
        self.executor.run(units, &self.config.batch)
    }
}

/// Player ids listed in a players table.
pub fn player_ids(players: &Table) -> Result<Vec<PlayerId>, CollectError> {
    let idx = players.column_index(PERSON_ID_COLUMN)?;
    players
        .rows()
        .iter()
        .map(|row| match &row[idx] {
            Value::Number(n) => n
                .as_u64()
                .and_then(|id| u32::try_from(id).ok())
                .map(PlayerId::new)
                .ok_or_else(|| FetchError::decode(format!("invalid player id {n}"))),
            Value::String(s) => s
                .parse()
                .map_err(|_| FetchError::decode(format!("invalid player id {s}"))),
            other => Err(FetchError::decode(format!("invalid player id {other}"))),
        })
        .collect::<Result<Vec<_>, FetchError>>()
        .map_err(CollectError::from)
}
