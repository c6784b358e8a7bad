//! Subcommand bodies.
//!
//! Units that could not be fetched are reported and logged but never turn
//! into an error exit; only configuration and sink problems do.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use tracing::{error, warn};

use nbaflow_core::{PlayerId, Season, SeasonType};
use nbaflow_retry::FailureRecords;
use nbaflow_stats::collect::player_ids;
use nbaflow_stats::sink::{write_csv, write_headshots, write_template_headshots};
use nbaflow_stats::{Collector, PlayersRequest, RejectedTable, StatsClient};

use crate::config::AppConfig;

pub fn collector(config: &AppConfig) -> anyhow::Result<Collector<StatsClient>> {
    let client = StatsClient::new(config.stats_config()).context("failed to build http client")?;
    Ok(Collector::new(client, config.collect_config()))
}

pub fn players(
    collector: &Collector<StatsClient>,
    active_only: bool,
    output: &Path,
) -> anyhow::Result<()> {
    let request = if active_only {
        PlayersRequest::active()
    } else {
        PlayersRequest::all()
    };

    let table = match collector.collect_players(request) {
        Ok(table) => table,
        Err(err) => {
            error!(reason = %err, "players listing failed");
            println!("players: listing failed ({err}), nothing written");
            return Ok(());
        }
    };

    let path = write_csv(&table, output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("players: {} rows written to {}", table.len(), path.display());
    Ok(())
}

pub fn gamelog(
    collector: &Collector<StatsClient>,
    player_id: PlayerId,
    season_types: &[SeasonType],
    output: &Path,
) -> anyhow::Result<()> {
    let report = match collector.collect_player_gamelog(player_id, season_types) {
        Ok(report) => report,
        Err(err) => {
            error!(%player_id, reason = %err, "game log collection failed");
            println!("gamelog {player_id}: collection failed ({err}), nothing written");
            return Ok(());
        }
    };

    if !report.table.is_empty() {
        write_csv(&report.table, output)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    println!(
        "gamelog {player_id}: {} games from {} of {} requests ({:.1}%) written to {}",
        report.table.len(),
        report.total.saturating_sub(report.failures.len()),
        report.total,
        report.success_rate,
        output.display()
    );
    print_failures("gamelog", &report.failures);
    print_rejected("gamelog", &report.rejected);
    Ok(())
}

pub fn active_gamelogs(
    collector: &Collector<StatsClient>,
    season_types: &[SeasonType],
    output: &Path,
) -> anyhow::Result<()> {
    let report = match collector.collect_active_gamelogs(Season::current(), season_types) {
        Ok(report) => report,
        Err(err) => {
            error!(reason = %err, "players listing failed");
            println!("gamelog: active players listing failed ({err}), nothing written");
            return Ok(());
        }
    };

    if !report.table.is_empty() {
        write_csv(&report.table, output)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    println!(
        "gamelog: {} games of {} active players written to {}",
        report.table.len(),
        report.players,
        output.display()
    );
    if !report.lookup_failures.is_empty() {
        println!(
            "gamelog: {} player(s) skipped, career lookup failed:",
            report.lookup_failures.len()
        );
        for (player_id, err) in &report.lookup_failures {
            println!("  {player_id}: {err}");
        }
    }
    print_failures("gamelog", &report.failures);
    print_rejected("gamelog", &report.rejected);
    Ok(())
}

pub fn headshots(
    collector: &Collector<StatsClient>,
    mut ids: Vec<PlayerId>,
    active: bool,
    dir: &Path,
    template: Option<&Path>,
) -> anyhow::Result<()> {
    if active {
        match collector.collect_players(PlayersRequest::active()) {
            Ok(table) => {
                ids = player_ids(&table).context("players listing has no usable ids")?;
            }
            Err(err) => {
                error!(reason = %err, "players listing failed");
                println!("headshots: active players listing failed ({err}), nothing written");
                return Ok(());
            }
        }
    }

    let report = collector.collect_headshots(ids);
    let written = write_headshots(dir, &report.results)
        .with_context(|| format!("failed to write headshots to {}", dir.display()))?;

    println!(
        "headshots: {} of {} images written to {} ({:.1}%)",
        written.len(),
        report.total,
        dir.display(),
        report.success_rate()
    );
    print_failures("headshots", &report.failures);

    if let Some(template) = template {
        if !report.failures.is_empty() {
            let missing: Vec<_> = report.failures.iter().map(|r| r.params().player_id).collect();
            let copies = write_template_headshots(dir, template, &missing)
                .with_context(|| format!("failed to copy template {}", template.display()))?;
            println!(
                "headshots: template {} used for {} player(s)",
                template.display(),
                copies.len()
            );
        }
    }
    Ok(())
}

fn print_failures<P: fmt::Debug>(label: &str, failures: &FailureRecords<P>) {
    if failures.is_empty() {
        return;
    }
    warn!(failed = failures.len(), "{label}: units left unfetched");
    println!("{label}: {} unit(s) could not be fetched:", failures.len());
    for record in failures.iter() {
        println!(
            "  {:?} after {} attempt(s): {}",
            record.params(),
            record.attempts,
            record.reason
        );
    }
}

fn print_rejected(label: &str, rejected: &[RejectedTable]) {
    if rejected.is_empty() {
        return;
    }
    warn!(rejected = rejected.len(), "{label}: tables left out of the output");
    println!("{label}: {} table(s) left out:", rejected.len());
    for set_aside in rejected {
        println!("  {} row(s): {}", set_aside.table.len(), set_aside.error);
    }
}
