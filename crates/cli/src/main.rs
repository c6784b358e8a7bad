//! nbaflow command line: collect players, game logs and headshots.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use nbaflow_core::{PlayerId, SeasonType};

mod commands;
mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "nbaflow")]
#[command(author, version, about = "Resilient collector for NBA statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: AppConfig,
}

#[derive(Subcommand)]
enum Commands {
    /// List players as a CSV file
    Players {
        /// Include retired players
        #[arg(long)]
        all: bool,

        /// Output file
        #[arg(short, long, default_value = "players.csv")]
        output: PathBuf,
    },

    /// Collect every game of a player's career
    Gamelog {
        /// Player to collect
        #[arg(long, required_unless_present = "active", conflicts_with = "active")]
        player_id: Option<PlayerId>,

        /// Collect every active player into one file
        #[arg(long)]
        active: bool,

        #[arg(long, value_enum, default_value_t = SeasonTypeArg::Both)]
        season_type: SeasonTypeArg,

        /// Output file (default: gamelog_<player_id>.csv or gamelog_active.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download official headshots
    Headshots {
        /// Players to fetch
        #[arg(
            long,
            num_args = 1..,
            required_unless_present = "active",
            conflicts_with = "active"
        )]
        player_id: Vec<PlayerId>,

        /// Fetch every active player
        #[arg(long)]
        active: bool,

        /// Target directory
        #[arg(short = 'd', long, default_value = "headshots")]
        dir: PathBuf,

        /// Image copied in place of headshots that could not be fetched
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SeasonTypeArg {
    Regular,
    Playoffs,
    Both,
}

impl SeasonTypeArg {
    fn season_types(self) -> Vec<SeasonType> {
        match self {
            SeasonTypeArg::Regular => vec![SeasonType::RegularSeason],
            SeasonTypeArg::Playoffs => vec![SeasonType::Playoffs],
            SeasonTypeArg::Both => SeasonType::ALL.to_vec(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    nbaflow_observability::init();

    let cli = Cli::parse();
    cli.config.validate()?;

    let collector = commands::collector(&cli.config)?;

    match cli.command {
        Commands::Players { all, output } => {
            commands::players(&collector, !all, &output)?;
        }
        Commands::Gamelog {
            player_id,
            active,
            season_type,
            output,
        } => {
            let season_types = season_type.season_types();
            match player_id {
                Some(player_id) => {
                    let output = output
                        .unwrap_or_else(|| PathBuf::from(format!("gamelog_{player_id}.csv")));
                    commands::gamelog(&collector, player_id, &season_types, &output)?;
                }
                None => {
                    let output = output.unwrap_or_else(|| PathBuf::from("gamelog_active.csv"));
                    commands::active_gamelogs(&collector, &season_types, &output)?;
                }
            }
        }
        Commands::Headshots {
            player_id,
            active,
            dir,
            template,
        } => {
            commands::headshots(&collector, player_id, active, &dir, template.as_deref())?;
        }
    }

    Ok(())
}
