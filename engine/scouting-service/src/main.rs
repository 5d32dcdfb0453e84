//! Scouting Admin CLI
//!
//! Runs the derived-value calculators and manages the scraping job. Every
//! command prints its result as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use scouting_service::{
    initialize_logging_with_config, load_configuration, CalculationTarget, ScoutingService,
};
use scouting_store::{InMemoryStore, JobStore, PgStore, ScoutingStore, StoreBackendKind, ValueDimension};

#[derive(Parser)]
#[command(name = "scouting-admin")]
#[command(about = "Admin CLI for the scouting platform - derived values and scraping jobs")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute derived values over whole tables
    Calculate {
        #[arg(value_enum)]
        target: CalculationTarget,

        /// Rows per page (defaults to the configured batch size)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Show how many rows carry a dimension's derived values
    Coverage {
        /// age, nationality, team or competition
        dimension: ValueDimension,
    },

    /// Recompute the derived values of a single player
    Player {
        #[arg(value_enum)]
        kind: PlayerValueKind,

        /// Player id
        id: String,
    },

    /// Manage the scraping job
    Job {
        #[command(subcommand)]
        action: JobCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PlayerValueKind {
    Age,
    Nationality,
}

#[derive(Subcommand)]
enum JobCommand {
    /// Create a pending job
    Create {
        /// Players to scrape
        #[arg(long)]
        total: i64,

        /// Players per batch
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// Start a pending job
    Start { id: Uuid },
    /// Pause the active job
    Pause,
    /// Resume the paused job
    Resume,
    /// Cancel the active job
    Cancel,
    /// Progress of the latest job
    Status,
    /// Recent jobs, newest first
    History {
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = load_configuration(cli.config.as_deref())?;
    initialize_logging_with_config(&config.logging)?;

    info!("Starting scouting-admin v{}", env!("CARGO_PKG_VERSION"));

    match config.database.backend {
        StoreBackendKind::Postgres => {
            let store = PgStore::connect(&config.database)
                .await
                .context("Failed to connect to database")?;
            let service = ScoutingService::new(config, Arc::new(store))?;
            execute(&service, cli.command).await
        }
        StoreBackendKind::Memory => {
            warn!("Using the in-memory backend: nothing is persisted");
            let service = ScoutingService::new(config, Arc::new(InMemoryStore::new()))?;
            execute(&service, cli.command).await
        }
    }
}

async fn execute<S>(service: &ScoutingService<S>, command: Commands) -> Result<()>
where
    S: ScoutingStore + JobStore + 'static,
{
    match command {
        Commands::Calculate { target, batch_size } => {
            print_json(&service.run_calculation(target, batch_size).await?)
        }
        Commands::Coverage { dimension } => print_json(&service.engine().coverage(dimension).await?),
        Commands::Player { kind, id } => match kind {
            PlayerValueKind::Age => {
                print_json(&service.engine().update_player_age_values(&id).await?)
            }
            PlayerValueKind::Nationality => {
                print_json(&service.engine().update_player_nationality_values(&id).await?)
            }
        },
        Commands::Job { action } => execute_job(service, action).await,
    }
}

async fn execute_job<S>(service: &ScoutingService<S>, action: JobCommand) -> Result<()>
where
    S: ScoutingStore + JobStore + 'static,
{
    let jobs = service.jobs();
    match action {
        JobCommand::Create { total, batch_size } => {
            let batch_size = batch_size.unwrap_or(service.config().jobs.batch_size);
            print_json(&jobs.create_job(total, batch_size).await?)
        }
        JobCommand::Start { id } => print_json(&jobs.start(id).await?),
        JobCommand::Pause => print_json(&jobs.pause().await?),
        JobCommand::Resume => print_json(&jobs.resume().await?),
        JobCommand::Cancel => print_json(&jobs.cancel().await?),
        JobCommand::Status => print_json(&jobs.status().await?),
        JobCommand::History { limit } => {
            let limit = limit.unwrap_or(service.config().jobs.history_limit);
            print_json(&jobs.history(limit).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
