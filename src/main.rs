use std::sync::Arc;

use clap::{Parser, Subcommand};
use herald::{
    cmd::{CheckConfigArgs, check_config},
    config::AppConfig,
    persistence::SqliteStateRepository,
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the alerting supervisor.
    Run {
        /// Path to the configuration directory. Defaults to `configs`.
        #[arg(short, long)]
        config_dir: Option<String>,
    },
    /// Validates the application and receiver configuration files.
    CheckConfig(CheckConfigArgs),
}

#[tokio::main]
#[tracing::instrument(level = "info")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config_dir } => run_supervisor(config_dir.as_deref()).await?,
        Commands::CheckConfig(args) => check_config::execute(args).await?,
    }

    Ok(())
}

async fn run_supervisor(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    tracing::debug!(
        database_url = %config.database_url,
        cluster_enabled = config.cluster.enabled,
        "Configuration loaded."
    );

    tracing::debug!("Initializing state repository...");
    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;
    tracing::info!("Database migrations completed.");

    let supervisor = Supervisor::builder().config(config).state(repo).build().await?;

    tracing::info!("Supervisor initialized, starting alerting engine...");

    supervisor.run().await?;

    Ok(())
}
