//! Validates the configuration files without starting the engine.
//!
//! Parses `app.yaml`, loads and validates every receiver definition and
//! builds the live receiver registry, so a broken configuration is caught
//! before a deployment rollout rather than at the first notification.

use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use crate::{
    config::AppConfig,
    http_client::HttpClientPool,
    loader::load_config,
    models::receiver::{ReceiverConfig, ReceiverConfigError},
    receivers::{ReceiverRegistry, error::ReceiverError},
};

/// Errors surfaced by the `check-config` subcommand.
#[derive(Error, Debug)]
pub enum Error {
    /// The application configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    /// A receiver definition failed to load or validate.
    #[error("Receiver configuration error: {0}")]
    ReceiverConfig(#[from] ReceiverConfigError),
    /// The receiver registry could not be built.
    #[error("Receiver error: {0}")]
    Receiver(#[from] ReceiverError),
}

/// Arguments for the `check-config` subcommand.
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Path to the configuration directory. Defaults to `configs`.
    #[arg(short, long)]
    config_dir: Option<String>,
}

/// Loads and validates the full configuration, printing a summary on success.
pub async fn execute(args: CheckConfigArgs) -> Result<(), Error> {
    let config = AppConfig::new(args.config_dir.as_deref())?;
    let receiver_configs = load_config::<ReceiverConfig>(config.receivers_config_path.clone())?;

    // Building the registry catches what per-receiver validation cannot,
    // such as duplicate names.
    let client_pool = Arc::new(HttpClientPool::new());
    let registry = ReceiverRegistry::new(&receiver_configs, client_pool).await?;

    println!("Configuration OK");
    println!("  database_url: {}", config.database_url);
    if config.cluster.enabled {
        println!(
            "  cluster: enabled, this node is '{}' among {} configured peer(s)",
            config.cluster.peer_name,
            config.cluster.peers.len()
        );
    } else {
        println!("  cluster: disabled, running standalone");
    }
    let mut names = registry.receiver_names();
    names.sort();
    println!("  receivers ({}):", names.len());
    for name in names {
        println!("    - {name}");
    }

    Ok(())
}
