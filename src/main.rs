//! mediaproviders command line entry point
//!
//! Resolves a single asset against the fixture dataset or the remote catalog
//! and prints the resulting envelope as JSON.

use std::path::Path;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use mediaproviders::cli::{Args, Commands, split_list};
use mediaproviders::config::{Config, LoggingConfig};
use mediaproviders::error::MediaProviderError;
use mediaproviders::providers::{
    PlaybackContextType, Protocol, ProviderFactory, ProviderImplementation,
};

const DEFAULT_CONFIG_FILE: &str = "mediaproviders.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = setup_logging(args.verbose, &config.logging)?;

    match args.command {
        Commands::InitConfig { output } => {
            if output.exists() {
                bail!("Refusing to overwrite existing file: {}", output.display());
            }
            config.save_to_file(&output)?;
            info!("Wrote default configuration to {}", output.display());
        }
        Commands::Resolve {
            asset_id,
            backend,
            dataset,
            scope,
            formats,
            context,
            protocol,
        } => {
            if let Some(dataset) = dataset {
                config.fixture.dataset = dataset;
            }
            if scope.is_some() {
                config.fixture.scope = scope;
            }

            let implementation = ProviderImplementation::from(backend);
            info!("Resolving asset {} with {:?} backend", asset_id, implementation);

            let mut provider = ProviderFactory::create_provider(implementation, &config)?;
            let request = provider.config_mut();
            request.asset_id(asset_id);
            if let Some(formats) = formats {
                request.formats(split_list(&formats));
            }
            if let Some(context) = context {
                request.context_type(context.parse::<PlaybackContextType>()?);
            }
            if let Some(protocol) = protocol {
                request.protocol(protocol.parse::<Protocol>()?);
            }

            let envelope = provider.load().await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);

            envelope.into_result().map_err(MediaProviderError::from)?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool, logging: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&logging.directory)?;

    // Daily rotation
    let file_appender = rolling::daily(&logging.directory, &logging.file_name);
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr; stdout carries the JSON result
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
