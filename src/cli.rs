use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::providers::ProviderImplementation;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve one asset and print the media entry as JSON
    Resolve {
        /// Asset identifier
        #[arg(short, long)]
        asset_id: String,

        /// Backend to resolve against
        #[arg(short, long, value_enum, default_value = "fixture")]
        backend: Backend,

        /// Fixture dataset path (overrides the config file)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Fixture partition directory
        #[arg(long)]
        scope: Option<String>,

        /// Source formats to keep (comma-separated)
        #[arg(short, long)]
        formats: Option<String>,

        /// Playback context: playback, trailer, catchup, start-over, download
        #[arg(long)]
        context: Option<String>,

        /// Delivery protocol: http, https, all
        #[arg(long)]
        protocol: Option<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "mediaproviders.toml")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Fixture,
    #[value(alias = "phoenix")]
    Catalog,
}

impl From<Backend> for ProviderImplementation {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Fixture => ProviderImplementation::Fixture,
            Backend::Catalog => ProviderImplementation::Phoenix,
        }
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
