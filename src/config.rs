use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, MediaProviderError};
use crate::providers::Protocol;

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_version() -> String {
    "5.2.6".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub fixture: FixtureConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the OTT catalog API, e.g. https://api.example.com/api_v3/
    pub base_url: String,
    /// Partner (tenant) identifier
    pub partner_id: i64,
    /// Session token; empty means anonymous when `allow_anonymous` is set
    #[serde(default)]
    pub ks: String,
    /// API version sent with every multirequest
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional application referrer sent with the playback context request
    #[serde(default)]
    pub referrer: Option<String>,
    /// Protocol preference; unset means the scheme of `base_url`
    #[serde(default)]
    pub protocol: Option<Protocol>,
    /// Default source formats to keep (e.g. "Mobile_Main")
    #[serde(default)]
    pub formats: Vec<String>,
    /// Reject loads that do not request at least one format
    #[serde(default)]
    pub require_formats: bool,
    /// Log in anonymously when the session yields an empty token
    #[serde(default)]
    pub allow_anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Path to the JSON dataset of entries
    pub dataset: PathBuf,
    /// Optional partition directory, placed between the dataset directory and file name
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling log file
    pub directory: PathBuf,
    /// Log file name prefix
    pub file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                base_url: "https://api-preprod.ott.kaltura.com/v5_2_6/api_v3/".to_string(),
                partner_id: 0,
                ks: String::new(),
                api_version: default_api_version(),
                timeout_secs: default_timeout_secs(),
                referrer: None,
                protocol: None,
                formats: Vec::new(),
                require_formats: false,
                allow_anonymous: false,
            },
            fixture: FixtureConfig {
                dataset: PathBuf::from("fixtures/entries.playkit.json"),
                scope: None,
            },
            logging: LoggingConfig {
                directory: PathBuf::from(".mediaproviders/log"),
                file_name: "mediaproviders.log".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MediaProviderError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MediaProviderError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MediaProviderError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MediaProviderError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
