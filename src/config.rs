// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};
use tracing::debug;

/// Env var naming the YAML config file.
pub const CONFIG_ENV: &str = "POSTSTRAT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "poststrat.yaml";

/// Runtime configuration. Every field has a default, so an absent or
/// partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the Parquet store.
    pub data_dir: PathBuf,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub census: CensusConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    pub base_url: String,
    pub dataset: String,
    pub api_key: Option<String>,
    /// Raw variables per request; the API caps a request at 50 fields
    /// including `NAME`.
    pub max_fields_per_request: usize,
    /// Pause between consecutive requests.
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Rows per Parquet file on insert.
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_filter: "info".to_string(),
            census: CensusConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.census.gov/data".to_string(),
            dataset: "acs/acs5".to_string(),
            api_key: None,
            max_fields_per_request: 49,
            request_delay_ms: 250,
            max_retries: 3,
            initial_backoff_ms: 500,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { batch_size: 5_000 }
    }
}

impl Config {
    /// Load from `$POSTSTRAT_CONFIG`, else `./poststrat.yaml` if present,
    /// else defaults; then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_path(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::from_path(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// `CENSUS_API_KEY` and `POSTSTRAT_DATA_DIR` win over the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("CENSUS_API_KEY") {
            if !key.trim().is_empty() {
                self.census.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(dir) = env::var("POSTSTRAT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
    }
}
