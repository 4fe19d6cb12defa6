//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use steamline_core::{HttpConfig, RetryPolicy};
use steamline_steam::Mode;
use steamline_steam::api::{DEFAULT_APP_LIST_URL, DEFAULT_REVIEWS_URL};

/// Global configuration for steamline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub steam: SteamConfig,
    pub http: HttpSettings,
    pub clean: CleanConfig,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SteamConfig {
    pub reviews_url: String,
    pub app_list_url: String,
    pub page_size: u32,
    /// "cursor" or "offset"
    pub mode: String,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            reviews_url: DEFAULT_REVIEWS_URL.to_string(),
            app_list_url: DEFAULT_APP_LIST_URL.to_string(),
            page_size: steamline_steam::config::DEFAULT_PAGE_SIZE,
            mode: Mode::Cursor.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Seconds
    pub connect_timeout: u64,
    /// Seconds
    pub request_timeout: u64,
    pub initial_backoff_ms: u64,
    /// Seconds
    pub max_backoff: u64,
    pub max_jitter_ms: u64,
    /// Unset retries transient failures forever
    pub max_retries: Option<u32>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            connect_timeout: 30,
            request_timeout: 60,
            initial_backoff_ms: retry.initial_backoff.as_millis() as u64,
            max_backoff: retry.max_backoff.as_secs(),
            max_jitter_ms: retry.max_jitter.as_millis() as u64,
            max_retries: retry.max_retries,
        }
    }
}

/// Thresholds applied when cleaning reviews
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    pub min_row_fill: f64,
    pub max_column_missing: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        let opts = steamline_steam::CleanOptions::default();
        Self {
            min_row_fill: opts.min_row_fill,
            max_column_missing: opts.max_column_missing,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/steam.duckdb"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("./data/csv"),
        }
    }
}

/// Deserialize a path that may be an environment variable reference like ${VAR}
fn deserialize_env_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_env_var(&s)
        .map(PathBuf::from)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in '{s}' is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./steamline.toml (current directory)
    /// 2. ~/.config/steamline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("steamline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "steamline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn mode(&self) -> Result<Mode> {
        Mode::from_name(&self.steam.mode).with_context(|| {
            format!(
                "Invalid steam.mode '{}' (expected 'cursor' or 'offset')",
                self.steam.mode
            )
        })
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.http.connect_timeout),
            request_timeout: Duration::from_secs(self.http.request_timeout),
            ..Default::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.http.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.http.max_backoff),
            max_jitter: Duration::from_millis(self.http.max_jitter_ms),
            max_retries: self.http.max_retries,
        }
    }

    /// Settings for the review extractor
    pub fn steam_config(&self) -> Result<steamline_steam::Config> {
        Ok(steamline_steam::Config {
            reviews_url: self.steam.reviews_url.clone(),
            app_list_url: self.steam.app_list_url.clone(),
            page_size: self.steam.page_size,
            mode: self.mode()?,
            retry: self.retry_policy(),
        })
    }
}
