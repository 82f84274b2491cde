//! Configuration system for trendwatch
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/trendwatch/config.{TRENDWATCH_ENV}.json (or .toml)
//! 3. Default values
//!
//! Where TRENDWATCH_ENV can be: production (default), development, test
//!
//! # Examples
//!
//! ```no_run
//! use trendwatch::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! println!("Embedding model: {}", config.embedding.model);
//!
//! let config = AppConfig::load(Some("./trendwatch.toml".as_ref()))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - TRENDWATCH_TOP_TRENDS
//! - TRENDWATCH_MIN_CLUSTER_SIZE
//! - TRENDWATCH_SIMILARITY_THRESHOLD
//! - TRENDWATCH_DUPLICATE_THRESHOLD
//! - TRENDWATCH_EMBEDDING_MODEL
//! - TRENDWATCH_DISABLE_EMBEDDINGS
//! - TRENDWATCH_DB_PATH

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dedup::DedupParams;
use crate::embedding::DEFAULT_MODEL_NAME;
use crate::trends::TrendParams;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to parse config TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Failed to serialize config TOML: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Embedding model and vector cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name, e.g. "all-MiniLM-L6-v2"
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum cached vectors before the oldest half is evicted
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Characters of text hashed into the cache key
    #[serde(default = "default_fingerprint_chars")]
    pub fingerprint_chars: usize,

    /// Where model files are downloaded (fastembed's default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Set to false to run in keyword mode without loading a model
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_model() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_fingerprint_chars() -> usize {
    500
}

fn default_enabled() -> bool {
    true
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            cache_capacity: default_cache_capacity(),
            fingerprint_chars: default_fingerprint_chars(),
            cache_dir: None,
            enabled: default_enabled(),
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Embedding model name cannot be empty".to_string(),
            ));
        }

        if self.cache_capacity < 2 {
            return Err(ConfigError::ValidationError(format!(
                "cache_capacity must be at least 2, got {}",
                self.cache_capacity
            )));
        }

        if self.fingerprint_chars == 0 {
            return Err(ConfigError::ValidationError(
                "fingerprint_chars must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub trends: TrendParams,

    #[serde(default)]
    pub dedup: DedupParams,

    /// SQLite database file (defaults to the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from a JSON or TOML file, chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/trendwatch/config.{TRENDWATCH_ENV}.json|toml
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("TRENDWATCH_ENV").unwrap_or_else(|_| "production".to_string());

        if let Some(config_dir) = Self::config_dir() {
            for ext in ["json", "toml"] {
                let config_path = config_dir.join(format!("config.{}.{}", env, ext));
                if config_path.exists() {
                    tracing::info!("Loading config from: {:?}", config_path);
                    return Self::from_file(&config_path);
                }
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key/value source. Unparseable values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(top_n) = parse_var(&lookup, "TRENDWATCH_TOP_TRENDS") {
            self.trends.top_n = top_n;
        }

        if let Some(min_size) = parse_var(&lookup, "TRENDWATCH_MIN_CLUSTER_SIZE") {
            self.trends.min_cluster_size = min_size;
        }

        if let Some(threshold) = parse_var(&lookup, "TRENDWATCH_SIMILARITY_THRESHOLD") {
            self.trends.similarity_threshold = threshold;
        }

        if let Some(threshold) = parse_var(&lookup, "TRENDWATCH_DUPLICATE_THRESHOLD") {
            self.dedup.similarity_threshold = threshold;
        }

        if let Some(model) = lookup("TRENDWATCH_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(disable) = lookup("TRENDWATCH_DISABLE_EMBEDDINGS") {
            self.embedding.enabled = !(disable.eq_ignore_ascii_case("true")
                || disable == "1"
                || disable.eq_ignore_ascii_case("yes"));
        }

        if let Some(path) = lookup("TRENDWATCH_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;

        check_unit("trends.similarity_threshold", self.trends.similarity_threshold)?;
        check_unit(
            "trends.keyword_similarity_threshold",
            self.trends.keyword_similarity_threshold,
        )?;
        check_unit("dedup.similarity_threshold", self.dedup.similarity_threshold)?;

        if self.trends.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "trends.top_n must be greater than 0".to_string(),
            ));
        }

        if self.trends.min_cluster_size == 0 {
            return Err(ConfigError::ValidationError(
                "trends.min_cluster_size must be greater than 0".to_string(),
            ));
        }

        if self.dedup.window_hours == 0 {
            return Err(ConfigError::ValidationError(
                "dedup.window_hours must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("trendwatch"))
    }

    /// Configured database path, or `<data_dir>/trendwatch/trendwatch.db`
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("trendwatch")
                .join("trendwatch.db")
        })
    }

    /// Save configuration to file, as TOML or JSON by extension
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}: cannot parse {:?}", key, raw);
            None
        }
    }
}

fn check_unit(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, value
        )))
    }
}
