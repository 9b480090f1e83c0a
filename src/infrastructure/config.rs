//! Configuration management

use crate::error::{Result, TaxonError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_DIR: &str = ".taxon";
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable holding a tracing filter; overrides `logging.level`
pub const LOG_ENV: &str = "TAXON_LOG";

/// Keys accepted by [`Config::get`] and [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "store.database",
    "store.busy_timeout_ms",
    "registry.fuzzy_threshold",
    "review.auto_approve_threshold",
    "review.auto_reviewer",
    "logging.level",
    "created",
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file, relative to the `.taxon` directory unless absolute
    pub database: String,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database: "taxonomy.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Minimum similarity for opt-in fuzzy matching
    pub fuzzy_threshold: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            fuzzy_threshold: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Submissions at or above this confidence that match an existing tag are
    /// approved on the spot
    pub auto_approve_threshold: f64,
    /// Reviewer name recorded on automatic approvals
    pub auto_reviewer: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        ReviewConfig {
            auto_approve_threshold: 0.9,
            auto_reviewer: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when TAXON_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Config {
            store: StoreConfig::default(),
            registry: RegistryConfig::default(),
            review: ReviewConfig::default(),
            logging: LoggingConfig::default(),
            created: Utc::now(),
        }
    }

    /// Load config from .taxon/config.toml in the given directory
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);

        let contents = fs::read_to_string(&config_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TaxonError::NotTaxonDirectory(path.to_path_buf())
            } else {
                TaxonError::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| TaxonError::Config(format!("Failed to parse config.toml: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to .taxon/config.toml in the given directory
    pub fn save_to_dir(&self, path: &Path) -> Result<()> {
        let taxon_dir = path.join(CONFIG_DIR);
        let config_path = taxon_dir.join(CONFIG_FILE);

        if !taxon_dir.exists() {
            fs::create_dir(&taxon_dir)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| TaxonError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        check_threshold("registry.fuzzy_threshold", self.registry.fuzzy_threshold)?;
        check_threshold(
            "review.auto_approve_threshold",
            self.review.auto_approve_threshold,
        )?;
        if self.store.database.trim().is_empty() {
            return Err(TaxonError::Config(
                "store.database cannot be empty".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(TaxonError::Config(format!(
                "Invalid logging.level: '{}'. Valid levels: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Read a single value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "store.database" => Ok(self.store.database.clone()),
            "store.busy_timeout_ms" => Ok(self.store.busy_timeout_ms.to_string()),
            "registry.fuzzy_threshold" => Ok(self.registry.fuzzy_threshold.to_string()),
            "review.auto_approve_threshold" => Ok(self.review.auto_approve_threshold.to_string()),
            "review.auto_reviewer" => Ok(self.review.auto_reviewer.clone()),
            "logging.level" => Ok(self.logging.level.clone()),
            "created" => Ok(self.created.to_rfc3339()),
            _ => Err(unknown_key(key)),
        }
    }

    /// Set a single value by dotted key, rejecting out-of-range values
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key {
            "store.database" => updated.store.database = value.to_string(),
            "store.busy_timeout_ms" => {
                updated.store.busy_timeout_ms = value.parse().map_err(|_| {
                    TaxonError::Config(format!("Invalid store.busy_timeout_ms: '{}'", value))
                })?
            }
            "registry.fuzzy_threshold" => {
                updated.registry.fuzzy_threshold = parse_f64(key, value)?
            }
            "review.auto_approve_threshold" => {
                updated.review.auto_approve_threshold = parse_f64(key, value)?
            }
            "review.auto_reviewer" => updated.review.auto_reviewer = value.to_string(),
            "logging.level" => updated.logging.level = value.to_lowercase(),
            "created" => {
                return Err(TaxonError::Config(
                    "Cannot modify 'created' field (read-only)".to_string(),
                ))
            }
            _ => return Err(unknown_key(key)),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn unknown_key(key: &str) -> TaxonError {
    TaxonError::Config(format!(
        "Unknown config key: '{}'. Valid keys are: {}",
        key,
        CONFIG_KEYS.join(", ")
    ))
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| TaxonError::Config(format!("Invalid {}: '{}'", key, value)))
}

fn check_threshold(key: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TaxonError::Config(format!(
            "{} must be between 0 and 1, got {}",
            key, value
        )));
    }
    Ok(())
}
