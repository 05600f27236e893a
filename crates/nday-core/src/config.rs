use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NdayError, Result};

/// Top-level configuration for nday.
///
/// Loaded from `~/.nday/config.toml` by default. Every section is optional
/// and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NdayConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub bury: BuryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl NdayConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NdayConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values that would make the engine misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.general.rollover_hour > 23 {
            return Err(NdayError::Config(format!(
                "general.rollover_hour must be 0-23, got {}",
                self.general.rollover_hour
            )));
        }
        if self.bury.max_days == 0 {
            return Err(NdayError::Config(
                "bury.max_days must be at least 1".to_string(),
            ));
        }
        if !SYNCHRONOUS_MODES.contains(&self.storage.synchronous.to_ascii_lowercase().as_str()) {
            return Err(NdayError::Config(format!(
                "storage.synchronous must be one of {:?}, got {:?}",
                SYNCHRONOUS_MODES, self.storage.synchronous
            )));
        }
        if self.storage.file_name.trim().is_empty() {
            return Err(NdayError::Config(
                "storage.file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// SQLite `synchronous` levels accepted by the store.
pub const SYNCHRONOUS_MODES: [&str; 3] = ["normal", "full", "extra"];

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root directory; each profile gets its own subdirectory.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Local hour at which a new day starts (matches the host scheduler's
    /// "next day starts at" setting).
    pub rollover_hour: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.nday/data".to_string(),
            log_level: "info".to_string(),
            rollover_hour: 4,
        }
    }
}

/// How range durations are spread over the selected cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    /// Map each card's relative stability into the range; cards without a
    /// signal get a uniform draw.
    #[default]
    Stability,
    /// Ignore stability and draw every card uniformly.
    Uniform,
}

/// Bury request handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuryConfig {
    /// Accept `0` / `0-N` as "no bury" instead of rejecting the input.
    pub allow_zero_duration: bool,
    /// Largest number of days a single bury may span.
    pub max_days: u32,
    /// Distribution used for range specs.
    pub distribution: DistributionMode,
}

impl Default for BuryConfig {
    fn default() -> Self {
        Self {
            allow_zero_duration: false,
            max_days: 36_500,
            distribution: DistributionMode::Stability,
        }
    }
}

/// Durable store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file name inside the profile directory.
    pub file_name: String,
    /// SQLite `synchronous` pragma: "normal", "full" or "extra".
    pub synchronous: String,
    /// How long a write waits for another process holding the file.
    pub busy_timeout_ms: u64,
    /// Run `PRAGMA quick_check` when the store is opened.
    pub check_integrity_on_open: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_name: "bury.db".to_string(),
            synchronous: "full".to_string(),
            busy_timeout_ms: 5_000,
            check_integrity_on_open: true,
        }
    }
}
