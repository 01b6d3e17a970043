//! # Pad configuration
//!
//! TOML file with the tunables of the pad pipeline. A missing file is not an
//! error: every field has a default and the application runs on those.
//!
//! Default location is `<config dir>/padstate/padstate.toml`
//! (`~/.config/padstate/padstate.toml` on Linux).

use crate::controller::debounce::{
    ThresholdError, TriggerThresholds, DEFAULT_OFF_THRESHOLD, DEFAULT_ON_THRESHOLD,
};
use crate::controller::history::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "padstate";
const CONFIG_FILE: &str = "padstate.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid trigger thresholds: {0}")]
    Threshold(#[from] ThresholdError),

    #[error("Invalid config value: {0}")]
    Invalid(String),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Tunables for the history buffer, the trigger latch, the device collector
/// and the demo frame loop
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PadConfig {
    /// Number of snapshots kept in the history window
    pub history_capacity: usize,
    /// Trigger sample (0..255) above which L2/R2 turn on
    pub trigger_on_threshold: i32,
    /// Trigger sample (0..255) below which L2/R2 turn off
    pub trigger_off_threshold: i32,
    /// Stick deadzone as a fraction of full deflection
    pub stick_deadzone: f32,
    /// Sleep between device polls, in microseconds
    pub poll_interval_us: u64,
    /// Rate of the consumer frame loop
    pub frame_rate_hz: u32,
    /// Light bar colour sent when a pad is bound
    pub light_bar: (u8, u8, u8),
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            trigger_on_threshold: DEFAULT_ON_THRESHOLD,
            trigger_off_threshold: DEFAULT_OFF_THRESHOLD,
            stick_deadzone: 0.05,
            poll_interval_us: 100,
            frame_rate_hz: 60,
            light_bar: (0, 0, 255),
        }
    }
}

impl PadConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads from the platform config directory, writing the defaults there
    /// first if no file exists yet
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_or_create(&path)
    }

    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        Self::ensure_default(path)?;
        Self::load(path)
    }

    /// Loads and validates `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the current values to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Writes a default config to `path` unless one already exists
    pub fn ensure_default(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        Self::default().save(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.stick_deadzone) {
            return Err(ConfigError::Invalid(format!(
                "stick_deadzone {} must be in [0, 1)",
                self.stick_deadzone
            )));
        }
        if self.frame_rate_hz == 0 {
            return Err(ConfigError::Invalid("frame_rate_hz must be non-zero".into()));
        }
        self.thresholds()?;
        Ok(())
    }

    pub fn thresholds(&self) -> Result<TriggerThresholds, ConfigError> {
        Ok(TriggerThresholds::new(
            self.trigger_on_threshold,
            self.trigger_off_threshold,
        )?)
    }
}
