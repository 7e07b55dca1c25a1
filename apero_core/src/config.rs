//! Configuration file support for Apéro.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/apero/config.toml`.

use crate::engine::{ModelParams, MIN_PEAK_SEARCH_TAIL_HOURS};
use crate::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub drinks: DrinksConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// BAC model parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// g/L/h
    #[serde(default = "default_elimination_rate")]
    pub elimination_rate: f64,

    #[serde(default = "default_absorption_time_hours")]
    pub absorption_time_hours: f64,

    #[serde(default = "default_peak_search_step_minutes")]
    pub peak_search_step_minutes: u32,

    #[serde(default = "default_peak_search_tail_hours")]
    pub peak_search_tail_hours: u32,

    #[serde(default = "default_forecast_step_minutes")]
    pub forecast_step_minutes: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            elimination_rate: default_elimination_rate(),
            absorption_time_hours: default_absorption_time_hours(),
            peak_search_step_minutes: default_peak_search_step_minutes(),
            peak_search_tail_hours: default_peak_search_tail_hours(),
            forecast_step_minutes: default_forecast_step_minutes(),
        }
    }
}

impl ModelConfig {
    pub fn to_params(&self) -> ModelParams {
        ModelParams {
            elimination_rate: self.elimination_rate,
            absorption_time_hours: self.absorption_time_hours,
            peak_search_step: Duration::minutes(i64::from(self.peak_search_step_minutes)),
            peak_search_tail: Duration::hours(i64::from(self.peak_search_tail_hours)),
            forecast_step: Duration::minutes(i64::from(self.forecast_step_minutes)),
        }
    }
}

/// Forecast configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_hours: default_horizon_hours(),
        }
    }
}

/// Drink logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DrinksConfig {
    /// Drinks that ended longer ago than this no longer feed the estimate
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,

    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
}

impl Default for DrinksConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            default_duration_minutes: default_duration_minutes(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("apero")
}

fn default_elimination_rate() -> f64 {
    crate::engine::ELIMINATION_RATE
}

fn default_absorption_time_hours() -> f64 {
    crate::engine::ABSORPTION_TIME_HOURS
}

fn default_peak_search_step_minutes() -> u32 {
    1
}

fn default_peak_search_tail_hours() -> u32 {
    2
}

fn default_forecast_step_minutes() -> u32 {
    5
}

fn default_horizon_hours() -> f64 {
    6.0
}

fn default_retention_hours() -> u32 {
    24
}

fn default_duration_minutes() -> u32 {
    15
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("apero").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the model cannot work with
    pub fn validate(&self) -> Result<()> {
        let m = &self.model;
        if !(m.elimination_rate > 0.0) {
            return Err(Error::Config(format!(
                "model.elimination_rate must be positive, got {}",
                m.elimination_rate
            )));
        }
        if !(m.absorption_time_hours >= 0.0) {
            return Err(Error::Config(format!(
                "model.absorption_time_hours must not be negative, got {}",
                m.absorption_time_hours
            )));
        }
        if m.peak_search_step_minutes == 0 || m.forecast_step_minutes == 0 {
            return Err(Error::Config(
                "model step sizes must be at least one minute".into(),
            ));
        }
        if i64::from(m.peak_search_tail_hours) < MIN_PEAK_SEARCH_TAIL_HOURS {
            return Err(Error::Config(format!(
                "model.peak_search_tail_hours must be at least {}, got {}",
                MIN_PEAK_SEARCH_TAIL_HOURS, m.peak_search_tail_hours
            )));
        }
        if !(self.forecast.horizon_hours > 0.0) {
            return Err(Error::Config(format!(
                "forecast.horizon_hours must be positive, got {}",
                self.forecast.horizon_hours
            )));
        }
        if self.drinks.default_duration_minutes == 0 {
            return Err(Error::Config(
                "drinks.default_duration_minutes must be at least one minute".into(),
            ));
        }
        Ok(())
    }
}
