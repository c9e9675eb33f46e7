use serde::Deserialize;
use thiserror::Error;

use std::path::PathBuf;

use crate::analysis::AnalysisParams;
use crate::breakdown::BreakParams;
use crate::indicators::DEFAULT_ATR_WINDOW;
use crate::support::RansacParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to translate config file path into string")]
    FilePathIntoString,
    #[error("failed to initialize settings: {0}")]
    SettingsInit(String),
    #[error("failed to deserialize settings: {0}")]
    Deserialize(String),
}

/// Pipeline parameters, loadable from a config file. Every field has
/// the component's default, so a file only needs to name what it
/// overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// ATR lookback over the training window.
    #[serde(default = "default_atr_window")]
    pub atr_window: usize,

    /// Fraction of fractal points sampled per RANSAC trial.
    #[serde(default = "default_min_samples_ratio")]
    pub min_samples_ratio: f64,

    /// Absolute floor on the inlier count for a valid support.
    #[serde(default = "default_min_inliers")]
    pub min_inliers: usize,

    /// Minimum fraction of fractal points that must be inliers.
    #[serde(default = "default_min_inlier_ratio")]
    pub min_inlier_ratio: f64,

    /// Seed for the RANSAC sampling RNG.
    #[serde(default = "default_random_state")]
    pub random_state: u64,

    /// RANSAC trial budget.
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,

    /// Minimum fractional distance below the support (0.01 = 1%).
    #[serde(default = "default_penetration_threshold")]
    pub penetration_threshold: f64,

    /// Consecutive sessions required to confirm a break.
    #[serde(default = "default_confirmation_days")]
    pub confirmation_days: usize,
}

fn default_atr_window() -> usize {
    DEFAULT_ATR_WINDOW
}

fn default_min_samples_ratio() -> f64 {
    RansacParams::default().min_samples_ratio
}

fn default_min_inliers() -> usize {
    RansacParams::default().min_inliers
}

fn default_min_inlier_ratio() -> f64 {
    RansacParams::default().min_inlier_ratio
}

fn default_random_state() -> u64 {
    RansacParams::default().random_state
}

fn default_max_trials() -> usize {
    RansacParams::default().max_trials
}

fn default_penetration_threshold() -> f64 {
    BreakParams::default().penetration_threshold
}

fn default_confirmation_days() -> usize {
    BreakParams::default().confirmation_days
}

impl Default for Config {
    fn default() -> Self {
        Self {
            atr_window: default_atr_window(),
            min_samples_ratio: default_min_samples_ratio(),
            min_inliers: default_min_inliers(),
            min_inlier_ratio: default_min_inlier_ratio(),
            random_state: default_random_state(),
            max_trials: default_max_trials(),
            penetration_threshold: default_penetration_threshold(),
            confirmation_days: default_confirmation_days(),
        }
    }
}

impl Config {
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        let filename = path
            .into_os_string()
            .into_string()
            .map_err(|_| ConfigError::FilePathIntoString)?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(&filename))
            .build()
            .map_err(|err| ConfigError::SettingsInit(err.to_string()))?
            .try_deserialize()
            .map_err(|err| ConfigError::Deserialize(err.to_string()))?;
        Ok(config)
    }

    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            atr_window: self.atr_window,
            ransac: RansacParams {
                min_samples_ratio: self.min_samples_ratio,
                min_inliers: self.min_inliers,
                min_inlier_ratio: self.min_inlier_ratio,
                random_state: self.random_state,
                max_trials: self.max_trials,
            },
            breakout: BreakParams {
                penetration_threshold: self.penetration_threshold,
                confirmation_days: self.confirmation_days,
            },
        }
    }
}
