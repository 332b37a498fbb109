//! Pipeline configuration
//!
//! Values come from environment variables with defaults; the CLI overrides
//! individual fields from flags.

use std::path::PathBuf;

use crate::error::{validate_fraction, validate_window, PipelineError, Result};

/// Trailing window length for training-time rolling stats (games in role)
pub const WINDOW_SIZE: usize = 10;
/// Minimum prior games in role before a rolling stat is defined
pub const MIN_PERIODS: usize = 3;
/// Share of the latest training rows held out for evaluation
pub const HOLDOUT_FRACTION: f64 = 0.2;
/// Minimum expected value per unit for a value bet
pub const MIN_EV: f64 = 0.0;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MODEL_PATH: &str = "models/yrfi_pregame_model.json";

pub const BOX_SCORES_FILE: &str = "mlb_boxscores_cleaned.csv";
pub const MARKET_ODDS_FILE: &str = "yrfi_market_odds.csv";
pub const TRAINING_FILE: &str = "yrfi_training_pregame.csv";
pub const FEATURES_FILE: &str = "yrfi_pregame_features_today.csv";
pub const PREDICTIONS_FILE: &str = "yrfi_predictions_pregame.csv";
pub const VALUE_BETS_FILE: &str = "yrfi_value_bets.csv";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub window_size: usize,
    pub min_periods: usize,
    /// Reject market odds rows whose team names are not in the registry (YRFI_STRICT_TEAMS)
    pub strict_team_names: bool,
    pub holdout_fraction: f64,
    pub min_ev: f64,
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            window_size: WINDOW_SIZE,
            min_periods: MIN_PERIODS,
            strict_team_names: true,
            holdout_fraction: HOLDOUT_FRACTION,
            min_ev: MIN_EV,
            log_level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            data_dir: std::env::var("YRFI_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            model_path: std::env::var("YRFI_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            window_size: parse_env("YRFI_WINDOW_SIZE", defaults.window_size)?,
            min_periods: parse_env("YRFI_MIN_PERIODS", defaults.min_periods)?,
            strict_team_names: parse_env("YRFI_STRICT_TEAMS", defaults.strict_team_names)?,
            holdout_fraction: parse_env("YRFI_HOLDOUT", defaults.holdout_fraction)?,
            min_ev: parse_env("YRFI_MIN_EV", defaults.min_ev)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_window(self.window_size, self.min_periods)?;
        validate_fraction("Holdout fraction", self.holdout_fraction)?;
        if !self.min_ev.is_finite() {
            return Err(PipelineError::Config(format!(
                "Minimum EV must be finite, got {}",
                self.min_ev
            )));
        }
        Ok(())
    }

    pub fn box_scores_path(&self) -> PathBuf {
        self.data_dir.join(BOX_SCORES_FILE)
    }

    pub fn market_odds_path(&self) -> PathBuf {
        self.data_dir.join(MARKET_ODDS_FILE)
    }

    pub fn training_path(&self) -> PathBuf {
        self.data_dir.join(TRAINING_FILE)
    }

    pub fn features_path(&self) -> PathBuf {
        self.data_dir.join(FEATURES_FILE)
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.data_dir.join(PREDICTIONS_FILE)
    }

    pub fn value_bets_path(&self) -> PathBuf {
        self.data_dir.join(VALUE_BETS_FILE)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| PipelineError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
