//! YRFI - first-inning run prediction for MLB games
//!
//! This library provides:
//! - Box-score and market-odds loading with team-name canonicalization
//! - Leakage-free rolling team features for training
//! - All-history snapshot features and matchup assembly for a game date
//! - Logistic regression training and a base-rate fallback model
//! - Prediction grading, holdout metrics and market value comparison
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use yrfi::config::PipelineConfig;
//! use yrfi::features::MatchupScope;
//! use yrfi::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
//! let summary = pipeline.run(date, MatchupScope::TargetDate)?;
//! println!("Scored {} matchups for {}", summary.matchups, summary.resolved_date);
//! # Ok::<(), yrfi::error::PipelineError>(())
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod teams;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use data::{BoxScoreStore, MarketOddsTable};
pub use error::{PipelineError, Result};
pub use features::{FeatureVector, MatchupScope};
pub use models::{
    BoxScoreRecord, ConfidenceTier, GameKey, MarketOddsRecord, Matchup, Prediction, Role,
    TrainingRow,
};
pub use pipeline::Pipeline;
pub use predictor::{BaseRateModel, LogisticModel, LogisticRegressionTrainer, ProbabilityModel};
pub use teams::TeamRegistry;
