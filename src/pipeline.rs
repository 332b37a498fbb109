//! End-to-end YRFI pipeline
//!
//! Each stage takes typed tables and returns typed tables; CSV and model files
//! are only touched by the `load_*`, `save_*` and [`Pipeline::run`] edges.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::data::{self, BoxScoreStore, MarketOddsTable};
use crate::error::Result;
use crate::evaluation::{
    accuracy_report, chronological_split, classification_metrics, find_value_bets,
    grade_predictions, AccuracyReport, ClassificationMetrics, ValueBet,
};
use crate::features::{
    resolve_target_date, MatchupAssembler, MatchupScope, RollingFeatureBuilder,
    SnapshotFeatureBuilder, TargetDate,
};
use crate::models::{Matchup, Prediction, TrainingRow};
use crate::predictor::{
    load_model, predict_matchups, LogisticModel, LogisticRegressionTrainer, ProbabilityModel,
    Trainer,
};
use crate::teams::TeamRegistry;

/// Scorable matchups for a resolved date
#[derive(Debug, Clone)]
pub struct InferenceTable {
    pub target: TargetDate,
    pub matchups: Vec<Matchup>,
}

/// Fitted model and how it scored on the held-out latest rows
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: LogisticModel,
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub holdout: ClassificationMetrics,
}

/// Counts from a full run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub box_scores: usize,
    pub odds_rows: usize,
    pub training_rows: usize,
    pub holdout: ClassificationMetrics,
    pub requested_date: NaiveDate,
    pub resolved_date: NaiveDate,
    pub matchups: usize,
    pub value_bets: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
    registry: TeamRegistry,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: TeamRegistry::mlb(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &TeamRegistry {
        &self.registry
    }

    pub fn load_box_scores(&self) -> Result<BoxScoreStore> {
        BoxScoreStore::load(self.config.box_scores_path(), &self.registry)
    }

    /// Missing odds file yields an empty table
    pub fn load_market_odds(&self) -> Result<MarketOddsTable> {
        MarketOddsTable::load_or_empty(
            self.config.market_odds_path(),
            &self.registry,
            self.config.strict_team_names,
        )
    }

    pub fn build_training_table(&self, store: &BoxScoreStore) -> Result<Vec<TrainingRow>> {
        RollingFeatureBuilder::from_config(&self.config)?.build_training_table(store.records())
    }

    pub fn build_inference_table(
        &self,
        store: &BoxScoreStore,
        odds: &MarketOddsTable,
        requested: NaiveDate,
        scope: MatchupScope,
    ) -> Result<InferenceTable> {
        let target = resolve_target_date(store, odds, requested)?;
        let snapshot = SnapshotFeatureBuilder::default().build(store.records(), target.resolved);
        let keys = scope.game_keys(store, odds, target.resolved);
        info!(
            "Scoring {} games for {} (scope: {})",
            keys.len(),
            target.resolved,
            scope
        );
        let matchups = MatchupAssembler::new(&snapshot).assemble(&keys, odds)?;
        Ok(InferenceTable { target, matchups })
    }

    /// Evaluate on a chronological holdout, then refit on every row
    pub fn train(&self, rows: &[TrainingRow]) -> Result<TrainingReport> {
        let trainer = LogisticRegressionTrainer::new();
        let (train, holdout) = chronological_split(rows, self.config.holdout_fraction)?;

        let (x_train, y_train) = split_xy(train);
        let (x_holdout, y_holdout) = split_xy(holdout);

        let model = trainer.fit(&x_train, &y_train)?;
        let probs = model.predict_probability(&x_holdout)?;
        let metrics = classification_metrics(&probs, &y_holdout);
        info!(
            "Holdout ({} rows): accuracy {:.3}, AUC {}, log loss {:.4}",
            metrics.rows,
            metrics.accuracy,
            metrics
                .roc_auc
                .map(|auc| format!("{:.3}", auc))
                .unwrap_or_else(|| "n/a".to_string()),
            metrics.log_loss
        );

        let (x_all, y_all) = split_xy(rows);
        let model = trainer.fit(&x_all, &y_all)?;

        Ok(TrainingReport {
            model,
            train_rows: train.len(),
            holdout_rows: holdout.len(),
            holdout: metrics,
        })
    }

    /// Model from the configured path, or the base-rate fallback
    pub fn load_model(&self) -> Result<Box<dyn ProbabilityModel>> {
        load_model(&self.config.model_path)
    }

    pub fn predict(
        &self,
        model: &dyn ProbabilityModel,
        matchups: &[Matchup],
    ) -> Result<Vec<Prediction>> {
        predict_matchups(model, matchups)
    }

    pub fn grade(
        &self,
        predictions: &[Prediction],
        store: &BoxScoreStore,
        date: NaiveDate,
    ) -> AccuracyReport {
        accuracy_report(&grade_predictions(predictions, store), date)
    }

    pub fn value_bets(&self, predictions: &[Prediction], odds: &MarketOddsTable) -> Vec<ValueBet> {
        find_value_bets(predictions, odds, self.config.min_ev)
    }

    /// Every stage from box scores to value bets, writing each stage file
    pub fn run(&self, requested: NaiveDate, scope: MatchupScope) -> Result<RunSummary> {
        let store = self.load_box_scores()?;
        let odds = self.load_market_odds()?;

        let rows = self.build_training_table(&store)?;
        data::write_training_table(self.config.training_path(), &rows)?;

        let report = self.train(&rows)?;
        report.model.save(&self.config.model_path)?;

        let inference = self.build_inference_table(&store, &odds, requested, scope)?;
        data::write_feature_table(self.config.features_path(), &inference.matchups)?;

        let predictions = self.predict(&report.model, &inference.matchups)?;
        data::write_predictions(
            self.config.predictions_path(),
            &inference.matchups,
            &predictions,
        )?;

        let bets = self.value_bets(&predictions, &odds);
        data::write_value_bets(self.config.value_bets_path(), &bets)?;

        Ok(RunSummary {
            box_scores: store.len(),
            odds_rows: odds.len(),
            training_rows: rows.len(),
            holdout: report.holdout,
            requested_date: inference.target.requested,
            resolved_date: inference.target.resolved,
            matchups: inference.matchups.len(),
            value_bets: bets.len(),
        })
    }
}

fn split_xy(rows: &[TrainingRow]) -> (Vec<crate::features::FeatureVector>, Vec<bool>) {
    rows.iter().map(|r| (r.features, r.yrfi)).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const TEAMS: [&str; 6] = [
        "Boston Red Sox",
        "New York Yankees",
        "Chicago Cubs",
        "Milwaukee Brewers",
        "Seattle Mariners",
        "Houston Astros",
    ];

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap() + chrono::Duration::days(n)
    }

    /// Forty days, three games a day, every team playing daily
    fn write_fixture(name: &str) -> PipelineConfig {
        let dir: PathBuf = std::env::temp_dir().join(format!("yrfi_pipeline_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let mut box_scores = String::from("Game Date,Away Team,Home Team,Away 1st,Home 1st,YRFI\n");
        for d in 0..40i64 {
            for g in 0..3usize {
                let away = TEAMS[(d as usize + g * 2) % 6];
                let home = TEAMS[(d as usize + g * 2 + 1) % 6];
                let away_runs = ((d as usize + g) % 3 == 0) as u32;
                let home_runs = ((d as usize * 7 + g) % 5 == 0) as u32;
                let yrfi = (away_runs + home_runs > 0) as u32;
                box_scores.push_str(&format!(
                    "{},{},{},{},{},{}\n",
                    day(d),
                    away,
                    home,
                    away_runs,
                    home_runs,
                    yrfi
                ));
            }
        }
        fs::write(dir.join(crate::config::BOX_SCORES_FILE), box_scores).unwrap();

        // Odds feed for day 40 uses short names
        let odds = "Game Date,Away Team,Home Team,Total,YRFI Odds,NRFI Odds\n\
                    2025-05-11,Red Sox ,Yankees,8.5,+120,-140\n\
                    2025-05-11,Cubs,Brewers,7.5,-105,-115\n\
                    2025-05-11,Mariners,Astros,,,\n";
        fs::write(dir.join(crate::config::MARKET_ODDS_FILE), odds).unwrap();

        PipelineConfig {
            model_path: dir.join("model.json"),
            data_dir: dir,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_run_writes_every_stage() {
        let config = write_fixture("run");
        let dir = config.data_dir.clone();
        let pipeline = Pipeline::new(config).unwrap();

        let summary = pipeline.run(day(40), MatchupScope::TargetDate).unwrap();
        assert_eq!(summary.box_scores, 120);
        assert_eq!(summary.odds_rows, 3);
        assert!(summary.training_rows > 0);
        assert_eq!(summary.resolved_date, day(40));
        assert_eq!(summary.matchups, 3);

        let config = pipeline.config();
        for path in [
            config.training_path(),
            config.features_path(),
            config.predictions_path(),
            config.value_bets_path(),
            config.model_path.clone(),
        ] {
            assert!(path.exists(), "missing {}", path.display());
        }

        let predictions = data::load_predictions(config.predictions_path()).unwrap();
        assert_eq!(predictions.len(), 3);
        assert!(predictions
            .windows(2)
            .all(|w| w[0].yrfi_prob >= w[1].yrfi_prob));
        let red_sox = predictions
            .iter()
            .find(|p| p.away_team == "Boston Red Sox")
            .unwrap();
        assert_eq!(red_sox.total, Some(8.5));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_inference_falls_back_to_latest_date() {
        let config = write_fixture("fallback");
        let dir = config.data_dir.clone();
        let pipeline = Pipeline::new(config).unwrap();

        let store = pipeline.load_box_scores().unwrap();
        let odds = pipeline.load_market_odds().unwrap();
        let table = pipeline
            .build_inference_table(&store, &odds, day(55), MatchupScope::TargetDate)
            .unwrap();
        fs::remove_dir_all(&dir).ok();

        assert!(table.target.fell_back());
        assert_eq!(table.target.resolved, day(40));
        assert_eq!(table.matchups.len(), 3);
    }

    #[test]
    fn test_training_rows_have_no_cold_start_gaps() {
        let config = write_fixture("training");
        let dir = config.data_dir.clone();
        let pipeline = Pipeline::new(config).unwrap();

        let store = pipeline.load_box_scores().unwrap();
        let rows = pipeline.build_training_table(&store).unwrap();
        let report = pipeline.train(&rows).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert!(rows.iter().all(|r| r.features.is_finite()));
        assert!(rows.windows(2).all(|w| w[0].game_date <= w[1].game_date));
        assert_eq!(report.train_rows + report.holdout_rows, rows.len());
        assert!(report.holdout_rows > 0);
        assert!((0.0..=1.0).contains(&report.holdout.accuracy));
    }

    #[test]
    fn test_grading_saved_predictions() {
        let config = write_fixture("grading");
        let dir = config.data_dir.clone();
        let pipeline = Pipeline::new(config).unwrap();
        let store = pipeline.load_box_scores().unwrap();
        fs::remove_dir_all(&dir).ok();

        let game = &store.records()[0];
        let predictions = vec![Prediction {
            game_date: game.game_date,
            away_team: game.away_team.clone(),
            home_team: game.home_team.clone(),
            total: None,
            yrfi_prob: if game.yrfi { 0.7 } else { 0.3 },
        }];
        let report = pipeline.grade(&predictions, &store, game.game_date);
        assert_eq!(report.daily.correct, 1);
        assert_eq!(report.daily.accuracy(), Some(1.0));
    }
}
