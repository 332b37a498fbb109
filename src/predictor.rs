use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{validate_probability, PipelineError, Result};
use crate::features::{FeatureVector, FEATURE_NAMES, NUM_FEATURES};
use crate::models::{Matchup, Prediction};

/// Anything that maps feature rows to YRFI probabilities
pub trait ProbabilityModel {
    fn name(&self) -> &str;

    /// One probability per row, in row order
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>>;
}

/// Fits a model from labelled feature rows
pub trait Trainer {
    type Model: ProbabilityModel;

    fn fit(&self, features: &[FeatureVector], labels: &[bool]) -> Result<Self::Model>;
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn check_finite(features: &[FeatureVector]) -> Result<()> {
    match features.iter().position(|f| !f.is_finite()) {
        Some(row) => Err(PipelineError::Validation(format!(
            "Non-finite feature value in row {}",
            row + 1
        ))),
        None => Ok(()),
    }
}

/// Logistic regression over standardized inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    pub means: [f64; NUM_FEATURES],
    pub scales: [f64; NUM_FEATURES],
    pub weights: [f64; NUM_FEATURES],
    pub bias: f64,
    pub trained_rows: usize,
    pub trained_at: DateTime<Utc>,
}

impl LogisticModel {
    fn logit(&self, features: &FeatureVector) -> f64 {
        let x = features.to_array();
        let mut z = self.bias;
        for i in 0..NUM_FEATURES {
            z += self.weights[i] * (x[i] - self.means[i]) / self.scales[i];
        }
        z
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved model to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let model: LogisticModel = serde_json::from_str(&content)?;

        if model.feature_names != FEATURE_NAMES {
            return Err(PipelineError::Model(format!(
                "Model at {} expects features {:?}, pipeline provides {:?}",
                path.display(),
                model.feature_names,
                FEATURE_NAMES
            )));
        }
        if model.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(PipelineError::Model(format!(
                "Model at {} has invalid feature scales",
                path.display()
            )));
        }

        info!(
            "Loaded model from {} (trained on {} rows at {})",
            path.display(),
            model.trained_rows,
            model.trained_at
        );
        Ok(model)
    }
}

impl ProbabilityModel for LogisticModel {
    fn name(&self) -> &str {
        "logistic-regression"
    }

    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        check_finite(features)?;
        Ok(features
            .iter()
            .map(|f| sigmoid(self.logit(f)).clamp(0.0, 1.0))
            .collect())
    }
}

/// Batch gradient descent with L2 penalty
#[derive(Debug, Clone)]
pub struct LogisticRegressionTrainer {
    learning_rate: f64,
    epochs: usize,
    l2: f64,
}

impl Default for LogisticRegressionTrainer {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 2000,
            l2: 1e-3,
        }
    }
}

impl LogisticRegressionTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }
}

impl Trainer for LogisticRegressionTrainer {
    type Model = LogisticModel;

    fn fit(&self, features: &[FeatureVector], labels: &[bool]) -> Result<LogisticModel> {
        if features.len() != labels.len() {
            return Err(PipelineError::Model(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if features.is_empty() {
            return Err(PipelineError::Model("No training rows".to_string()));
        }
        check_finite(features)?;

        let positives = labels.iter().filter(|&&y| y).count();
        if positives == 0 || positives == labels.len() {
            return Err(PipelineError::Model(
                "Training labels contain a single class".to_string(),
            ));
        }

        let n = features.len() as f64;
        let rows: Vec<[f64; NUM_FEATURES]> = features.iter().map(|f| f.to_array()).collect();

        let mut means = [0.0; NUM_FEATURES];
        for row in &rows {
            for i in 0..NUM_FEATURES {
                means[i] += row[i] / n;
            }
        }
        let mut scales = [0.0; NUM_FEATURES];
        for row in &rows {
            for i in 0..NUM_FEATURES {
                scales[i] += (row[i] - means[i]).powi(2) / n;
            }
        }
        for scale in scales.iter_mut() {
            *scale = scale.sqrt();
            // Constant column
            if *scale < 1e-12 {
                *scale = 1.0;
            }
        }

        let standardized: Vec<[f64; NUM_FEATURES]> = rows
            .iter()
            .map(|row| {
                let mut x = [0.0; NUM_FEATURES];
                for i in 0..NUM_FEATURES {
                    x[i] = (row[i] - means[i]) / scales[i];
                }
                x
            })
            .collect();

        let mut weights = [0.0; NUM_FEATURES];
        let mut bias = 0.0;

        for _ in 0..self.epochs {
            let mut grad_w = [0.0; NUM_FEATURES];
            let mut grad_b = 0.0;

            for (x, &y) in standardized.iter().zip(labels) {
                let z = bias + weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
                let err = sigmoid(z) - if y { 1.0 } else { 0.0 };
                for i in 0..NUM_FEATURES {
                    grad_w[i] += err * x[i];
                }
                grad_b += err;
            }

            for i in 0..NUM_FEATURES {
                weights[i] -= self.learning_rate * (grad_w[i] / n + self.l2 * weights[i]);
            }
            bias -= self.learning_rate * grad_b / n;
        }

        info!(
            "Trained logistic regression on {} rows ({} YRFI), weights {:?}, bias {:.4}",
            features.len(),
            positives,
            weights,
            bias
        );

        Ok(LogisticModel {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            means,
            scales,
            weights,
            bias,
            trained_rows: features.len(),
            trained_at: Utc::now(),
        })
    }
}

/// Fallback when no trained model is available: mean of both teams' YRFI rates
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseRateModel;

impl ProbabilityModel for BaseRateModel {
    fn name(&self) -> &str {
        "base-rate"
    }

    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        check_finite(features)?;
        Ok(features
            .iter()
            .map(|f| ((f.away_yrfi_rate + f.home_yrfi_rate) / 2.0).clamp(0.0, 1.0))
            .collect())
    }
}

/// Load the trained model, falling back to [`BaseRateModel`] when the file is missing
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Box<dyn ProbabilityModel>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Box::new(LogisticModel::load(path)?))
    } else {
        warn!(
            "Model not found at {}, using base-rate fallback",
            path.display()
        );
        Ok(Box::new(BaseRateModel))
    }
}

/// Score matchups; probabilities outside [0, 1] are rejected
pub fn predict_matchups(
    model: &dyn ProbabilityModel,
    matchups: &[Matchup],
) -> Result<Vec<Prediction>> {
    let features: Vec<FeatureVector> = matchups.iter().map(|m| m.features()).collect();
    let probs = model.predict_probability(&features)?;

    if probs.len() != matchups.len() {
        return Err(PipelineError::Model(format!(
            "{} returned {} probabilities for {} matchups",
            model.name(),
            probs.len(),
            matchups.len()
        )));
    }

    let predictions = matchups
        .iter()
        .zip(probs)
        .map(|(m, p)| {
            validate_probability(p)?;
            Ok(Prediction {
                game_date: m.game_date,
                away_team: m.away_team.clone(),
                home_team: m.home_team.clone(),
                total: m.total,
                yrfi_prob: p,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Scored {} matchups with {}", predictions.len(), model.name());
    Ok(predictions)
}
