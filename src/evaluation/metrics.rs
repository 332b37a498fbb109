//! Model Evaluation
//!
//! Holdout metrics for a trained model, and grading of saved predictions
//! against box-score outcomes (daily and cumulative accuracy, per-tier hit rate).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::BoxScoreStore;
use crate::error::{validate_fraction, PipelineError, Result};
use crate::models::{ConfidenceTier, Prediction, TrainingRow};

/// Probability clip for log loss
const EPS: f64 = 1e-15;

/// Binary classification metrics at the 0.5 threshold
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub rows: usize,
    pub positives: usize,
    pub base_rate: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    /// `None` when only one class is present
    pub roc_auc: Option<f64>,
    pub log_loss: f64,
    pub brier: f64,
}

pub fn classification_metrics(probs: &[f64], labels: &[bool]) -> ClassificationMetrics {
    let rows = probs.len().min(labels.len());
    if rows == 0 {
        return ClassificationMetrics::default();
    }
    let probs = &probs[..rows];
    let labels = &labels[..rows];

    let positives = labels.iter().filter(|&&y| y).count();
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut correct = 0usize;
    let mut log_loss = 0.0;
    let mut brier = 0.0;

    for (&p, &y) in probs.iter().zip(labels) {
        let predicted = p >= 0.5;
        if predicted == y {
            correct += 1;
        }
        if predicted && y {
            tp += 1;
        }
        if predicted && !y {
            fp += 1;
        }
        let target = if y { 1.0 } else { 0.0 };
        let clipped = p.clamp(EPS, 1.0 - EPS);
        log_loss -= target * clipped.ln() + (1.0 - target) * (1.0 - clipped).ln();
        brier += (p - target).powi(2);
    }

    let n = rows as f64;
    ClassificationMetrics {
        rows,
        positives,
        base_rate: positives as f64 / n,
        accuracy: correct as f64 / n,
        precision: if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        },
        recall: if positives > 0 {
            tp as f64 / positives as f64
        } else {
            0.0
        },
        roc_auc: roc_auc(probs, labels),
        log_loss: log_loss / n,
        brier: brier / n,
    }
}

/// ROC AUC as the Mann-Whitney rank statistic, ties sharing their average rank
pub fn roc_auc(probs: &[f64], labels: &[bool]) -> Option<f64> {
    let positives = labels.iter().filter(|&&y| y).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[a].total_cmp(&probs[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        // Ranks are 1-based
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] {
                rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Split date-sorted rows into (train, holdout) with the latest rows held out.
///
/// The boundary moves back to a date change so one day never lands in both sides.
pub fn chronological_split(
    rows: &[TrainingRow],
    holdout_fraction: f64,
) -> Result<(&[TrainingRow], &[TrainingRow])> {
    validate_fraction("Holdout fraction", holdout_fraction)?;

    let holdout = ((rows.len() as f64) * holdout_fraction).ceil() as usize;
    let mut split = rows.len().saturating_sub(holdout);
    while split > 0 && split < rows.len() && rows[split - 1].game_date == rows[split].game_date {
        split -= 1;
    }

    if split == 0 || split == rows.len() {
        return Err(PipelineError::Validation(format!(
            "Cannot hold out {:.0}% of {} rows spanning too few dates",
            holdout_fraction * 100.0,
            rows.len()
        )));
    }

    Ok(rows.split_at(split))
}

/// Outcome of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Correct,
    Incorrect,
    /// Game not in box-score history yet
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedPrediction {
    pub prediction: Prediction,
    pub outcome: Option<bool>,
    pub grade: Grade,
}

pub fn grade_predictions(predictions: &[Prediction], store: &BoxScoreStore) -> Vec<GradedPrediction> {
    predictions
        .iter()
        .map(|prediction| {
            let outcome = store.outcome(&prediction.key());
            let grade = match outcome {
                Some(yrfi) if yrfi == prediction.predicts_yrfi() => Grade::Correct,
                Some(_) => Grade::Incorrect,
                None => Grade::Pending,
            };
            GradedPrediction {
                prediction: prediction.clone(),
                outcome,
                grade,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub correct: usize,
    pub incorrect: usize,
    pub pending: usize,
}

impl AccuracySummary {
    pub fn from_graded<'a, I>(graded: I) -> Self
    where
        I: IntoIterator<Item = &'a GradedPrediction>,
    {
        let mut summary = Self::default();
        for g in graded {
            match g.grade {
                Grade::Correct => summary.correct += 1,
                Grade::Incorrect => summary.incorrect += 1,
                Grade::Pending => summary.pending += 1,
            }
        }
        summary
    }

    /// Predictions with a known outcome
    pub fn graded(&self) -> usize {
        self.correct + self.incorrect
    }

    /// `None` until at least one prediction is graded
    pub fn accuracy(&self) -> Option<f64> {
        match self.graded() {
            0 => None,
            n => Some(self.correct as f64 / n as f64),
        }
    }
}

/// Hit rate of graded predictions within one YRFI tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAnalysis {
    pub tier: ConfidenceTier,
    pub correct: usize,
    pub incorrect: usize,
    pub total: usize,
    pub accuracy: f64,
}

pub fn analyze_by_tier<'a, I>(graded: I) -> Vec<TierAnalysis>
where
    I: IntoIterator<Item = &'a GradedPrediction>,
{
    let mut grouped: BTreeMap<ConfidenceTier, (usize, usize)> = BTreeMap::new();
    for g in graded {
        let entry = grouped.entry(g.prediction.yrfi_tier()).or_default();
        match g.grade {
            Grade::Correct => entry.0 += 1,
            Grade::Incorrect => entry.1 += 1,
            Grade::Pending => {}
        }
    }

    grouped
        .into_iter()
        .rev()
        .filter(|(_, (correct, incorrect))| correct + incorrect > 0)
        .map(|(tier, (correct, incorrect))| {
            let total = correct + incorrect;
            TierAnalysis {
                tier,
                correct,
                incorrect,
                total,
                accuracy: correct as f64 / total as f64,
            }
        })
        .collect()
}

/// Dashboard view for one selected date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub date: NaiveDate,
    pub daily: AccuracySummary,
    /// Every prediction dated on or before `date`
    pub cumulative: AccuracySummary,
    /// Tier breakdown of the selected date
    pub daily_tiers: Vec<TierAnalysis>,
    /// Tier breakdown of the cumulative set
    pub tiers: Vec<TierAnalysis>,
}

impl AccuracyReport {
    /// Daily breakdown for a tier, if any prediction in it was graded that day
    pub fn daily_tier(&self, tier: ConfidenceTier) -> Option<&TierAnalysis> {
        self.daily_tiers.iter().find(|t| t.tier == tier)
    }
}

pub fn accuracy_report(graded: &[GradedPrediction], date: NaiveDate) -> AccuracyReport {
    let daily: Vec<&GradedPrediction> = graded
        .iter()
        .filter(|g| g.prediction.game_date == date)
        .collect();
    let cumulative: Vec<&GradedPrediction> = graded
        .iter()
        .filter(|g| g.prediction.game_date <= date)
        .collect();

    AccuracyReport {
        date,
        daily: AccuracySummary::from_graded(daily.iter().copied()),
        cumulative: AccuracySummary::from_graded(cumulative.iter().copied()),
        daily_tiers: analyze_by_tier(daily.iter().copied()),
        tiers: analyze_by_tier(cumulative.iter().copied()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::models::BoxScoreRecord;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap() + chrono::Duration::days(n)
    }

    fn prediction(d: i64, away: &str, home: &str, p: f64) -> Prediction {
        Prediction {
            game_date: day(d),
            away_team: away.to_string(),
            home_team: home.to_string(),
            total: None,
            yrfi_prob: p,
        }
    }

    fn row(d: i64) -> TrainingRow {
        TrainingRow {
            game_date: day(d),
            away_team: "Boston Red Sox".to_string(),
            home_team: "New York Yankees".to_string(),
            features: FeatureVector {
                away_yrfi_rate: 0.5,
                away_avg_first_inning: 0.5,
                home_yrfi_rate: 0.5,
                home_avg_first_inning: 0.5,
            },
            yrfi: d % 2 == 0,
        }
    }

    #[test]
    fn test_classification_metrics() {
        let probs = [0.9, 0.8, 0.3, 0.6, 0.2];
        let labels = [true, true, false, false, true];
        let m = classification_metrics(&probs, &labels);

        assert_eq!(m.rows, 5);
        assert_eq!(m.positives, 3);
        assert!((m.base_rate - 0.6).abs() < 1e-12);
        // Predicted: T T F T F -> correct on rows 0, 1, 2
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        let brier = (0.01 + 0.04 + 0.09 + 0.36 + 0.64) / 5.0;
        assert!((m.brier - brier).abs() < 1e-12);
        assert!(m.log_loss > 0.0);
    }

    #[test]
    fn test_classification_metrics_empty() {
        let m = classification_metrics(&[], &[]);
        assert_eq!(m.rows, 0);
        assert_eq!(m.roc_auc, None);
    }

    #[test]
    fn test_roc_auc() {
        // Perfect ranking
        assert!((roc_auc(&[0.1, 0.4, 0.6, 0.9], &[false, false, true, true]).unwrap() - 1.0).abs() < 1e-12);
        // Inverted ranking
        assert!(roc_auc(&[0.9, 0.6, 0.4, 0.1], &[false, false, true, true]).unwrap().abs() < 1e-12);
        // All tied
        assert!((roc_auc(&[0.5, 0.5, 0.5, 0.5], &[false, true, false, true]).unwrap() - 0.5).abs() < 1e-12);
        // One of four positive-negative pairs misordered
        assert!((roc_auc(&[0.1, 0.5, 0.4, 0.9], &[false, false, true, true]).unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(roc_auc(&[0.2, 0.8], &[true, true]), None);
    }

    #[test]
    fn test_chronological_split_holds_out_latest() {
        let rows: Vec<TrainingRow> = (0..10).map(row).collect();
        let (train, test) = chronological_split(&rows, 0.2).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert!(train.iter().all(|r| r.game_date < test[0].game_date));
    }

    #[test]
    fn test_chronological_split_respects_date_boundary() {
        // Days 0,1,2,3,3: a 20% holdout lands inside day 3, so the whole day moves out
        let rows: Vec<TrainingRow> = [0, 1, 2, 3, 3].into_iter().map(row).collect();
        let (train, test) = chronological_split(&rows, 0.2).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(test.len(), 2);

        let single_day: Vec<TrainingRow> = [4, 4, 4].into_iter().map(row).collect();
        assert!(chronological_split(&single_day, 0.2).is_err());
        assert!(chronological_split(&rows, 1.5).is_err());
    }

    #[test]
    fn test_grading_and_report() {
        let store = BoxScoreStore::from_records(vec![
            BoxScoreRecord::new(day(0), "Boston Red Sox", "New York Yankees", 1, 0),
            BoxScoreRecord::new(day(0), "Chicago Cubs", "Milwaukee Brewers", 0, 0),
            BoxScoreRecord::new(day(1), "Seattle Mariners", "Houston Astros", 0, 0),
        ]);
        let predictions = vec![
            prediction(0, "Boston Red Sox", "New York Yankees", 0.85),   // correct, tier 5
            prediction(0, "Chicago Cubs", "Milwaukee Brewers", 0.55),    // incorrect, tier 3
            prediction(1, "Seattle Mariners", "Houston Astros", 0.30),   // correct, tier 2
            prediction(1, "Texas Rangers", "Los Angeles Angels", 0.70),  // pending
        ];

        let graded = grade_predictions(&predictions, &store);
        assert_eq!(graded[0].grade, Grade::Correct);
        assert_eq!(graded[1].grade, Grade::Incorrect);
        assert_eq!(graded[2].grade, Grade::Correct);
        assert_eq!(graded[3].grade, Grade::Pending);
        assert_eq!(graded[3].outcome, None);

        let report = accuracy_report(&graded, day(0));
        assert_eq!(report.daily.correct, 1);
        assert_eq!(report.daily.incorrect, 1);
        assert_eq!(report.cumulative, report.daily);

        let report = accuracy_report(&graded, day(1));
        assert_eq!(report.daily.graded(), 1);
        assert_eq!(report.daily.pending, 1);
        assert_eq!(report.cumulative.correct, 2);
        assert_eq!(report.cumulative.graded(), 3);
        assert!((report.cumulative.accuracy().unwrap() - 2.0 / 3.0).abs() < 1e-12);

        let tiers: Vec<u8> = report.tiers.iter().map(|t| t.tier.level()).collect();
        assert_eq!(tiers, vec![5, 3, 2]);
        assert!((report.tiers[1].accuracy - 0.0).abs() < 1e-12);

        // Only the tier-2 game was graded on day 1; the tier-4 game is pending
        let daily: Vec<u8> = report.daily_tiers.iter().map(|t| t.tier.level()).collect();
        assert_eq!(daily, vec![2]);
        let two = report.daily_tier(ConfidenceTier::Two).unwrap();
        assert_eq!((two.correct, two.incorrect, two.total), (1, 0, 1));
        assert!(report.daily_tier(ConfidenceTier::Five).is_none());
        assert!(report.daily_tier(ConfidenceTier::Four).is_none());

        let report = accuracy_report(&graded, day(0));
        let daily: Vec<u8> = report.daily_tiers.iter().map(|t| t.tier.level()).collect();
        assert_eq!(daily, vec![5, 3]);
    }

    #[test]
    fn test_summary_without_graded_predictions() {
        let summary = AccuracySummary::default();
        assert_eq!(summary.accuracy(), None);
    }
}
