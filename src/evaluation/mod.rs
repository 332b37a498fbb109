//! Model evaluation, prediction grading and market comparison

pub mod metrics;
pub mod value;

pub use metrics::{
    accuracy_report, analyze_by_tier, chronological_split, classification_metrics,
    grade_predictions, roc_auc, AccuracyReport, AccuracySummary, ClassificationMetrics, Grade,
    GradedPrediction, TierAnalysis,
};
pub use value::{find_value_bets, Side, ValueBet};
