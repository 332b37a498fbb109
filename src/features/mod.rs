//! Feature engineering
//!
//! Training rows use trailing-window stats per team and role (`rolling`);
//! pregame rows use all-history snapshots (`snapshot`) joined onto the
//! scheduled matchups (`matchup`). Both produce the same [`FeatureVector`].

pub mod matchup;
pub mod rolling;
pub mod snapshot;
pub mod window;

pub use matchup::{union_game_keys, MatchupAssembler, MatchupScope};
pub use rolling::{RollingFeatureBuilder, RollingStats};
pub use snapshot::{resolve_target_date, SnapshotFeatureBuilder, SnapshotTable, TargetDate};
pub use window::RollingWindow;

use serde::{Deserialize, Serialize};

pub const COL_AWAY_YRFI_RATE: &str = "Away_YRFI_Rate";
pub const COL_AWAY_AVG_1ST: &str = "Away_Avg_1st";
pub const COL_HOME_YRFI_RATE: &str = "Home_YRFI_Rate";
pub const COL_HOME_AVG_1ST: &str = "Home_Avg_1st";

/// Number of model inputs
pub const NUM_FEATURES: usize = 4;

/// Model input columns, in model order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    COL_AWAY_YRFI_RATE,
    COL_AWAY_AVG_1ST,
    COL_HOME_YRFI_RATE,
    COL_HOME_AVG_1ST,
];

/// Pregame inputs shared by training and inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub away_yrfi_rate: f64,
    pub away_avg_first_inning: f64,
    pub home_yrfi_rate: f64,
    pub home_avg_first_inning: f64,
}

impl FeatureVector {
    /// Order matches [`FEATURE_NAMES`]
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.away_yrfi_rate,
            self.away_avg_first_inning,
            self.home_yrfi_rate,
            self.home_avg_first_inning,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_order() {
        let features = FeatureVector {
            away_yrfi_rate: 0.4,
            away_avg_first_inning: 0.6,
            home_yrfi_rate: 0.5,
            home_avg_first_inning: 0.7,
        };
        assert_eq!(features.to_array(), [0.4, 0.6, 0.5, 0.7]);
        assert_eq!(FEATURE_NAMES[0], "Away_YRFI_Rate");
        assert_eq!(FEATURE_NAMES[3], "Home_Avg_1st");
        assert!(features.is_finite());
    }

    #[test]
    fn test_feature_vector_not_finite() {
        let features = FeatureVector {
            away_yrfi_rate: f64::NAN,
            away_avg_first_inning: 0.6,
            home_yrfi_rate: 0.5,
            home_avg_first_inning: 0.7,
        };
        assert!(!features.is_finite());
    }
}
