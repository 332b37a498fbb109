use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::FeatureVector;

/// Natural key of a game: (date, away team, home team)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameKey {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
}

impl GameKey {
    pub fn new(game_date: NaiveDate, away_team: &str, home_team: &str) -> Self {
        Self {
            game_date,
            away_team: away_team.to_string(),
            home_team: home_team.to_string(),
        }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.game_date, self.away_team, self.home_team)
    }
}

/// Which side of the matchup a team played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Away,
    Home,
}

impl Role {
    /// Column prefix used in feature tables ("Away" / "Home")
    pub fn prefix(&self) -> &'static str {
        match self {
            Role::Away => "Away",
            Role::Home => "Home",
        }
    }
}

/// One played game as ingested from the box-score table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreRecord {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    pub away_first_inning_runs: u32,
    pub home_first_inning_runs: u32,
    pub yrfi: bool,
}

impl BoxScoreRecord {
    /// Build a record with the YRFI flag derived from the run counts
    pub fn new(
        game_date: NaiveDate,
        away_team: &str,
        home_team: &str,
        away_first_inning_runs: u32,
        home_first_inning_runs: u32,
    ) -> Self {
        Self {
            game_date,
            away_team: away_team.to_string(),
            home_team: home_team.to_string(),
            away_first_inning_runs,
            home_first_inning_runs,
            yrfi: away_first_inning_runs > 0 || home_first_inning_runs > 0,
        }
    }

    pub fn key(&self) -> GameKey {
        GameKey::new(self.game_date, &self.away_team, &self.home_team)
    }

    /// Team playing the given role
    pub fn team(&self, role: Role) -> &str {
        match role {
            Role::Away => &self.away_team,
            Role::Home => &self.home_team,
        }
    }

    /// First-inning runs scored by the team playing the given role
    pub fn runs_for(&self, role: Role) -> u32 {
        match role {
            Role::Away => self.away_first_inning_runs,
            Role::Home => self.home_first_inning_runs,
        }
    }
}

/// Market odds row for one game (any field may be absent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOddsRecord {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    pub total: Option<f64>,
    /// American odds
    pub yrfi_odds: Option<i32>,
    /// American odds
    pub nrfi_odds: Option<i32>,
}

impl MarketOddsRecord {
    pub fn key(&self) -> GameKey {
        GameKey::new(self.game_date, &self.away_team, &self.home_team)
    }
}

/// Trailing-window stat for a team in one role, as of a game date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRollingStat {
    pub team: String,
    pub role: Role,
    pub as_of_date: NaiveDate,
    pub avg_first_inning_runs: f64,
    pub yrfi_rate: f64,
    pub games_in_window: usize,
}

/// All-history stat for a team in one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshotStat {
    pub team: String,
    pub role: Role,
    pub avg_first_inning_runs: f64,
    pub yrfi_rate: f64,
    pub games: usize,
}

/// Scorable matchup with both team snapshots attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    pub away_yrfi_rate: f64,
    pub away_avg_first_inning: f64,
    pub home_yrfi_rate: f64,
    pub home_avg_first_inning: f64,
    /// Market total runs line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl Matchup {
    pub fn key(&self) -> GameKey {
        GameKey::new(self.game_date, &self.away_team, &self.home_team)
    }

    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            away_yrfi_rate: self.away_yrfi_rate,
            away_avg_first_inning: self.away_avg_first_inning,
            home_yrfi_rate: self.home_yrfi_rate,
            home_avg_first_inning: self.home_avg_first_inning,
        }
    }
}

/// Historical game with leakage-free rolling features and its label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    pub features: FeatureVector,
    pub yrfi: bool,
}

impl TrainingRow {
    pub fn key(&self) -> GameKey {
        GameKey::new(self.game_date, &self.away_team, &self.home_team)
    }
}

/// Display tier derived from a probability (1 to 5 fireballs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceTier {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl ConfidenceTier {
    pub const ALL: [ConfidenceTier; 5] = [
        ConfidenceTier::Five,
        ConfidenceTier::Four,
        ConfidenceTier::Three,
        ConfidenceTier::Two,
        ConfidenceTier::One,
    ];

    pub fn from_probability(p: f64) -> Self {
        if p >= 0.80 {
            ConfidenceTier::Five
        } else if p >= 0.60 {
            ConfidenceTier::Four
        } else if p >= 0.40 {
            ConfidenceTier::Three
        } else if p >= 0.20 {
            ConfidenceTier::Two
        } else {
            ConfidenceTier::One
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn fireballs(&self) -> String {
        "🔥".repeat(self.level() as usize)
    }

    /// Parse either a tier level ("3") or its fireball rendering
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let level = match raw.parse::<u8>() {
            Ok(level) => level,
            Err(_) => raw.matches('🔥').count() as u8,
        };
        match level {
            1 => Some(ConfidenceTier::One),
            2 => Some(ConfidenceTier::Two),
            3 => Some(ConfidenceTier::Three),
            4 => Some(ConfidenceTier::Four),
            5 => Some(ConfidenceTier::Five),
            _ => None,
        }
    }
}

/// Model output for one matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    pub yrfi_prob: f64,
}

impl Prediction {
    pub fn key(&self) -> GameKey {
        GameKey::new(self.game_date, &self.away_team, &self.home_team)
    }

    pub fn nrfi_prob(&self) -> f64 {
        1.0 - self.yrfi_prob
    }

    pub fn yrfi_tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_probability(self.yrfi_prob)
    }

    pub fn nrfi_tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_probability(self.nrfi_prob())
    }

    /// Predicted side at the 0.5 threshold
    pub fn predicts_yrfi(&self) -> bool {
        self.yrfi_prob >= 0.5
    }
}
