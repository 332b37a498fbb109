//! Rolling Feature Builder
//!
//! Training-time team stats: for every team, role and game date, the mean
//! first-inning runs and YRFI rate over the team's last `window_size` games
//! in that role played strictly before the date.
//!
//! `min_periods` counts the game being predicted, so with the default of 3 a
//! team's first two games in a role have no stat and its third game is
//! averaged over the two before it.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{validate_window, PipelineError, Result};
use crate::features::{FeatureVector, RollingWindow};
use crate::models::{BoxScoreRecord, Role, TeamRollingStat, TrainingRow};

/// Rolling stats for both roles, keyed by (team, as-of date)
#[derive(Debug, Default)]
pub struct RollingStats {
    away: HashMap<(String, NaiveDate), TeamRollingStat>,
    home: HashMap<(String, NaiveDate), TeamRollingStat>,
}

impl RollingStats {
    pub fn get(&self, team: &str, role: Role, date: NaiveDate) -> Option<&TeamRollingStat> {
        let map = match role {
            Role::Away => &self.away,
            Role::Home => &self.home,
        };
        map.get(&(team.to_string(), date))
    }

    pub fn len(&self, role: Role) -> usize {
        match role {
            Role::Away => self.away.len(),
            Role::Home => self.home.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.away.is_empty() && self.home.is_empty()
    }

    fn insert(&mut self, stat: TeamRollingStat) {
        let key = (stat.team.clone(), stat.as_of_date);
        match stat.role {
            Role::Away => self.away.insert(key, stat),
            Role::Home => self.home.insert(key, stat),
        };
    }
}

/// Trailing-window feature builder
#[derive(Debug, Clone)]
pub struct RollingFeatureBuilder {
    window_size: usize,
    min_periods: usize,
}

impl RollingFeatureBuilder {
    pub fn new(window_size: usize, min_periods: usize) -> Result<Self> {
        validate_window(window_size, min_periods)?;
        Ok(Self {
            window_size,
            min_periods,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.window_size, config.min_periods)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn min_periods(&self) -> usize {
        self.min_periods
    }

    /// Prior games in role needed before a stat is defined (at least one)
    pub fn min_prior_games(&self) -> usize {
        self.min_periods.saturating_sub(1).max(1)
    }

    /// Compute one stat per (team, game date) for a single role.
    ///
    /// `records` must be in ingestion order; games on the same date keep that
    /// order. All games sharing a date receive the stat as of that date and
    /// enter the window together afterwards, so a doubleheader never sees its
    /// own result.
    pub fn role_stats(&self, records: &[BoxScoreRecord], role: Role) -> Vec<TeamRollingStat> {
        let mut series: BTreeMap<&str, Vec<&BoxScoreRecord>> = BTreeMap::new();
        for record in records {
            series.entry(record.team(role)).or_default().push(record);
        }

        let min_prior = self.min_prior_games();
        let mut stats = Vec::new();

        for (team, mut games) in series {
            // Stable sort: same-date games stay in ingestion order
            games.sort_by_key(|g| g.game_date);

            let mut window = RollingWindow::new(self.window_size);

            for same_day in games.chunk_by(|a, b| a.game_date == b.game_date) {
                let date = same_day[0].game_date;

                if let Some((avg_runs, yrfi_rate)) = window.stat(min_prior) {
                    stats.push(TeamRollingStat {
                        team: team.to_string(),
                        role,
                        as_of_date: date,
                        avg_first_inning_runs: avg_runs,
                        yrfi_rate,
                        games_in_window: window.len(),
                    });
                }

                for game in same_day {
                    window.push(game.runs_for(role), game.yrfi);
                }
            }
        }

        debug!(
            "{} rolling stats: {} team-dates (window {}, min {})",
            role.prefix(),
            stats.len(),
            self.window_size,
            self.min_periods
        );

        stats
    }

    /// Compute rolling stats for both roles
    pub fn compute(&self, records: &[BoxScoreRecord]) -> RollingStats {
        let mut stats = RollingStats::default();
        for role in [Role::Away, Role::Home] {
            for stat in self.role_stats(records, role) {
                stats.insert(stat);
            }
        }
        stats
    }

    /// Build the training table: one row per game whose away team has an away
    /// stat and whose home team has a home stat as of the game date.
    pub fn build_training_table(&self, records: &[BoxScoreRecord]) -> Result<Vec<TrainingRow>> {
        if records.is_empty() {
            return Err(PipelineError::empty(
                "Training",
                "box-score history has no games",
            ));
        }

        let stats = self.compute(records);

        for role in [Role::Away, Role::Home] {
            if stats.len(role) == 0 {
                return Err(PipelineError::empty(
                    "Training",
                    &format!(
                        "no team has played {} {} games",
                        self.min_periods,
                        role.prefix().to_lowercase()
                    ),
                ));
            }
        }

        let mut ordered: Vec<&BoxScoreRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.game_date);

        let mut rows = Vec::with_capacity(ordered.len());
        let mut cold_start = 0usize;

        for record in ordered {
            let away = stats.get(&record.away_team, Role::Away, record.game_date);
            let home = stats.get(&record.home_team, Role::Home, record.game_date);

            match (away, home) {
                (Some(away), Some(home)) => rows.push(TrainingRow {
                    game_date: record.game_date,
                    away_team: record.away_team.clone(),
                    home_team: record.home_team.clone(),
                    features: FeatureVector {
                        away_yrfi_rate: away.yrfi_rate,
                        away_avg_first_inning: away.avg_first_inning_runs,
                        home_yrfi_rate: home.yrfi_rate,
                        home_avg_first_inning: home.avg_first_inning_runs,
                    },
                    yrfi: record.yrfi,
                }),
                _ => cold_start += 1,
            }
        }

        info!(
            "Training table: {} rows, {} games dropped without enough history",
            rows.len(),
            cold_start
        );

        if rows.is_empty() {
            return Err(PipelineError::empty(
                "Training",
                "no game has rolling stats for both teams",
            ));
        }

        Ok(rows)
    }
}

impl Default for RollingFeatureBuilder {
    fn default() -> Self {
        Self {
            window_size: crate::config::WINDOW_SIZE,
            min_periods: crate::config::MIN_PERIODS,
        }
    }
}
