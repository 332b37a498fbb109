//! Matchup Assembler
//!
//! Builds the scorable games for a date: the union of box-score and odds-feed
//! game keys, with both teams' snapshot stats and the market total attached.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::snapshot::{attach_market_totals, SnapshotTable};
use crate::data::{BoxScoreStore, MarketOddsTable};
use crate::error::{PipelineError, Result};
use crate::models::{GameKey, Matchup, Role};

const STAGE: &str = "Inference";

/// Sorted, duplicate-free union of two key sets
pub fn union_game_keys<I, J>(historical: I, scheduled: J) -> Vec<GameKey>
where
    I: IntoIterator<Item = GameKey>,
    J: IntoIterator<Item = GameKey>,
{
    let keys: BTreeSet<GameKey> = historical.into_iter().chain(scheduled).collect();
    keys.into_iter().collect()
}

/// Which games get a feature row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchupScope {
    /// Games on the resolved target date only
    #[default]
    TargetDate,
    /// Every historical game plus the odds feed for the target date
    AllKnown,
}

impl MatchupScope {
    pub fn game_keys(
        &self,
        store: &BoxScoreStore,
        odds: &MarketOddsTable,
        date: NaiveDate,
    ) -> Vec<GameKey> {
        let scheduled = odds.game_keys().filter(|k| k.game_date == date);
        match self {
            MatchupScope::TargetDate => {
                union_game_keys(store.game_keys().filter(|k| k.game_date == date), scheduled)
            }
            MatchupScope::AllKnown => union_game_keys(store.game_keys(), scheduled),
        }
    }
}

impl fmt::Display for MatchupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchupScope::TargetDate => write!(f, "target-date"),
            MatchupScope::AllKnown => write!(f, "all-known"),
        }
    }
}

impl FromStr for MatchupScope {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "target-date" | "date" => Ok(MatchupScope::TargetDate),
            "all-known" | "all" => Ok(MatchupScope::AllKnown),
            other => Err(PipelineError::Config(format!(
                "Unknown matchup scope '{}' (expected target-date or all-known)",
                other
            ))),
        }
    }
}

/// Joins snapshot stats onto game keys
pub struct MatchupAssembler<'a> {
    snapshot: &'a SnapshotTable,
}

impl<'a> MatchupAssembler<'a> {
    pub fn new(snapshot: &'a SnapshotTable) -> Self {
        Self { snapshot }
    }

    /// One matchup per key with both teams' snapshots; keys missing either are dropped
    pub fn assemble(&self, keys: &[GameKey], odds: &MarketOddsTable) -> Result<Vec<Matchup>> {
        if keys.is_empty() {
            return Err(PipelineError::empty(
                STAGE,
                &format!("no scheduled games for {}", self.snapshot.as_of()),
            ));
        }

        let mut matchups = Vec::with_capacity(keys.len());
        let mut unmatched: BTreeSet<&str> = BTreeSet::new();

        for key in keys {
            let away = self.snapshot.get(&key.away_team, Role::Away);
            let home = self.snapshot.get(&key.home_team, Role::Home);
            match (away, home) {
                (Some(away), Some(home)) => matchups.push(Matchup {
                    game_date: key.game_date,
                    away_team: key.away_team.clone(),
                    home_team: key.home_team.clone(),
                    away_yrfi_rate: away.yrfi_rate,
                    away_avg_first_inning: away.avg_first_inning_runs,
                    home_yrfi_rate: home.yrfi_rate,
                    home_avg_first_inning: home.avg_first_inning_runs,
                    total: None,
                }),
                (away, home) => {
                    debug!("No snapshot for {}", key);
                    if away.is_none() {
                        unmatched.insert(&key.away_team);
                    }
                    if home.is_none() {
                        unmatched.insert(&key.home_team);
                    }
                }
            }
        }

        let dropped = keys.len() - matchups.len();
        if dropped > 0 {
            warn!(
                "Dropped {} of {} games without snapshot stats (teams: {})",
                dropped,
                keys.len(),
                unmatched.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        if matchups.is_empty() {
            return Err(PipelineError::empty(STAGE, "no teams matched snapshot stats"));
        }

        let missing_totals = attach_market_totals(&mut matchups, odds, self.snapshot.as_of());
        info!(
            "Assembled {} matchups ({} without a market total)",
            matchups.len(),
            missing_totals
        );

        Ok(matchups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SnapshotFeatureBuilder;
    use crate::models::{BoxScoreRecord, MarketOddsRecord};
    use crate::teams::TeamRegistry;
    use std::fs;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + chrono::Duration::days(n)
    }

    fn history() -> Vec<BoxScoreRecord> {
        vec![
            BoxScoreRecord::new(day(0), "Boston Red Sox", "New York Yankees", 1, 0),
            BoxScoreRecord::new(day(0), "Chicago Cubs", "Milwaukee Brewers", 0, 0),
            BoxScoreRecord::new(day(1), "New York Yankees", "Boston Red Sox", 0, 1),
            BoxScoreRecord::new(day(1), "Milwaukee Brewers", "Chicago Cubs", 2, 0),
        ]
    }

    #[test]
    fn test_union_is_idempotent() {
        let a = vec![
            GameKey::new(day(2), "Boston Red Sox", "New York Yankees"),
            GameKey::new(day(2), "Chicago Cubs", "Milwaukee Brewers"),
        ];
        let b = vec![
            GameKey::new(day(2), "Chicago Cubs", "Milwaukee Brewers"),
            GameKey::new(day(2), "Seattle Mariners", "Houston Astros"),
        ];

        let once = union_game_keys(a.clone(), b.clone());
        assert_eq!(once.len(), 3);

        let twice = union_game_keys(once.clone(), b);
        assert_eq!(once, twice);
        assert_eq!(union_game_keys(a.clone(), a.clone()).len(), 2);
    }

    #[test]
    fn test_scope_selects_keys() {
        let store = BoxScoreStore::from_records(history());
        let odds = MarketOddsTable::from_records(vec![MarketOddsRecord {
            game_date: day(2),
            away_team: "Boston Red Sox".to_string(),
            home_team: "New York Yankees".to_string(),
            total: Some(8.5),
            yrfi_odds: None,
            nrfi_odds: None,
        }]);

        let keys = MatchupScope::TargetDate.game_keys(&store, &odds, day(2));
        assert_eq!(keys, vec![GameKey::new(day(2), "Boston Red Sox", "New York Yankees")]);

        let keys = MatchupScope::TargetDate.game_keys(&store, &odds, day(1));
        assert_eq!(keys.len(), 2);

        let keys = MatchupScope::AllKnown.game_keys(&store, &odds, day(2));
        assert_eq!(keys.len(), 5);

        assert_eq!("all-known".parse::<MatchupScope>().unwrap(), MatchupScope::AllKnown);
        assert!("tomorrow".parse::<MatchupScope>().is_err());
    }

    #[test]
    fn test_assemble_drops_teams_without_snapshot() {
        let table = SnapshotFeatureBuilder::default().build(&history(), day(2));
        let keys = vec![
            GameKey::new(day(2), "Boston Red Sox", "New York Yankees"),
            GameKey::new(day(2), "Seattle Mariners", "New York Yankees"),
        ];
        let matchups = MatchupAssembler::new(&table)
            .assemble(&keys, &MarketOddsTable::default())
            .unwrap();

        assert_eq!(matchups.len(), 1);
        let m = &matchups[0];
        assert_eq!(m.away_team, "Boston Red Sox");
        assert!((m.away_yrfi_rate - 1.0).abs() < 1e-9);
        assert!((m.away_avg_first_inning - 1.0).abs() < 1e-9);
        assert!((m.home_yrfi_rate - 1.0).abs() < 1e-9);
        assert!(m.home_avg_first_inning.abs() < 1e-9);
        assert_eq!(m.total, None);
    }

    #[test]
    fn test_assemble_reports_empty_steps() {
        let table = SnapshotFeatureBuilder::default().build(&history(), day(2));
        let assembler = MatchupAssembler::new(&table);

        let err = assembler.assemble(&[], &MarketOddsTable::default()).unwrap_err();
        assert!(err.to_string().contains("no scheduled games"));

        let keys = vec![GameKey::new(day(2), "Seattle Mariners", "Houston Astros")];
        let err = assembler.assemble(&keys, &MarketOddsTable::default()).unwrap_err();
        assert!(err.to_string().contains("no teams matched snapshot stats"));
    }

    #[test]
    fn test_trailing_space_team_gets_market_total() {
        let dir = std::env::temp_dir();
        let box_path = dir.join(format!("yrfi_matchup_box_{}.csv", std::process::id()));
        let odds_path = dir.join(format!("yrfi_matchup_odds_{}.csv", std::process::id()));
        fs::write(
            &box_path,
            "Game Date,Away Team,Home Team,Away 1st,Home 1st,YRFI\n\
             2025-06-01,Red Sox,Yankees,1,0,1\n\
             2025-06-02,Yankees,Red Sox,0,0,0\n",
        )
        .unwrap();
        fs::write(
            &odds_path,
            "Game Date,Away Team,Home Team,Total\n2025-06-03,Red Sox ,Yankees,9.5\n",
        )
        .unwrap();

        let registry = TeamRegistry::mlb();
        let store = BoxScoreStore::load(&box_path, &registry).unwrap();
        let odds = MarketOddsTable::load(&odds_path, &registry, true).unwrap();
        fs::remove_file(&box_path).ok();
        fs::remove_file(&odds_path).ok();

        let table = SnapshotFeatureBuilder::default().build(store.records(), day(2));
        let keys = MatchupScope::TargetDate.game_keys(&store, &odds, day(2));
        let matchups = MatchupAssembler::new(&table).assemble(&keys, &odds).unwrap();

        assert_eq!(matchups.len(), 1);
        assert_eq!(matchups[0].away_team, "Boston Red Sox");
        assert_eq!(matchups[0].total, Some(9.5));
    }
}
