//! Snapshot Feature Builder
//!
//! Inference-time team stats: one all-history aggregate per team and role,
//! computed from every game played before the target date. Unlike the
//! training-time rolling stats this window is unbounded.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

use crate::data::{BoxScoreStore, MarketOddsTable};
use crate::error::{PipelineError, Result};
use crate::models::{BoxScoreRecord, Matchup, Role, TeamSnapshotStat};

/// Per-team, per-role snapshot stats as of a date
#[derive(Debug, Clone)]
pub struct SnapshotTable {
    as_of: NaiveDate,
    away: HashMap<String, TeamSnapshotStat>,
    home: HashMap<String, TeamSnapshotStat>,
}

impl SnapshotTable {
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn get(&self, team: &str, role: Role) -> Option<&TeamSnapshotStat> {
        match role {
            Role::Away => self.away.get(team),
            Role::Home => self.home.get(team),
        }
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

    /// Stats for one role sorted by team name
    pub fn stats(&self, role: Role) -> Vec<&TeamSnapshotStat> {
        let map = match role {
            Role::Away => &self.away,
            Role::Home => &self.home,
        };
        let mut stats: Vec<&TeamSnapshotStat> = map.values().collect();
        stats.sort_by(|a, b| a.team.cmp(&b.team));
        stats
    }
}

#[derive(Default)]
struct Accumulator {
    runs: u64,
    yrfi: usize,
    games: usize,
}

/// All-history feature builder
#[derive(Debug, Clone)]
pub struct SnapshotFeatureBuilder {
    min_games: usize,
}

impl SnapshotFeatureBuilder {
    /// `min_games` is the number of games in role a team needs before it gets a snapshot
    pub fn new(min_games: usize) -> Self {
        Self {
            min_games: min_games.max(1),
        }
    }

    /// Aggregate every game with `game_date < as_of`
    pub fn build(&self, records: &[BoxScoreRecord], as_of: NaiveDate) -> SnapshotTable {
        let mut away: HashMap<&str, Accumulator> = HashMap::new();
        let mut home: HashMap<&str, Accumulator> = HashMap::new();

        for record in records.iter().filter(|r| r.game_date < as_of) {
            for (role, acc) in [(Role::Away, &mut away), (Role::Home, &mut home)] {
                let entry = acc.entry(record.team(role)).or_default();
                entry.runs += record.runs_for(role) as u64;
                entry.yrfi += record.yrfi as usize;
                entry.games += 1;
            }
        }

        let table = SnapshotTable {
            as_of,
            away: self.finish(away, Role::Away),
            home: self.finish(home, Role::Home),
        };

        info!(
            "Snapshot as of {}: {} away teams, {} home teams",
            as_of,
            table.away.len(),
            table.home.len()
        );

        table
    }

    fn finish(
        &self,
        acc: HashMap<&str, Accumulator>,
        role: Role,
    ) -> HashMap<String, TeamSnapshotStat> {
        acc.into_iter()
            .filter(|(_, a)| a.games >= self.min_games)
            .map(|(team, a)| {
                let stat = TeamSnapshotStat {
                    team: team.to_string(),
                    role,
                    avg_first_inning_runs: a.runs as f64 / a.games as f64,
                    yrfi_rate: a.yrfi as f64 / a.games as f64,
                    games: a.games,
                };
                (team.to_string(), stat)
            })
            .collect()
    }
}

impl Default for SnapshotFeatureBuilder {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Requested prediction date and the date actually used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDate {
    pub requested: NaiveDate,
    pub resolved: NaiveDate,
}

impl TargetDate {
    pub fn fell_back(&self) -> bool {
        self.requested != self.resolved
    }
}

/// Pick the date to score.
///
/// The requested date is kept when it has box-score games or odds rows.
/// Otherwise the latest date with data on or before it is used, or the
/// latest date overall when nothing precedes it.
pub fn resolve_target_date(
    store: &BoxScoreStore,
    odds: &MarketOddsTable,
    requested: NaiveDate,
) -> Result<TargetDate> {
    let mut dates: BTreeSet<NaiveDate> = store.dates();
    dates.extend(odds.dates());

    if dates.contains(&requested) {
        return Ok(TargetDate {
            requested,
            resolved: requested,
        });
    }

    let resolved = dates
        .range(..requested)
        .next_back()
        .or_else(|| dates.iter().next_back())
        .copied()
        .ok_or(PipelineError::NoData)?;

    warn!(
        "No games or odds for {}; falling back to latest date with data: {}",
        requested, resolved
    );

    Ok(TargetDate {
        requested,
        resolved,
    })
}

/// Left-join market totals onto matchups by natural key.
///
/// Matchups on `target` without a total are logged; the total stays `None`.
/// Returns the number of matchups left without a total.
pub fn attach_market_totals(
    matchups: &mut [Matchup],
    odds: &MarketOddsTable,
    target: NaiveDate,
) -> usize {
    let mut missing = 0usize;
    let mut missing_on_target = Vec::new();

    for matchup in matchups.iter_mut() {
        matchup.total = odds.total_for(&matchup.key());
        if matchup.total.is_none() {
            missing += 1;
            if matchup.game_date == target {
                missing_on_target.push(matchup.key());
            }
        }
    }

    if !odds.is_empty() {
        if missing_on_target.is_empty() {
            info!("All matchups on {} have a market total", target);
        } else {
            for key in &missing_on_target {
                warn!("No market total for {}", key);
            }
        }
    }

    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketOddsRecord;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap() + chrono::Duration::days(n)
    }

    fn history() -> Vec<BoxScoreRecord> {
        vec![
            BoxScoreRecord::new(day(0), "Boston Red Sox", "New York Yankees", 1, 0),
            BoxScoreRecord::new(day(1), "Boston Red Sox", "Toronto Blue Jays", 0, 0),
            BoxScoreRecord::new(day(2), "New York Yankees", "Boston Red Sox", 0, 2),
            BoxScoreRecord::new(day(3), "Boston Red Sox", "New York Yankees", 3, 0),
        ]
    }

    #[test]
    fn test_snapshot_uses_all_prior_games_in_role() {
        let builder = SnapshotFeatureBuilder::default();
        let table = builder.build(&history(), day(10));

        let red_sox_away = table.get("Boston Red Sox", Role::Away).unwrap();
        assert_eq!(red_sox_away.games, 3);
        assert!((red_sox_away.avg_first_inning_runs - 4.0 / 3.0).abs() < 1e-9);
        assert!((red_sox_away.yrfi_rate - 2.0 / 3.0).abs() < 1e-9);

        let red_sox_home = table.get("Boston Red Sox", Role::Home).unwrap();
        assert_eq!(red_sox_home.games, 1);
        assert!((red_sox_home.avg_first_inning_runs - 2.0).abs() < 1e-9);

        assert!(table.get("Toronto Blue Jays", Role::Away).is_none());
        assert!(table.get("Toronto Blue Jays", Role::Home).is_some());
    }

    #[test]
    fn test_snapshot_excludes_target_date_and_later() {
        let builder = SnapshotFeatureBuilder::default();
        let table = builder.build(&history(), day(3));

        let red_sox_away = table.get("Boston Red Sox", Role::Away).unwrap();
        assert_eq!(red_sox_away.games, 2);
        assert!((red_sox_away.avg_first_inning_runs - 0.5).abs() < 1e-9);
        assert_eq!(table.as_of(), day(3));
    }

    #[test]
    fn test_snapshot_is_not_a_trailing_window() {
        // Fifteen early scoring games then five scoreless ones: all twenty count
        let mut records = Vec::new();
        for i in 0..20 {
            let runs = if i < 15 { 1 } else { 0 };
            records.push(BoxScoreRecord::new(day(i), "Kansas City Royals", "Detroit Tigers", runs, 0));
        }
        let table = SnapshotFeatureBuilder::default().build(&records, day(30));
        let royals = table.get("Kansas City Royals", Role::Away).unwrap();
        assert_eq!(royals.games, 20);
        assert!((royals.yrfi_rate - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_min_games_filter() {
        let table = SnapshotFeatureBuilder::new(2).build(&history(), day(10));
        assert!(table.get("Boston Red Sox", Role::Away).is_some());
        assert!(table.get("Boston Red Sox", Role::Home).is_none());
        assert_eq!(table.stats(Role::Home).len(), 1); // Yankees hosted twice
    }

    #[test]
    fn test_resolve_target_date_keeps_requested() {
        let store = BoxScoreStore::from_records(history());
        let odds = MarketOddsTable::from_records(vec![MarketOddsRecord {
            game_date: day(7),
            away_team: "Boston Red Sox".to_string(),
            home_team: "New York Yankees".to_string(),
            total: Some(8.5),
            yrfi_odds: None,
            nrfi_odds: None,
        }]);

        let target = resolve_target_date(&store, &odds, day(7)).unwrap();
        assert_eq!(target.resolved, day(7));
        assert!(!target.fell_back());

        let target = resolve_target_date(&store, &odds, day(2)).unwrap();
        assert_eq!(target.resolved, day(2));
    }

    #[test]
    fn test_resolve_target_date_falls_back_to_latest() {
        let store = BoxScoreStore::from_records(history());
        let odds = MarketOddsTable::default();

        // Nothing on day 9: latest date with data is day 3
        let target = resolve_target_date(&store, &odds, day(9)).unwrap();
        assert_eq!(target.requested, day(9));
        assert_eq!(target.resolved, day(3));
        assert!(target.fell_back());

        // Before all data: use the latest overall
        let target = resolve_target_date(&store, &odds, day(-5)).unwrap();
        assert_eq!(target.resolved, day(3));
    }

    #[test]
    fn test_resolve_target_date_without_data() {
        let store = BoxScoreStore::from_records(Vec::new());
        let odds = MarketOddsTable::default();
        assert!(matches!(
            resolve_target_date(&store, &odds, day(0)),
            Err(PipelineError::NoData)
        ));
    }

    #[test]
    fn test_attach_market_totals_keeps_missing_as_none() {
        let mut matchups = vec![
            Matchup {
                game_date: day(5),
                away_team: "Boston Red Sox".to_string(),
                home_team: "New York Yankees".to_string(),
                away_yrfi_rate: 0.5,
                away_avg_first_inning: 0.5,
                home_yrfi_rate: 0.5,
                home_avg_first_inning: 0.5,
                total: None,
            },
            Matchup {
                game_date: day(5),
                away_team: "Toronto Blue Jays".to_string(),
                home_team: "Baltimore Orioles".to_string(),
                away_yrfi_rate: 0.5,
                away_avg_first_inning: 0.5,
                home_yrfi_rate: 0.5,
                home_avg_first_inning: 0.5,
                total: None,
            },
        ];
        let odds = MarketOddsTable::from_records(vec![MarketOddsRecord {
            game_date: day(5),
            away_team: "Boston Red Sox".to_string(),
            home_team: "New York Yankees".to_string(),
            total: Some(9.0),
            yrfi_odds: Some(-120),
            nrfi_odds: Some(100),
        }]);

        let missing = attach_market_totals(&mut matchups, &odds, day(5));
        assert_eq!(missing, 1);
        assert_eq!(matchups[0].total, Some(9.0));
        assert_eq!(matchups[1].total, None);
    }
}
