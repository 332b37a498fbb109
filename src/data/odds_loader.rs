//! Market odds loading
//!
//! The odds feed carries one row per scheduled game with an optional total runs
//! line and optional American odds for both first-inning sides.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{info, warn};

use super::{
    optional_text_column, parse_game_date, parse_number, read_text_csv, text_column,
    COL_AWAY_TEAM, COL_GAME_DATE, COL_HOME_TEAM, COL_NRFI_ODDS, COL_TOTAL, COL_YRFI_ODDS,
};
use crate::error::Result;
use crate::models::{GameKey, MarketOddsRecord};
use crate::teams::TeamRegistry;

const TABLE: &str = "market odds";

/// Market odds rows indexed by natural key
#[derive(Debug, Clone, Default)]
pub struct MarketOddsTable {
    records: Vec<MarketOddsRecord>,
    index: HashMap<GameKey, usize>,
}

impl MarketOddsTable {
    /// Build from canonicalized records; the first row of a duplicated key wins
    pub fn from_records(records: Vec<MarketOddsRecord>) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut duplicates = 0usize;

        for record in records {
            let key = record.key();
            if index.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            index.insert(key, kept.len());
            kept.push(record);
        }

        if duplicates > 0 {
            warn!("Dropped {} duplicate market odds rows (kept first)", duplicates);
        }

        Self {
            records: kept,
            index,
        }
    }

    /// Load the odds CSV.
    ///
    /// With `strict` set, any unrecognized team name fails the load with every
    /// offending spelling listed. Otherwise those rows are logged and dropped.
    pub fn load<P: AsRef<Path>>(path: P, registry: &TeamRegistry, strict: bool) -> Result<Self> {
        let path = path.as_ref();
        let df = read_text_csv(path)?;

        let dates = text_column(&df, TABLE, COL_GAME_DATE)?;
        let away_teams = text_column(&df, TABLE, COL_AWAY_TEAM)?;
        let home_teams = text_column(&df, TABLE, COL_HOME_TEAM)?;
        let totals = optional_text_column(&df, COL_TOTAL)?;
        let yrfi_odds = optional_text_column(&df, COL_YRFI_ODDS)?;
        let nrfi_odds = optional_text_column(&df, COL_NRFI_ODDS)?;

        if strict {
            let names = away_teams
                .into_iter()
                .chain(home_teams.into_iter())
                .flatten();
            registry.validate(names, TABLE)?;
        }

        let mut records = Vec::with_capacity(df.height());
        let mut bad_dates = 0usize;
        let mut dropped: BTreeSet<String> = BTreeSet::new();
        let mut dropped_rows = 0usize;

        for i in 0..df.height() {
            let game_date = match dates.get(i).and_then(parse_game_date) {
                Some(date) => date,
                None => {
                    bad_dates += 1;
                    continue;
                }
            };

            let away_raw = away_teams.get(i).unwrap_or("");
            let home_raw = home_teams.get(i).unwrap_or("");
            let (away_team, home_team) =
                match (registry.canonicalize(away_raw), registry.canonicalize(home_raw)) {
                    (Some(away), Some(home)) => (away, home),
                    (away, home) => {
                        for (raw, canonical) in [(away_raw, away), (home_raw, home)] {
                            if canonical.is_none() && !raw.trim().is_empty() {
                                dropped.insert(raw.trim().to_string());
                            }
                        }
                        dropped_rows += 1;
                        continue;
                    }
                };

            records.push(MarketOddsRecord {
                game_date,
                away_team: away_team.to_string(),
                home_team: home_team.to_string(),
                total: totals.and_then(|col| parse_number(col.get(i))),
                yrfi_odds: yrfi_odds.and_then(|col| parse_american(col.get(i))),
                nrfi_odds: nrfi_odds.and_then(|col| parse_american(col.get(i))),
            });
        }

        if bad_dates > 0 {
            warn!("Skipped {} market odds rows with an invalid date", bad_dates);
        }
        if dropped_rows > 0 {
            warn!(
                "Dropped {} market odds rows with unrecognized teams: {}",
                dropped_rows,
                dropped.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        let table = Self::from_records(records);
        info!("Loaded {} market odds rows from {}", table.len(), path.display());
        Ok(table)
    }

    /// Load the odds CSV, or an empty table when the file does not exist
    pub fn load_or_empty<P: AsRef<Path>>(
        path: P,
        registry: &TeamRegistry,
        strict: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("No market odds file at {}; continuing without odds", path.display());
            return Ok(Self::default());
        }
        Self::load(path, registry, strict)
    }

    pub fn records(&self) -> &[MarketOddsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &GameKey) -> Option<&MarketOddsRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn total_for(&self, key: &GameKey) -> Option<f64> {
        self.get(key).and_then(|r| r.total)
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.records.iter().map(|r| r.game_date).collect()
    }

    pub fn game_keys(&self) -> impl Iterator<Item = GameKey> + '_ {
        self.records.iter().map(|r| r.key())
    }
}

/// American odds from a text cell ("+150", "-120", "110.0")
fn parse_american(raw: Option<&str>) -> Option<i32> {
    parse_number(raw).map(|v| v.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::fs;

    fn write_csv(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("yrfi_{}_{}.csv", name, std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_american() {
        assert_eq!(parse_american(Some("+150")), Some(150));
        assert_eq!(parse_american(Some("-120")), Some(-120));
        assert_eq!(parse_american(Some("110.0")), Some(110));
        assert_eq!(parse_american(Some("")), None);
    }

    #[test]
    fn test_load_canonicalizes_and_indexes() {
        let path = write_csv(
            "odds_load",
            "Game Date,Away Team,Home Team,Total,YRFI Odds,NRFI Odds\n\
             2025-06-14,Red Sox ,Yankees,8.5,-120,+100\n\
             2025-06-14,Cubs,Brewers,,,\n",
        );
        let table = MarketOddsTable::load(&path, &TeamRegistry::mlb(), true).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(table.len(), 2);
        let key = GameKey::new(date("2025-06-14"), "Boston Red Sox", "New York Yankees");
        assert_eq!(table.total_for(&key), Some(8.5));
        let record = table.get(&key).unwrap();
        assert_eq!(record.yrfi_odds, Some(-120));
        assert_eq!(record.nrfi_odds, Some(100));

        let cubs = GameKey::new(date("2025-06-14"), "Chicago Cubs", "Milwaukee Brewers");
        assert!(table.get(&cubs).is_some());
        assert_eq!(table.total_for(&cubs), None);
    }

    #[test]
    fn test_strict_rejects_unknown_teams() {
        let path = write_csv(
            "odds_strict",
            "Game Date,Away Team,Home Team,Total\n\
             2025-06-14,Red Sox,Yanks,8.5\n\
             2025-06-14,Bosten,Yankees,8.5\n",
        );
        let err = MarketOddsTable::load(&path, &TeamRegistry::mlb(), true).unwrap_err();
        let lenient = MarketOddsTable::load(&path, &TeamRegistry::mlb(), false).unwrap();
        fs::remove_file(&path).ok();

        match err {
            PipelineError::UnknownTeams { names, .. } => {
                assert_eq!(names, vec!["Bosten".to_string(), "Yanks".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(lenient.is_empty());
    }

    #[test]
    fn test_duplicate_odds_keep_first() {
        let path = write_csv(
            "odds_duplicates",
            "Game Date,Away Team,Home Team,Total,YRFI Odds\n\
             2025-06-14,Red Sox,Yankees,8.5,-120\n\
             2025-06-14,BOS,NYY,9.5,+105\n\
             2025-06-15,Red Sox,Yankees,7.5,\n",
        );
        let table = MarketOddsTable::load(&path, &TeamRegistry::mlb(), true).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(table.len(), 2);
        let key = GameKey::new(date("2025-06-14"), "Boston Red Sox", "New York Yankees");
        assert_eq!(table.total_for(&key), Some(8.5));
        assert_eq!(table.get(&key).unwrap().yrfi_odds, Some(-120));
        assert_eq!(table.dates().len(), 2);
    }

    #[test]
    fn test_missing_file_gives_empty_table() {
        let path = std::env::temp_dir().join("yrfi_no_such_odds_file.csv");
        let table = MarketOddsTable::load_or_empty(&path, &TeamRegistry::mlb(), true).unwrap();
        assert!(table.is_empty());
        assert!(table.dates().is_empty());
    }
}
