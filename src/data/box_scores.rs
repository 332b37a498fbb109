//! Box-score history loading

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{
    parse_flag, parse_game_date, parse_number, read_text_csv, text_column, optional_text_column,
    COL_AWAY_1ST, COL_AWAY_TEAM, COL_GAME_DATE, COL_HOME_1ST, COL_HOME_TEAM, COL_YRFI,
};
use crate::error::Result;
use crate::models::{BoxScoreRecord, GameKey};
use crate::teams::{normalize_team_name, TeamRegistry};

const TABLE: &str = "box scores";

/// Largest first-inning run count accepted from a cell
pub const MAX_FIRST_INNING_RUNS: u32 = 99;

/// Whole, non-negative run count no larger than [`MAX_FIRST_INNING_RUNS`]
fn parse_run_count(raw: Option<&str>) -> Option<u32> {
    let v = parse_number(raw)?;
    if v < 0.0 || v.fract() != 0.0 || v > MAX_FIRST_INNING_RUNS as f64 {
        return None;
    }
    Some(v as u32)
}

/// Played games, unique on natural key, in ingestion order
#[derive(Debug, Clone, Default)]
pub struct BoxScoreStore {
    records: Vec<BoxScoreRecord>,
    index: HashMap<GameKey, usize>,
}

impl BoxScoreStore {
    /// Build from records, keeping the first row of each duplicated key
    pub fn from_records(records: Vec<BoxScoreRecord>) -> Self {
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
            warn!("Dropped {} duplicate box-score rows (kept first)", duplicates);
        }

        Self {
            records: kept,
            index,
        }
    }

    /// Load the box-score CSV.
    ///
    /// Run counts that are missing, non-numeric, fractional, negative or above
    /// [`MAX_FIRST_INNING_RUNS`] become 0 and are counted.
    /// Rows with an unparseable date or a blank team are skipped and counted.
    /// Team names are canonicalized; unrecognized names are kept normalized.
    pub fn load<P: AsRef<Path>>(path: P, registry: &TeamRegistry) -> Result<Self> {
        let path = path.as_ref();
        let df = read_text_csv(path)?;

        let dates = text_column(&df, TABLE, COL_GAME_DATE)?;
        let away_teams = text_column(&df, TABLE, COL_AWAY_TEAM)?;
        let home_teams = text_column(&df, TABLE, COL_HOME_TEAM)?;
        let away_runs = text_column(&df, TABLE, COL_AWAY_1ST)?;
        let home_runs = text_column(&df, TABLE, COL_HOME_1ST)?;
        let flags = optional_text_column(&df, COL_YRFI)?;

        let mut records = Vec::with_capacity(df.height());
        let mut coerced = 0usize;
        let mut skipped = 0usize;
        let mut unknown: BTreeSet<String> = BTreeSet::new();

        let mut team = |raw: Option<&str>| -> Option<String> {
            let raw = raw?;
            match registry.canonicalize(raw) {
                Some(name) => Some(name.to_string()),
                None => {
                    let name = normalize_team_name(raw);
                    if name.is_empty() {
                        return None;
                    }
                    unknown.insert(name.clone());
                    Some(name)
                }
            }
        };

        for i in 0..df.height() {
            let game_date = match dates.get(i).and_then(parse_game_date) {
                Some(date) => date,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let (away_team, home_team) = match (team(away_teams.get(i)), team(home_teams.get(i))) {
                (Some(away), Some(home)) => (away, home),
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            let mut runs = |raw: Option<&str>| -> u32 {
                match parse_run_count(raw) {
                    Some(v) => v,
                    None => {
                        if let Some(raw) = raw.filter(|r| !r.trim().is_empty()) {
                            debug!("Coerced run value '{}' to 0", raw.trim());
                        }
                        coerced += 1;
                        0
                    }
                }
            };
            let away_first_inning_runs = runs(away_runs.get(i));
            let home_first_inning_runs = runs(home_runs.get(i));

            let flagged = flags.map(|col| parse_flag(col.get(i))).unwrap_or(false);

            records.push(BoxScoreRecord {
                game_date,
                away_team,
                home_team,
                away_first_inning_runs,
                home_first_inning_runs,
                yrfi: away_first_inning_runs > 0 || home_first_inning_runs > 0 || flagged,
            });
        }

        if coerced > 0 {
            warn!("Coerced {} missing or invalid run values to 0", coerced);
        }
        if skipped > 0 {
            warn!("Skipped {} box-score rows with an invalid date or team", skipped);
        }
        if !unknown.is_empty() {
            warn!(
                "Unrecognized team names kept as-is in box scores: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        let store = Self::from_records(records);
        info!(
            "Loaded {} box scores from {} ({} dates)",
            store.len(),
            path.display(),
            store.dates().len()
        );
        Ok(store)
    }

    pub fn records(&self) -> &[BoxScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct game dates
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.records.iter().map(|r| r.game_date).collect()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.game_date).max()
    }

    pub fn game_keys(&self) -> impl Iterator<Item = GameKey> + '_ {
        self.records.iter().map(|r| r.key())
    }

    pub fn games_on(&self, date: NaiveDate) -> Vec<&BoxScoreRecord> {
        self.records.iter().filter(|r| r.game_date == date).collect()
    }

    /// Whether a run scored in the first inning; `None` when the game is not in history
    pub fn outcome(&self, key: &GameKey) -> Option<bool> {
        let outcome = self.index.get(key).map(|&i| self.records[i].yrfi);
        if outcome.is_none() {
            debug!("No box score yet for {}", key);
        }
        outcome
    }
}
