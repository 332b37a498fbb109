//! Canonical MLB team names
//!
//! Box scores and market odds arrive from different sources with different
//! spellings ("Red Sox ", "BOS", "Boston Red Sox"). Every name is mapped to one
//! canonical franchise name before any join.

use std::collections::{BTreeSet, HashMap};

use crate::error::{PipelineError, Result};

/// One franchise and the spellings it is known by
#[derive(Debug, Clone, Copy)]
pub struct TeamInfo {
    pub name: &'static str,
    pub nickname: &'static str,
    pub abbreviation: &'static str,
    pub aliases: &'static [&'static str],
}

const MLB_TEAMS: [TeamInfo; 30] = [
    TeamInfo { name: "Arizona Diamondbacks", nickname: "Diamondbacks", abbreviation: "ARI", aliases: &["D-backs", "Dbacks", "Arizona D-backs", "AZ"] },
    TeamInfo { name: "Atlanta Braves", nickname: "Braves", abbreviation: "ATL", aliases: &[] },
    TeamInfo { name: "Baltimore Orioles", nickname: "Orioles", abbreviation: "BAL", aliases: &["O's"] },
    TeamInfo { name: "Boston Red Sox", nickname: "Red Sox", abbreviation: "BOS", aliases: &[] },
    TeamInfo { name: "Chicago Cubs", nickname: "Cubs", abbreviation: "CHC", aliases: &["Chi Cubs"] },
    TeamInfo { name: "Chicago White Sox", nickname: "White Sox", abbreviation: "CWS", aliases: &["CHW", "Chi White Sox"] },
    TeamInfo { name: "Cincinnati Reds", nickname: "Reds", abbreviation: "CIN", aliases: &[] },
    TeamInfo { name: "Cleveland Guardians", nickname: "Guardians", abbreviation: "CLE", aliases: &["Cleveland Indians", "Indians"] },
    TeamInfo { name: "Colorado Rockies", nickname: "Rockies", abbreviation: "COL", aliases: &[] },
    TeamInfo { name: "Detroit Tigers", nickname: "Tigers", abbreviation: "DET", aliases: &[] },
    TeamInfo { name: "Houston Astros", nickname: "Astros", abbreviation: "HOU", aliases: &[] },
    TeamInfo { name: "Kansas City Royals", nickname: "Royals", abbreviation: "KC", aliases: &["KCR", "KC Royals"] },
    TeamInfo { name: "Los Angeles Angels", nickname: "Angels", abbreviation: "LAA", aliases: &["LA Angels", "Anaheim Angels", "Los Angeles Angels of Anaheim"] },
    TeamInfo { name: "Los Angeles Dodgers", nickname: "Dodgers", abbreviation: "LAD", aliases: &["LA Dodgers"] },
    TeamInfo { name: "Miami Marlins", nickname: "Marlins", abbreviation: "MIA", aliases: &["Florida Marlins"] },
    TeamInfo { name: "Milwaukee Brewers", nickname: "Brewers", abbreviation: "MIL", aliases: &[] },
    TeamInfo { name: "Minnesota Twins", nickname: "Twins", abbreviation: "MIN", aliases: &[] },
    TeamInfo { name: "New York Mets", nickname: "Mets", abbreviation: "NYM", aliases: &["NY Mets"] },
    TeamInfo { name: "New York Yankees", nickname: "Yankees", abbreviation: "NYY", aliases: &["NY Yankees"] },
    TeamInfo { name: "Athletics", nickname: "A's", abbreviation: "ATH", aliases: &["Oakland Athletics", "Sacramento Athletics", "Oakland A's", "OAK"] },
    TeamInfo { name: "Philadelphia Phillies", nickname: "Phillies", abbreviation: "PHI", aliases: &[] },
    TeamInfo { name: "Pittsburgh Pirates", nickname: "Pirates", abbreviation: "PIT", aliases: &[] },
    TeamInfo { name: "San Diego Padres", nickname: "Padres", abbreviation: "SD", aliases: &["SDP", "SD Padres"] },
    TeamInfo { name: "San Francisco Giants", nickname: "Giants", abbreviation: "SF", aliases: &["SFG", "SF Giants"] },
    TeamInfo { name: "Seattle Mariners", nickname: "Mariners", abbreviation: "SEA", aliases: &[] },
    TeamInfo { name: "St. Louis Cardinals", nickname: "Cardinals", abbreviation: "STL", aliases: &["St Louis Cardinals", "Saint Louis Cardinals"] },
    TeamInfo { name: "Tampa Bay Rays", nickname: "Rays", abbreviation: "TB", aliases: &["TBR", "Tampa Bay Devil Rays", "TB Rays"] },
    TeamInfo { name: "Texas Rangers", nickname: "Rangers", abbreviation: "TEX", aliases: &[] },
    TeamInfo { name: "Toronto Blue Jays", nickname: "Blue Jays", abbreviation: "TOR", aliases: &[] },
    TeamInfo { name: "Washington Nationals", nickname: "Nationals", abbreviation: "WSH", aliases: &["WSN", "WAS", "Nats"] },
];

/// Trim and collapse internal whitespace
pub fn normalize_team_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lookup_key(raw: &str) -> String {
    normalize_team_name(raw).to_lowercase()
}

/// Fixed enumeration of valid team names with alias lookup
#[derive(Debug, Clone)]
pub struct TeamRegistry {
    teams: &'static [TeamInfo],
    /// lowercase spelling -> canonical name
    lookup: HashMap<String, &'static str>,
}

impl TeamRegistry {
    /// Registry of the 30 MLB franchises
    pub fn mlb() -> Self {
        let mut lookup = HashMap::new();
        for team in MLB_TEAMS.iter() {
            lookup.insert(lookup_key(team.name), team.name);
            lookup.insert(lookup_key(team.nickname), team.name);
            lookup.insert(lookup_key(team.abbreviation), team.name);
            for alias in team.aliases {
                lookup.insert(lookup_key(alias), team.name);
            }
        }

        Self {
            teams: &MLB_TEAMS,
            lookup,
        }
    }

    /// Canonical name for any known spelling (case-insensitive, whitespace-tolerant)
    pub fn canonicalize(&self, raw: &str) -> Option<&'static str> {
        self.lookup.get(&lookup_key(raw)).copied()
    }

    pub fn is_known(&self, raw: &str) -> bool {
        self.canonicalize(raw).is_some()
    }

    /// Check every name, reporting all unrecognized spellings at once
    pub fn validate<'a, I>(&self, names: I, source_name: &str) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unknown: BTreeSet<String> = names
            .into_iter()
            .filter(|name| !self.is_known(name))
            .map(normalize_team_name)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::UnknownTeams {
                source_name: source_name.to_string(),
                names: unknown.into_iter().collect(),
            })
        }
    }

    pub fn teams(&self) -> &[TeamInfo] {
        self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

impl Default for TeamRegistry {
    fn default() -> Self {
        Self::mlb()
    }
}
