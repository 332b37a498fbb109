//! Stage table persistence
//!
//! Each pipeline stage can be written to CSV and read back, so the CLI commands
//! can run one stage at a time from files.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

use super::{
    format_game_date, parse_game_date, parse_number, read_text_csv, text_column,
    optional_text_column, parse_flag, COL_AWAY_TEAM, COL_GAME_DATE, COL_HOME_TEAM,
    COL_MARKET_PROB, COL_MODEL_EV, COL_MODEL_PROB, COL_NRFI_PROB, COL_NRFI_TIER, COL_ODDS,
    COL_SIDE, COL_TOTAL, COL_YRFI, COL_YRFI_PROB, COL_YRFI_TIER,
};
use crate::error::{PipelineError, Result};
use crate::evaluation::ValueBet;
use crate::features::{
    FeatureVector, COL_AWAY_AVG_1ST, COL_AWAY_YRFI_RATE, COL_HOME_AVG_1ST, COL_HOME_YRFI_RATE,
};
use crate::models::{Matchup, Prediction, TrainingRow};

fn write_csv(path: &Path, columns: Vec<Column>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut df = DataFrame::new(columns)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

fn key_columns<'a, I>(keys: I) -> Vec<Column>
where
    I: Iterator<Item = (chrono::NaiveDate, &'a str, &'a str)>,
{
    let mut dates = Vec::new();
    let mut away = Vec::new();
    let mut home = Vec::new();
    for (date, away_team, home_team) in keys {
        dates.push(format_game_date(date));
        away.push(away_team.to_string());
        home.push(home_team.to_string());
    }
    vec![
        Column::new(COL_GAME_DATE.into(), dates),
        Column::new(COL_AWAY_TEAM.into(), away),
        Column::new(COL_HOME_TEAM.into(), home),
    ]
}

fn feature_columns<'a, I>(features: I) -> Vec<Column>
where
    I: Iterator<Item = &'a FeatureVector>,
{
    let mut away_rate = Vec::new();
    let mut away_avg = Vec::new();
    let mut home_rate = Vec::new();
    let mut home_avg = Vec::new();
    for f in features {
        away_rate.push(f.away_yrfi_rate);
        away_avg.push(f.away_avg_first_inning);
        home_rate.push(f.home_yrfi_rate);
        home_avg.push(f.home_avg_first_inning);
    }
    vec![
        Column::new(COL_AWAY_YRFI_RATE.into(), away_rate),
        Column::new(COL_AWAY_AVG_1ST.into(), away_avg),
        Column::new(COL_HOME_YRFI_RATE.into(), home_rate),
        Column::new(COL_HOME_AVG_1ST.into(), home_avg),
    ]
}

/// `Game Date, Away Team, Home Team, <features>, YRFI`
pub fn write_training_table<P: AsRef<Path>>(path: P, rows: &[TrainingRow]) -> Result<()> {
    let mut columns = key_columns(
        rows.iter()
            .map(|r| (r.game_date, r.away_team.as_str(), r.home_team.as_str())),
    );
    columns.extend(feature_columns(rows.iter().map(|r| &r.features)));
    let labels: Vec<i32> = rows.iter().map(|r| r.yrfi as i32).collect();
    columns.push(Column::new(COL_YRFI.into(), labels));
    write_csv(path.as_ref(), columns)
}

/// `Game Date, Away Team, Home Team, <features>, [Total]`
///
/// `Total` is written only when at least one matchup has a market total.
pub fn write_feature_table<P: AsRef<Path>>(path: P, matchups: &[Matchup]) -> Result<()> {
    let features: Vec<FeatureVector> = matchups.iter().map(|m| m.features()).collect();
    let mut columns = key_columns(
        matchups
            .iter()
            .map(|m| (m.game_date, m.away_team.as_str(), m.home_team.as_str())),
    );
    columns.extend(feature_columns(features.iter()));
    if matchups.iter().any(|m| m.total.is_some()) {
        let totals: Vec<Option<f64>> = matchups.iter().map(|m| m.total).collect();
        columns.push(Column::new(COL_TOTAL.into(), totals));
    }
    write_csv(path.as_ref(), columns)
}

/// Predictions sorted by YRFI probability, highest first
pub fn write_predictions<P: AsRef<Path>>(
    path: P,
    matchups: &[Matchup],
    predictions: &[Prediction],
) -> Result<()> {
    if matchups.len() != predictions.len() {
        return Err(PipelineError::Validation(format!(
            "{} matchups but {} predictions",
            matchups.len(),
            predictions.len()
        )));
    }

    let mut order: Vec<usize> = (0..predictions.len()).collect();
    order.sort_by(|&a, &b| predictions[b].yrfi_prob.total_cmp(&predictions[a].yrfi_prob));

    let sorted: Vec<Matchup> = order.iter().map(|&i| matchups[i].clone()).collect();
    let features: Vec<FeatureVector> = sorted.iter().map(|m| m.features()).collect();

    let mut columns = key_columns(
        sorted
            .iter()
            .map(|m| (m.game_date, m.away_team.as_str(), m.home_team.as_str())),
    );
    columns.extend(feature_columns(features.iter()));
    if sorted.iter().any(|m| m.total.is_some()) {
        let totals: Vec<Option<f64>> = sorted.iter().map(|m| m.total).collect();
        columns.push(Column::new(COL_TOTAL.into(), totals));
    }

    let preds = order.iter().map(|&i| &predictions[i]);
    let mut yrfi_prob = Vec::new();
    let mut yrfi_tier = Vec::new();
    let mut nrfi_prob = Vec::new();
    let mut nrfi_tier = Vec::new();
    for p in preds {
        yrfi_prob.push(p.yrfi_prob);
        yrfi_tier.push(p.yrfi_tier().fireballs());
        nrfi_prob.push(p.nrfi_prob());
        nrfi_tier.push(p.nrfi_tier().fireballs());
    }
    columns.push(Column::new(COL_YRFI_PROB.into(), yrfi_prob));
    columns.push(Column::new(COL_YRFI_TIER.into(), yrfi_tier));
    columns.push(Column::new(COL_NRFI_PROB.into(), nrfi_prob));
    columns.push(Column::new(COL_NRFI_TIER.into(), nrfi_tier));

    write_csv(path.as_ref(), columns)
}

pub fn write_value_bets<P: AsRef<Path>>(path: P, bets: &[ValueBet]) -> Result<()> {
    let mut columns = key_columns(
        bets.iter()
            .map(|b| (b.game_date, b.away_team.as_str(), b.home_team.as_str())),
    );
    let sides: Vec<String> = bets.iter().map(|b| b.side.to_string()).collect();
    let model_prob: Vec<f64> = bets.iter().map(|b| b.model_prob).collect();
    let odds: Vec<i32> = bets.iter().map(|b| b.odds).collect();
    let market_prob: Vec<f64> = bets.iter().map(|b| b.market_prob).collect();
    let model_ev: Vec<f64> = bets.iter().map(|b| b.model_ev).collect();
    columns.push(Column::new(COL_SIDE.into(), sides));
    columns.push(Column::new(COL_MODEL_PROB.into(), model_prob));
    columns.push(Column::new(COL_ODDS.into(), odds));
    columns.push(Column::new(COL_MARKET_PROB.into(), market_prob));
    columns.push(Column::new(COL_MODEL_EV.into(), model_ev));
    write_csv(path.as_ref(), columns)
}

/// Row-level reader over an all-text stage table
struct StageTable {
    table: &'static str,
    df: DataFrame,
}

impl StageTable {
    fn read(path: &Path, table: &'static str) -> Result<Self> {
        Ok(Self {
            table,
            df: read_text_csv(path)?,
        })
    }

    fn height(&self) -> usize {
        self.df.height()
    }

    fn text(&self, column: &str) -> Result<&StringChunked> {
        text_column(&self.df, self.table, column)
    }

    fn invalid(&self, column: &str, row: usize) -> PipelineError {
        PipelineError::Validation(format!(
            "Invalid '{}' at row {} of {}",
            column,
            row + 1,
            self.table
        ))
    }

    fn number(&self, col: &StringChunked, column: &str, row: usize) -> Result<f64> {
        parse_number(col.get(row)).ok_or_else(|| self.invalid(column, row))
    }

    fn keys(&self) -> Result<Vec<(chrono::NaiveDate, String, String)>> {
        let dates = self.text(COL_GAME_DATE)?;
        let away = self.text(COL_AWAY_TEAM)?;
        let home = self.text(COL_HOME_TEAM)?;
        (0..self.height())
            .map(|i| {
                let date = dates
                    .get(i)
                    .and_then(parse_game_date)
                    .ok_or_else(|| self.invalid(COL_GAME_DATE, i))?;
                Ok((
                    date,
                    away.get(i).unwrap_or("").trim().to_string(),
                    home.get(i).unwrap_or("").trim().to_string(),
                ))
            })
            .collect()
    }

    fn features(&self) -> Result<Vec<FeatureVector>> {
        let away_rate = self.text(COL_AWAY_YRFI_RATE)?;
        let away_avg = self.text(COL_AWAY_AVG_1ST)?;
        let home_rate = self.text(COL_HOME_YRFI_RATE)?;
        let home_avg = self.text(COL_HOME_AVG_1ST)?;
        (0..self.height())
            .map(|i| {
                Ok(FeatureVector {
                    away_yrfi_rate: self.number(away_rate, COL_AWAY_YRFI_RATE, i)?,
                    away_avg_first_inning: self.number(away_avg, COL_AWAY_AVG_1ST, i)?,
                    home_yrfi_rate: self.number(home_rate, COL_HOME_YRFI_RATE, i)?,
                    home_avg_first_inning: self.number(home_avg, COL_HOME_AVG_1ST, i)?,
                })
            })
            .collect()
    }

    fn totals(&self) -> Result<Vec<Option<f64>>> {
        Ok(match optional_text_column(&self.df, COL_TOTAL)? {
            Some(col) => (0..self.height()).map(|i| parse_number(col.get(i))).collect(),
            None => vec![None; self.height()],
        })
    }
}

pub fn load_training_table<P: AsRef<Path>>(path: P) -> Result<Vec<TrainingRow>> {
    let table = StageTable::read(path.as_ref(), "training table")?;
    let keys = table.keys()?;
    let features = table.features()?;
    let labels = table.text(COL_YRFI)?;

    Ok(keys
        .into_iter()
        .zip(features)
        .enumerate()
        .map(|(i, ((game_date, away_team, home_team), features))| TrainingRow {
            game_date,
            away_team,
            home_team,
            features,
            yrfi: parse_flag(labels.get(i)),
        })
        .collect())
}

pub fn load_feature_table<P: AsRef<Path>>(path: P) -> Result<Vec<Matchup>> {
    let table = StageTable::read(path.as_ref(), "feature table")?;
    let keys = table.keys()?;
    let features = table.features()?;
    let totals = table.totals()?;

    Ok(keys
        .into_iter()
        .zip(features)
        .zip(totals)
        .map(|(((game_date, away_team, home_team), f), total)| Matchup {
            game_date,
            away_team,
            home_team,
            away_yrfi_rate: f.away_yrfi_rate,
            away_avg_first_inning: f.away_avg_first_inning,
            home_yrfi_rate: f.home_yrfi_rate,
            home_avg_first_inning: f.home_avg_first_inning,
            total,
        })
        .collect())
}

/// Load saved predictions; tier columns are derived again from `YRFI_Prob`
pub fn load_predictions<P: AsRef<Path>>(path: P) -> Result<Vec<Prediction>> {
    let table = StageTable::read(path.as_ref(), "predictions")?;
    let keys = table.keys()?;
    let totals = table.totals()?;
    let probs = table.text(COL_YRFI_PROB)?;

    keys.into_iter()
        .zip(totals)
        .enumerate()
        .map(|(i, ((game_date, away_team, home_team), total))| {
            let yrfi_prob = table.number(probs, COL_YRFI_PROB, i)?;
            if !(0.0..=1.0).contains(&yrfi_prob) {
                return Err(table.invalid(COL_YRFI_PROB, i));
            }
            Ok(Prediction {
                game_date,
                away_team,
                home_team,
                total,
                yrfi_prob,
            })
        })
        .collect()
}
