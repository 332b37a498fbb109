//! Table loading and export
//!
//! Every input CSV is read with an all-text schema and coerced field by field,
//! so a malformed cell is counted and logged instead of failing the whole load.

pub mod box_scores;
pub mod export;
pub mod odds_loader;

pub use box_scores::BoxScoreStore;
pub use export::{
    load_feature_table, load_predictions, load_training_table, write_feature_table,
    write_predictions, write_training_table, write_value_bets,
};
pub use odds_loader::MarketOddsTable;

use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

use crate::error::{PipelineError, Result};

pub const COL_GAME_DATE: &str = "Game Date";
pub const COL_AWAY_TEAM: &str = "Away Team";
pub const COL_HOME_TEAM: &str = "Home Team";
pub const COL_AWAY_1ST: &str = "Away 1st";
pub const COL_HOME_1ST: &str = "Home 1st";
pub const COL_YRFI: &str = "YRFI";
pub const COL_TOTAL: &str = "Total";
pub const COL_YRFI_ODDS: &str = "YRFI Odds";
pub const COL_NRFI_ODDS: &str = "NRFI Odds";

pub const COL_YRFI_PROB: &str = "YRFI_Prob";
pub const COL_YRFI_TIER: &str = "YRFI_Tier";
pub const COL_NRFI_PROB: &str = "NRFI_Prob";
pub const COL_NRFI_TIER: &str = "NRFI_Tier";

pub const COL_SIDE: &str = "Side";
pub const COL_MODEL_PROB: &str = "Model_Prob";
pub const COL_ODDS: &str = "Odds";
pub const COL_MARKET_PROB: &str = "Market_Prob";
pub const COL_MODEL_EV: &str = "Model_EV";

/// Read a CSV with every column as text
pub(crate) fn read_text_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Text column that must be present
pub(crate) fn text_column<'a>(
    df: &'a DataFrame,
    table: &str,
    name: &str,
) -> Result<&'a StringChunked> {
    if !has_column(df, name) {
        return Err(PipelineError::missing_column(table, name));
    }
    Ok(df.column(name)?.str()?)
}

/// Text column that may be absent
pub(crate) fn optional_text_column<'a>(
    df: &'a DataFrame,
    name: &str,
) -> Result<Option<&'a StringChunked>> {
    if !has_column(df, name) {
        return Ok(None);
    }
    Ok(Some(df.column(name)?.str()?))
}

/// Parse `YYYY-MM-DD`, ignoring any trailing time part
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub(crate) fn format_game_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Finite number from a text cell; blank and malformed cells are `None`
pub(crate) fn parse_number(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Truthy flag cell ("1", "1.0", "true", "yes", "y")
pub(crate) fn parse_flag(raw: Option<&str>) -> bool {
    match raw.map(|s| s.trim().to_lowercase()) {
        Some(s) => match s.as_str() {
            "true" | "yes" | "y" => true,
            other => other.parse::<f64>().map(|v| v > 0.0).unwrap_or(false),
        },
        None => false,
    }
}
