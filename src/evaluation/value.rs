//! Model-vs-market comparison

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::core::odds::{expected_value, implied_probability, MarketPair};
use crate::data::MarketOddsTable;
use crate::models::Prediction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Yrfi,
    Nrfi,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yrfi => write!(f, "YRFI"),
            Side::Nrfi => write!(f, "NRFI"),
        }
    }
}

/// A side priced with positive (or at least threshold) expected value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBet {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    pub side: Side,
    pub model_prob: f64,
    /// American odds offered
    pub odds: i32,
    /// Vig-free when both sides are priced, raw implied otherwise
    pub market_prob: f64,
    /// Expected profit per unit staked
    pub model_ev: f64,
}

impl ValueBet {
    pub fn edge(&self) -> f64 {
        self.model_prob - self.market_prob
    }
}

/// Join predictions with priced odds rows and keep sides with `EV >= min_ev`,
/// best first.
pub fn find_value_bets(
    predictions: &[Prediction],
    odds: &MarketOddsTable,
    min_ev: f64,
) -> Vec<ValueBet> {
    let mut bets = Vec::new();
    let mut unpriced = 0usize;

    for prediction in predictions {
        let record = match odds.get(&prediction.key()) {
            Some(r) if r.yrfi_odds.is_some() || r.nrfi_odds.is_some() => r,
            _ => {
                unpriced += 1;
                continue;
            }
        };

        let pair = match (record.yrfi_odds, record.nrfi_odds) {
            (Some(y), Some(n)) => MarketPair::from_odds(y, n),
            _ => None,
        };

        let sides = [
            (Side::Yrfi, record.yrfi_odds, prediction.yrfi_prob, pair.map(|p| p.yrfi_prob)),
            (Side::Nrfi, record.nrfi_odds, prediction.nrfi_prob(), pair.map(|p| p.nrfi_prob)),
        ];

        for (side, price, model_prob, fair) in sides {
            let Some(price) = price else { continue };
            let (Some(model_ev), Some(implied)) =
                (expected_value(model_prob, price), implied_probability(price))
            else {
                debug!("Invalid American odds {} for {}", price, prediction.key());
                continue;
            };
            if model_ev < min_ev {
                continue;
            }
            bets.push(ValueBet {
                game_date: prediction.game_date,
                away_team: prediction.away_team.clone(),
                home_team: prediction.home_team.clone(),
                side,
                model_prob,
                odds: price,
                market_prob: fair.unwrap_or(implied),
                model_ev,
            });
        }
    }

    bets.sort_by(|a, b| {
        b.model_ev
            .total_cmp(&a.model_ev)
            .then_with(|| a.game_date.cmp(&b.game_date))
            .then_with(|| a.away_team.cmp(&b.away_team))
    });

    info!(
        "Found {} value bets (EV >= {:.3}); {} predictions had no odds",
        bets.len(),
        min_ev,
        unpriced
    );
    bets
}
