//! American Odds
//!
//! Conversions between American odds, decimal odds and implied probability,
//! and expected value of a unit stake.
//!
//! American odds:
//!     +150 → a winning 1-unit stake profits 1.5 units
//!     -120 → a winning 1-unit stake profits 1/1.2 units
//!
//! Expected value per unit staked:
//!     EV = p * profit - (1 - p)
//!
//! Odds with |x| < 100 do not exist in the American format and are rejected.

use serde::{Deserialize, Serialize};

fn is_valid(odds: i32) -> bool {
    odds.unsigned_abs() >= 100
}

/// Profit of a winning 1-unit stake
///
/// # Examples
/// ```
/// use yrfi::core::odds::profit_per_unit;
/// assert!((profit_per_unit(150).unwrap() - 1.5).abs() < 1e-12);
/// assert!((profit_per_unit(-200).unwrap() - 0.5).abs() < 1e-12);
/// assert!(profit_per_unit(50).is_none());
/// ```
pub fn profit_per_unit(odds: i32) -> Option<f64> {
    if !is_valid(odds) {
        return None;
    }
    let odds = odds as f64;
    if odds > 0.0 {
        Some(odds / 100.0)
    } else {
        Some(100.0 / -odds)
    }
}

/// Decimal odds (stake included in the return)
pub fn american_to_decimal(odds: i32) -> Option<f64> {
    profit_per_unit(odds).map(|profit| profit + 1.0)
}

/// Break-even probability implied by the price, vig included
pub fn implied_probability(odds: i32) -> Option<f64> {
    american_to_decimal(odds).map(|decimal| 1.0 / decimal)
}

/// Expected profit of a 1-unit stake
///
/// # Arguments
/// * `probability` - Model probability the bet wins (0-1)
/// * `odds` - American odds offered
pub fn expected_value(probability: f64, odds: i32) -> Option<f64> {
    let profit = profit_per_unit(odds)?;
    Some(probability * profit - (1.0 - probability))
}

/// Two-way market prices with the bookmaker margin removed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPair {
    pub yrfi_prob: f64,
    pub nrfi_prob: f64,
    /// Sum of raw implied probabilities minus 1
    pub overround: f64,
}

impl MarketPair {
    /// Normalize the raw implied probabilities of both sides to sum to 1
    pub fn from_odds(yrfi_odds: i32, nrfi_odds: i32) -> Option<Self> {
        let yrfi = implied_probability(yrfi_odds)?;
        let nrfi = implied_probability(nrfi_odds)?;
        let book = yrfi + nrfi;
        Some(Self {
            yrfi_prob: yrfi / book,
            nrfi_prob: nrfi / book,
            overround: book - 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_conversion() {
        assert!((american_to_decimal(150).unwrap() - 2.5).abs() < 1e-12);
        assert!((american_to_decimal(100).unwrap() - 2.0).abs() < 1e-12);
        assert!((american_to_decimal(-100).unwrap() - 2.0).abs() < 1e-12);
        assert!((american_to_decimal(-120).unwrap() - (1.0 + 1.0 / 1.2)).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_odds() {
        assert!(american_to_decimal(0).is_none());
        assert!(american_to_decimal(99).is_none());
        assert!(american_to_decimal(-99).is_none());
        assert!(implied_probability(i32::MIN).is_some());
        assert!(expected_value(0.5, 10).is_none());
    }

    #[test]
    fn test_implied_probability() {
        assert!((implied_probability(100).unwrap() - 0.5).abs() < 1e-12);
        assert!((implied_probability(-150).unwrap() - 0.6).abs() < 1e-12);
        assert!((implied_probability(150).unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_expected_value() {
        // Fair coin at +100 breaks even
        assert!(expected_value(0.5, 100).unwrap().abs() < 1e-12);
        assert!((expected_value(0.5, 150).unwrap() - 0.25).abs() < 1e-12);
        assert!((expected_value(0.5, -120).unwrap() - (0.5 / 1.2 - 0.5)).abs() < 1e-12);

        // EV is zero exactly at the implied probability
        let p = implied_probability(-135).unwrap();
        assert!(expected_value(p, -135).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_market_pair_removes_vig() {
        let pair = MarketPair::from_odds(-110, -110).unwrap();
        assert!((pair.yrfi_prob - 0.5).abs() < 1e-12);
        assert!((pair.yrfi_prob + pair.nrfi_prob - 1.0).abs() < 1e-12);
        assert!((pair.overround - (2.0 * 110.0 / 210.0 - 1.0)).abs() < 1e-12);

        let pair = MarketPair::from_odds(-150, 120).unwrap();
        assert!(pair.yrfi_prob > 0.5);
        assert!((pair.yrfi_prob + pair.nrfi_prob - 1.0).abs() < 1e-12);
        assert!(MarketPair::from_odds(-150, 20).is_none());
    }
}
