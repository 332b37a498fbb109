//! Betting math

pub mod odds;

pub use odds::{
    american_to_decimal, expected_value, implied_probability, profit_per_unit, MarketPair,
};
