use polars::prelude::PolarsError;
use thiserror::Error;

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Table error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    /// Team spellings not present in the canonical registry
    #[error("Unrecognized team names in {source_name}: {}", .names.join(", "))]
    UnknownTeams {
        source_name: String,
        names: Vec<String>,
    },

    /// A join or filter step left a table with no rows
    #[error("{stage} table is empty: {step}")]
    EmptyTable { stage: String, step: String },

    #[error("No box scores or odds rows available")]
    NoData,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn empty(stage: &str, step: &str) -> Self {
        PipelineError::EmptyTable {
            stage: stage.to_string(),
            step: step.to_string(),
        }
    }

    pub fn missing_column(table: &str, column: &str) -> Self {
        PipelineError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Validation functions
pub fn validate_probability(prob: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(PipelineError::Validation(format!(
            "Probability must be between 0 and 1, got {}",
            prob
        )));
    }
    Ok(())
}

pub fn validate_window(window_size: usize, min_periods: usize) -> Result<()> {
    if min_periods == 0 {
        return Err(PipelineError::Config(
            "Minimum periods must be at least 1".to_string(),
        ));
    }
    if min_periods > window_size {
        return Err(PipelineError::Config(format!(
            "Minimum periods ({}) cannot exceed window size ({})",
            min_periods, window_size
        )));
    }
    Ok(())
}

pub fn validate_fraction(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(PipelineError::Config(format!(
            "{} must be strictly between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_probability_valid() {
        assert!(validate_probability(0.0).is_ok());
        assert!(validate_probability(0.5).is_ok());
        assert!(validate_probability(1.0).is_ok());
    }

    #[test]
    fn test_validate_probability_invalid() {
        assert!(validate_probability(-0.1).is_err());
        assert!(validate_probability(1.1).is_err());
        assert!(validate_probability(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_window() {
        assert!(validate_window(10, 3).is_ok());
        assert!(validate_window(3, 3).is_ok());
        assert!(validate_window(10, 0).is_err());
        assert!(validate_window(2, 3).is_err());
    }

    #[test]
    fn test_validate_fraction() {
        assert!(validate_fraction("holdout", 0.2).is_ok());
        assert!(validate_fraction("holdout", 0.0).is_err());
        assert!(validate_fraction("holdout", 1.0).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::empty("Inference", "no teams matched snapshot stats");
        assert_eq!(
            err.to_string(),
            "Inference table is empty: no teams matched snapshot stats"
        );

        let err = PipelineError::UnknownTeams {
            source_name: "market odds".to_string(),
            names: vec!["Bosten Red Sox".to_string(), "Yanks".to_string()],
        };
        assert!(err.to_string().contains("Bosten Red Sox, Yanks"));
    }
}
