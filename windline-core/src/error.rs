//! Error types
//!
//! Only malformed input is an error. Data that is merely unavailable (a
//! sample outside the wind grid, a missing VMG calculator) is reported as an
//! empty result or a degradation, never through these types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Malformed input detected by the engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    /// One of the wind grids does not have the same shape as the latitude grid
    #[error("{grid} grid has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        grid: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A grid has no cells at all
    #[error("wind field grids are empty")]
    EmptyGrid,

    /// A row of a nested-array grid has a different length than the first row
    #[error("{grid} grid row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        grid: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A grid contains NaN or infinite values
    #[error("{grid} grid contains a non-finite value at ({row}, {col})")]
    NonFinite {
        grid: &'static str,
        row: usize,
        col: usize,
    },

    /// The course trace has no legs or no path points at all
    #[error("course trace is empty")]
    EmptyCourse,

    /// A configuration value is outside its allowed range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a [`WindPropagationPredictor`](crate::wind::WindPropagationPredictor)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    /// The predictor cannot forecast that far ahead
    #[error("forecast horizon {requested_secs}s exceeds maximum of {max_secs}s")]
    HorizonExceeded { requested_secs: i64, max_secs: i64 },

    /// The target time lies before the field's own timestamp
    #[error("target time {target} is before field time {field}")]
    TargetInPast {
        target: DateTime<Utc>,
        field: DateTime<Utc>,
    },

    /// The predicted field failed validation
    #[error("predicted field is malformed: {0}")]
    Malformed(#[from] StrategyError),

    /// Any other backend failure
    #[error("prediction unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StrategyError>;
