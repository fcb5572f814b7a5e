//! Error types for forecast evaluation.

use thiserror::Error;

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Error types for evaluation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Metric {0} is not available")]
    InvalidMetric(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Call save_past_metrics before score_with_saved_past_metrics")]
    PastMetricsMissing,

    #[error("Prediction length mismatch for item '{item_id}': expected {expected} timesteps, got {got}")]
    PredictionLengthMismatch {
        item_id: String,
        expected: usize,
        got: usize,
    },

    #[error("Prediction and data indices do not match")]
    IndexMismatch,
}

impl EvalError {
    /// Convert to an error code for FFI.
    pub fn to_code(&self) -> i32 {
        match self {
            EvalError::InvalidInput(_) => 2,
            EvalError::InvalidMetric(_) => 5,
            EvalError::InvalidParameter { .. } => 9,
            EvalError::MissingColumn(_) => 11,
            EvalError::PastMetricsMissing => 12,
            EvalError::PredictionLengthMismatch { .. } => 13,
            EvalError::IndexMismatch => 14,
        }
    }

    /// Whether this error signals a broken caller contract rather than bad data.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            EvalError::PastMetricsMissing
                | EvalError::PredictionLengthMismatch { .. }
                | EvalError::IndexMismatch
        )
    }
}
