//! C-compatible type definitions for FFI boundary.
//!
//! These types are designed to be used across the Rust/C++ boundary.

use anofox_fcst_eval::{EvalError, Evaluator};
use libc::{c_char, c_double, size_t};

/// Error codes for FFI boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    NullPointer = 1,
    InvalidInput = 2,
    AllocationError = 4,
    InvalidMetric = 5,
    InvalidParameter = 9,
    InternalError = 10,
    MissingColumn = 11,
    PastMetricsMissing = 12,
    PredictionLengthMismatch = 13,
    IndexMismatch = 14,
    PanicCaught = 15,
}

impl From<&EvalError> for ErrorCode {
    fn from(err: &EvalError) -> Self {
        match err {
            EvalError::InvalidInput(_) => ErrorCode::InvalidInput,
            EvalError::InvalidMetric(_) => ErrorCode::InvalidMetric,
            EvalError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            EvalError::MissingColumn(_) => ErrorCode::MissingColumn,
            EvalError::PastMetricsMissing => ErrorCode::PastMetricsMissing,
            EvalError::PredictionLengthMismatch { .. } => ErrorCode::PredictionLengthMismatch,
            EvalError::IndexMismatch => ErrorCode::IndexMismatch,
        }
    }
}

/// Error structure with message buffer for FFI.
#[repr(C)]
pub struct AnofoxError {
    pub code: ErrorCode,
    pub message: [c_char; 256],
}

impl AnofoxError {
    /// Create a success error (no error).
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: [0; 256],
        }
    }

    /// Set an error with code and message.
    pub fn set_error(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        let bytes = msg.as_bytes();
        let len = bytes.len().min(255);
        for (i, &b) in bytes[..len].iter().enumerate() {
            self.message[i] = b as c_char;
        }
        self.message[len] = 0; // Null terminator
    }

    /// Message as a Rust string, up to the null terminator.
    pub fn message_str(&self) -> String {
        let bytes: Vec<u8> = self
            .message
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for AnofoxError {
    fn default() -> Self {
        Self::success()
    }
}

/// Named numeric column of a [`SeriesTable`].
///
/// The validity bitmask follows DuckDB's convention where bit i of validity[i/64]
/// indicates if element i is valid (1) or NULL (0). NULL entries become NaN.
#[repr(C)]
pub struct DataColumn {
    /// Null-terminated column name, e.g. "target", "mean" or "0.9"
    pub name: *const c_char,
    /// Pointer to the data values (table length elements)
    pub data: *const c_double,
    /// Pointer to validity bitmask (NULL means all valid)
    pub validity: *const u64,
}

/// Multi-series table passed across the boundary.
///
/// Rows of one item must be contiguous and in chronological order.
#[repr(C)]
pub struct SeriesTable {
    /// Null-terminated item id per row
    pub item_ids: *const *const c_char,
    /// Timestamp per row, microseconds since epoch
    pub timestamps: *const i64,
    /// Number of rows
    pub length: size_t,
    /// Pointer to the columns
    pub columns: *const DataColumn,
    /// Number of columns
    pub n_columns: size_t,
}

/// Opaque evaluator handle owned by the caller.
///
/// Created by `anofox_eval_evaluator_new`, released by `anofox_eval_evaluator_free`.
pub struct EvaluatorHandle {
    pub(crate) inner: Evaluator,
}

/// Capacity of metric name output buffers, including the terminator.
pub const METRIC_NAME_CAPACITY: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_eval_error() {
        assert_eq!(
            ErrorCode::from(&EvalError::PastMetricsMissing),
            ErrorCode::PastMetricsMissing
        );
        assert_eq!(
            ErrorCode::from(&EvalError::InvalidMetric("x".into())),
            ErrorCode::InvalidMetric
        );
        // Codes agree with the core crate's numbering.
        for err in [
            EvalError::InvalidInput("x".into()),
            EvalError::MissingColumn("mean".into()),
            EvalError::IndexMismatch,
        ] {
            assert_eq!(ErrorCode::from(&err) as i32, err.to_code());
        }
    }

    #[test]
    fn test_message_truncated_and_terminated() {
        let mut error = AnofoxError::default();
        let long = "x".repeat(400);
        error.set_error(ErrorCode::InvalidInput, &long);
        assert_eq!(error.message[255], 0);
        assert_eq!(error.message_str().len(), 255);
    }
}
