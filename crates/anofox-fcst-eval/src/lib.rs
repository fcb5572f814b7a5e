//! Forecast accuracy evaluation for multi-series time series.
//!
//! This crate scores already-produced forecasts against ground truth with
//! per-series normalized metrics (MASE, MAPE, sMAPE, MSE, RMSE) and the mean
//! weighted quantile loss, following a two-phase "save past metrics, then
//! score" protocol.

pub mod error;
pub mod evaluator;
pub mod export;
pub mod frame;
pub mod metrics;

// Re-exports for convenience
pub use error::{EvalError, Result};
pub use evaluator::{
    check_get_evaluation_metric, list_metrics, EvalMetric, Evaluator, EvaluatorOptions,
    MetricDescriptor, PastMetrics, DEFAULT_TARGET_COLUMN, MEAN_COLUMN, MEDIAN_COLUMN,
    METRIC_REGISTRY,
};
pub use export::{ExportArtifact, ModelExporter};
pub use frame::{ItemSpan, TimeSeriesFrame};
pub use metrics::{
    in_sample_naive_1_error, mae_per_item, mape_per_item, mean_weighted_quantile_loss,
    mse_per_item, safe_mean, symmetric_mape_per_item,
};
