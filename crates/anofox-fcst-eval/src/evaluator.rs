//! Forecast evaluator with a cached historical scale.
//!
//! The [`Evaluator`] expects two multi-series tables: ground truth and a table
//! of predictions covering only the forecast horizon. Scale-dependent metrics
//! (MASE) need the in-sample naive-1 error of the history of each item. It is
//! computed once by [`Evaluator::save_past_metrics`] and reused by every call
//! to [`Evaluator::score_with_saved_past_metrics`], which is what ensemble
//! search relies on. [`Evaluator::evaluate`] does both steps in one call.
//!
//! Metrics are reported in their natural orientation (lower is better for all
//! registered metrics). Multiply by [`Evaluator::coefficient`] to obtain a
//! higher-is-better score.
//!
//! # Example
//! ```
//! use anofox_fcst_eval::{EvalMetric, Evaluator, EvaluatorOptions, TimeSeriesFrame};
//! use chrono::{NaiveDate, TimeDelta};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let data = TimeSeriesFrame::from_regular_series(
//!     "target",
//!     start,
//!     TimeDelta::days(1),
//!     &[("A", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])],
//! )
//! .unwrap();
//! let predictions = data
//!     .slice_by_timestep(Some(-2), None)
//!     .rename_column("target", "mean")
//!     .unwrap();
//!
//! let mut evaluator = Evaluator::new(EvaluatorOptions {
//!     eval_metric: EvalMetric::Mase,
//!     prediction_length: 2,
//!     ..Default::default()
//! })
//! .unwrap();
//! let mase = evaluator.evaluate(&data, &predictions).unwrap();
//! assert_eq!(mase, 0.0);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{EvalError, Result};
use crate::frame::TimeSeriesFrame;
use crate::metrics::{
    in_sample_naive_1_error, mae_per_item, mape_per_item, mean_weighted_quantile_loss,
    mse_per_item, safe_mean, symmetric_mape_per_item,
};

/// Name of the point forecast column in a predictions table.
pub const MEAN_COLUMN: &str = "mean";

/// Name of the median forecast column in a predictions table.
pub const MEDIAN_COLUMN: &str = "0.5";

/// Default target column name.
pub const DEFAULT_TARGET_COLUMN: &str = "target";

/// Supported evaluation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalMetric {
    /// Mean absolute scaled error (MAE over in-sample naive-1 error)
    Mase = 0,
    /// Mean absolute percentage error
    Mape = 1,
    /// Symmetric mean absolute percentage error
    Smape = 2,
    /// Mean weighted quantile loss
    MeanWQuantileLoss = 3,
    /// Mean squared error
    Mse = 4,
    /// Root mean squared error
    Rmse = 5,
}

impl EvalMetric {
    /// All available metrics, in registry order.
    pub const ALL: [EvalMetric; 6] = [
        EvalMetric::Mase,
        EvalMetric::Mape,
        EvalMetric::Smape,
        EvalMetric::MeanWQuantileLoss,
        EvalMetric::Mse,
        EvalMetric::Rmse,
    ];

    /// Metric used when none is requested.
    pub const DEFAULT: EvalMetric = EvalMetric::MeanWQuantileLoss;

    /// Registry entry for this metric.
    pub fn descriptor(&self) -> &'static MetricDescriptor {
        &METRIC_REGISTRY[*self as usize]
    }

    /// Stable metric name.
    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Factor turning the raw metric value into a higher-is-better score.
    pub fn coefficient(&self) -> i32 {
        self.descriptor().coefficient
    }

    pub fn higher_is_better(&self) -> bool {
        self.coefficient() > 0
    }
}

impl FromStr for EvalMetric {
    type Err = EvalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        METRIC_REGISTRY
            .iter()
            .find(|d| d.name == s)
            .map(|d| d.metric)
            .ok_or_else(|| EvalError::InvalidMetric(s.to_string()))
    }
}

impl fmt::Display for EvalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type ScoreFn = fn(&ScoringContext<'_>) -> Result<f64>;

/// Inputs shared by all scoring functions, validated by the evaluator.
pub(crate) struct ScoringContext<'a> {
    y_true: &'a [f64],
    predictions: &'a TimeSeriesFrame,
    naive_1_error: &'a HashMap<String, f64>,
}

/// Registry entry: metric tag, stable name, sign coefficient and scorer.
pub struct MetricDescriptor {
    pub metric: EvalMetric,
    pub name: &'static str,
    pub coefficient: i32,
    score: ScoreFn,
}

impl fmt::Debug for MetricDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricDescriptor")
            .field("metric", &self.metric)
            .field("name", &self.name)
            .field("coefficient", &self.coefficient)
            .finish_non_exhaustive()
    }
}

/// Static metric registry, indexed by `EvalMetric as usize`.
pub static METRIC_REGISTRY: [MetricDescriptor; 6] = [
    MetricDescriptor {
        metric: EvalMetric::Mase,
        name: "MASE",
        coefficient: -1,
        score: score_mase,
    },
    MetricDescriptor {
        metric: EvalMetric::Mape,
        name: "MAPE",
        coefficient: -1,
        score: score_mape,
    },
    MetricDescriptor {
        metric: EvalMetric::Smape,
        name: "sMAPE",
        coefficient: -1,
        score: score_smape,
    },
    MetricDescriptor {
        metric: EvalMetric::MeanWQuantileLoss,
        name: "mean_wQuantileLoss",
        coefficient: -1,
        score: score_mean_wquantileloss,
    },
    MetricDescriptor {
        metric: EvalMetric::Mse,
        name: "MSE",
        coefficient: -1,
        score: score_mse,
    },
    MetricDescriptor {
        metric: EvalMetric::Rmse,
        name: "RMSE",
        coefficient: -1,
        score: score_rmse,
    },
];

/// Names of all available metrics, in registry order.
pub fn list_metrics() -> Vec<String> {
    METRIC_REGISTRY.iter().map(|d| d.name.to_string()).collect()
}

/// Resolve a requested metric name.
///
/// `None` or an empty name always yields [`EvalMetric::DEFAULT`]. An unknown
/// name is an [`EvalError::InvalidMetric`] when `raise_if_not_available` is
/// set, and silently becomes the default otherwise.
pub fn check_get_evaluation_metric(
    metric_name: Option<&str>,
    raise_if_not_available: bool,
) -> Result<EvalMetric> {
    let Some(name) = metric_name.filter(|s| !s.is_empty()) else {
        return Ok(EvalMetric::DEFAULT);
    };
    match name.parse::<EvalMetric>() {
        Ok(metric) => Ok(metric),
        Err(e) if raise_if_not_available => Err(e),
        Err(_) => Ok(EvalMetric::DEFAULT),
    }
}

/// Historical statistics cached by [`Evaluator::save_past_metrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PastMetrics {
    #[default]
    Uninitialized,
    Ready {
        /// In-sample naive-1 error per item id
        naive_1_error: HashMap<String, f64>,
    },
}

impl PastMetrics {
    pub fn is_ready(&self) -> bool {
        matches!(self, PastMetrics::Ready { .. })
    }

    /// Cached naive-1 error per item, if available.
    pub fn naive_1_error(&self) -> Option<&HashMap<String, f64>> {
        match self {
            PastMetrics::Ready { naive_1_error } => Some(naive_1_error),
            PastMetrics::Uninitialized => None,
        }
    }
}

/// Evaluator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorOptions {
    /// Metric to compute
    pub eval_metric: EvalMetric,
    /// Number of trailing timesteps per item being forecast
    pub prediction_length: usize,
    /// Name of the ground truth column
    pub target_column: String,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            eval_metric: EvalMetric::DEFAULT,
            prediction_length: 1,
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
        }
    }
}

/// Computes one forecast accuracy metric over multi-series data.
///
/// Not meant for concurrent use across a save/score pair: `save_past_metrics`
/// needs `&mut self`, so callers sharing one instance must serialize.
#[derive(Debug, Clone)]
pub struct Evaluator {
    options: EvaluatorOptions,
    past_metrics: PastMetrics,
}

impl Evaluator {
    /// Create an evaluator. Fails if `prediction_length` is zero.
    pub fn new(options: EvaluatorOptions) -> Result<Self> {
        if options.prediction_length == 0 || options.prediction_length > isize::MAX as usize {
            return Err(EvalError::InvalidParameter {
                param: "prediction_length".into(),
                value: options.prediction_length.to_string(),
                reason: "must be positive".into(),
            });
        }
        Ok(Self {
            options,
            past_metrics: PastMetrics::Uninitialized,
        })
    }

    /// Create an evaluator from a metric name. Unknown names are rejected.
    pub fn from_name(
        eval_metric: &str,
        prediction_length: usize,
        target_column: &str,
    ) -> Result<Self> {
        Self::new(EvaluatorOptions {
            eval_metric: eval_metric.parse()?,
            prediction_length,
            target_column: target_column.to_string(),
        })
    }

    pub fn eval_metric(&self) -> EvalMetric {
        self.options.eval_metric
    }

    pub fn prediction_length(&self) -> usize {
        self.options.prediction_length
    }

    pub fn target_column(&self) -> &str {
        &self.options.target_column
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn coefficient(&self) -> i32 {
        self.options.eval_metric.coefficient()
    }

    pub fn higher_is_better(&self) -> bool {
        self.coefficient() > 0
    }

    pub fn past_metrics(&self) -> &PastMetrics {
        &self.past_metrics
    }

    pub fn is_ready(&self) -> bool {
        self.past_metrics.is_ready()
    }

    /// Compute and cache the naive-1 error of every item in `data_past`.
    ///
    /// `data_past` must contain history only. Any previous cache is replaced.
    pub fn save_past_metrics(&mut self, data_past: &TimeSeriesFrame) -> Result<()> {
        let y_past = data_past.column(&self.options.target_column)?;
        let spans = data_past.item_spans();
        let errors = in_sample_naive_1_error(y_past, spans)?;

        let naive_1_error: HashMap<String, f64> = spans
            .iter()
            .zip(errors)
            .map(|(span, e)| (span.item_id.clone(), e))
            .collect();

        debug!(
            n_items = naive_1_error.len(),
            replaced = self.past_metrics.is_ready(),
            "saved past metrics"
        );
        self.past_metrics = PastMetrics::Ready { naive_1_error };
        Ok(())
    }

    /// Score predictions against future ground truth using the cached past metrics.
    ///
    /// Preconditions, checked in order:
    /// 1. every item of `predictions` has exactly `prediction_length` rows;
    /// 2. [`save_past_metrics`](Evaluator::save_past_metrics) has been called;
    /// 3. `data_future` and `predictions` share the same index.
    ///
    /// Returns the metric in its natural orientation.
    pub fn score_with_saved_past_metrics(
        &self,
        data_future: &TimeSeriesFrame,
        predictions: &TimeSeriesFrame,
    ) -> Result<f64> {
        let expected = self.options.prediction_length;
        if let Some(span) = predictions.item_spans().iter().find(|s| s.len != expected) {
            return Err(EvalError::PredictionLengthMismatch {
                item_id: span.item_id.clone(),
                expected,
                got: span.len,
            });
        }

        let naive_1_error = self
            .past_metrics
            .naive_1_error()
            .ok_or(EvalError::PastMetricsMissing)?;

        if !data_future.index_equals(predictions) {
            return Err(EvalError::IndexMismatch);
        }

        let ctx = ScoringContext {
            y_true: data_future.column(&self.options.target_column)?,
            predictions,
            naive_1_error,
        };
        (self.options.eval_metric.descriptor().score)(&ctx)
    }

    /// Split `data` into history and horizon, then save and score.
    ///
    /// Recomputes the cached past metrics on every call.
    pub fn evaluate(
        &mut self,
        data: &TimeSeriesFrame,
        predictions: &TimeSeriesFrame,
    ) -> Result<f64> {
        let horizon = self.options.prediction_length as isize;
        let data_past = data.slice_by_timestep(None, Some(-horizon));
        let data_future = data.slice_by_timestep(Some(-horizon), None);

        self.save_past_metrics(&data_past)?;
        self.score_with_saved_past_metrics(&data_future, predictions)
    }
}

fn median_forecast(predictions: &TimeSeriesFrame) -> Result<&[f64]> {
    // TODO: the median does not minimize MAPE or sMAPE; use the
    // metric-optimal quantile once predictors can emit it.
    match predictions.get_column(MEDIAN_COLUMN) {
        Some(median) => Ok(median),
        None => {
            warn!("Median forecast not found. Defaulting to mean forecasts.");
            predictions.column(MEAN_COLUMN)
        }
    }
}

fn quantile_forecasts(predictions: &TimeSeriesFrame) -> Result<Vec<(f64, &[f64])>> {
    predictions
        .columns()
        .filter(|(name, _)| *name != MEAN_COLUMN)
        .map(|(name, values)| {
            let level = name.parse::<f64>().map_err(|_| {
                EvalError::InvalidInput(format!(
                    "Prediction column '{}' is not a quantile level",
                    name
                ))
            })?;
            Ok((level, values))
        })
        .collect()
}

fn score_mse(ctx: &ScoringContext<'_>) -> Result<f64> {
    let y_pred = ctx.predictions.column(MEAN_COLUMN)?;
    let per_item = mse_per_item(ctx.y_true, y_pred, ctx.predictions.item_spans())?;
    Ok(safe_mean(&per_item))
}

fn score_rmse(ctx: &ScoringContext<'_>) -> Result<f64> {
    Ok(score_mse(ctx)?.sqrt())
}

fn score_mase(ctx: &ScoringContext<'_>) -> Result<f64> {
    let y_pred = median_forecast(ctx.predictions)?;
    let spans = ctx.predictions.item_spans();
    let mae = mae_per_item(ctx.y_true, y_pred, spans)?;

    let scaled: Vec<f64> = spans
        .iter()
        .zip(mae)
        .map(|(span, mae)| {
            let scale = ctx
                .naive_1_error
                .get(&span.item_id)
                .copied()
                .unwrap_or(f64::NAN);
            mae / scale
        })
        .collect();
    Ok(safe_mean(&scaled))
}

fn score_mape(ctx: &ScoringContext<'_>) -> Result<f64> {
    let y_pred = median_forecast(ctx.predictions)?;
    let per_item = mape_per_item(ctx.y_true, y_pred, ctx.predictions.item_spans())?;
    Ok(safe_mean(&per_item))
}

fn score_smape(ctx: &ScoringContext<'_>) -> Result<f64> {
    let y_pred = median_forecast(ctx.predictions)?;
    let per_item = symmetric_mape_per_item(ctx.y_true, y_pred, ctx.predictions.item_spans())?;
    Ok(safe_mean(&per_item))
}

fn score_mean_wquantileloss(ctx: &ScoringContext<'_>) -> Result<f64> {
    let quantiles = quantile_forecasts(ctx.predictions)?;
    mean_weighted_quantile_loss(ctx.y_true, &quantiles)
}
