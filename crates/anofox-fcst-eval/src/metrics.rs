//! Forecast accuracy metrics over multi-series data.
//!
//! Per-item functions take the stacked ground truth and prediction columns of a
//! [`TimeSeriesFrame`](crate::frame::TimeSeriesFrame) together with its item
//! grouping, and return one value per item in table order. Items are never
//! reordered or merged.
//!
//! Within an item, `NaN` terms are skipped when averaging while infinities are
//! kept. An item whose terms are all `NaN` yields `NaN`. Division by zero is
//! left to IEEE semantics; [`safe_mean`] is where non-finite values are dropped.
//!
//! | Function | Per-item value |
//! |----------|----------------|
//! | [`mse_per_item`] | mean (y - ŷ)² |
//! | [`mae_per_item`] | mean \|y - ŷ\| |
//! | [`mape_per_item`] | mean \|(y - ŷ) / y\| |
//! | [`symmetric_mape_per_item`] | mean 2\|y - ŷ\| / (\|y\| + \|ŷ\|) |
//! | [`in_sample_naive_1_error`] | mean \|x_t - x_{t-1}\| |

use statrs::statistics::Statistics;

use crate::error::{EvalError, Result};
use crate::frame::ItemSpan;

/// Calculates Mean Squared Error for each item.
///
/// # Formula
/// MSE_i = mean_t (y_t - ŷ_t)²
pub fn mse_per_item(y_true: &[f64], y_pred: &[f64], spans: &[ItemSpan]) -> Result<Vec<f64>> {
    per_item(y_true, y_pred, spans, |y, p| (y - p).powi(2))
}

/// Calculates Mean Absolute Error for each item.
///
/// # Formula
/// MAE_i = mean_t |y_t - ŷ_t|
pub fn mae_per_item(y_true: &[f64], y_pred: &[f64], spans: &[ItemSpan]) -> Result<Vec<f64>> {
    per_item(y_true, y_pred, spans, |y, p| (y - p).abs())
}

/// Calculates Mean Absolute Percentage Error for each item.
///
/// Zero ground truth yields `inf` (or `NaN` when the prediction is also zero).
/// The result is a fraction, not a percentage.
///
/// # Formula
/// MAPE_i = mean_t |(y_t - ŷ_t) / y_t|
pub fn mape_per_item(y_true: &[f64], y_pred: &[f64], spans: &[ItemSpan]) -> Result<Vec<f64>> {
    per_item(y_true, y_pred, spans, |y, p| ((y - p) / y).abs())
}

/// Calculates symmetric Mean Absolute Percentage Error for each item.
///
/// Values range from 0 to 2. A row where both truth and prediction are zero
/// is `NaN`.
///
/// # Formula
/// sMAPE_i = mean_t 2|y_t - ŷ_t| / (|y_t| + |ŷ_t|)
pub fn symmetric_mape_per_item(
    y_true: &[f64],
    y_pred: &[f64],
    spans: &[ItemSpan],
) -> Result<Vec<f64>> {
    per_item(y_true, y_pred, spans, |y, p| {
        2.0 * (y - p).abs() / (y.abs() + p.abs())
    })
}

/// In-sample error of the naive forecast (repeat the previous value), per item.
///
/// The first difference of every item is undefined, so values of one item
/// never leak into the next. An item with a single observation yields `NaN`.
///
/// # Formula
/// naive_1_i = mean_{t ≥ 1} |x_t - x_{t-1}|
pub fn in_sample_naive_1_error(y_past: &[f64], spans: &[ItemSpan]) -> Result<Vec<f64>> {
    validate_spans(y_past.len(), spans)?;

    let mut diffs = vec![f64::NAN; y_past.len()];
    for span in spans {
        for t in span.start + 1..span.start + span.len {
            diffs[t] = (y_past[t] - y_past[t - 1]).abs();
        }
    }
    Ok(group_mean(&diffs, spans))
}

/// Mean weighted quantile loss across all items jointly.
///
/// `quantile_forecasts` holds one `(level, predictions)` pair per quantile.
/// Pinball losses are summed over all rows of every item and normalized by
/// the total absolute ground truth, so large-scale items weigh more. This is
/// not a mean of per-item ratios.
///
/// Returns `NaN` when there are no quantile forecasts. Zero total ground truth
/// yields `NaN` or `inf`.
///
/// # Formula
/// wQL = 2 · mean_q [ Σ_t |(y_t - ŷ_{q,t}) · (1[y_t ≤ ŷ_{q,t}] - q)| / Σ_t |y_t| ]
pub fn mean_weighted_quantile_loss(
    y_true: &[f64],
    quantile_forecasts: &[(f64, &[f64])],
) -> Result<f64> {
    for (q, forecast) in quantile_forecasts {
        if !(0.0..=1.0).contains(q) {
            return Err(EvalError::InvalidInput(format!(
                "Quantile level must be between 0 and 1, got {}",
                q
            )));
        }
        validate_lengths(y_true, forecast)?;
    }
    if quantile_forecasts.is_empty() {
        return Ok(f64::NAN);
    }

    let abs_target_sum: f64 = y_true.iter().map(|y| y.abs()).sum();

    let weighted_losses = quantile_forecasts.iter().map(|(q, forecast)| {
        let loss: f64 = y_true
            .iter()
            .zip(forecast.iter())
            .map(|(&y, &p)| {
                let indicator = if y <= p { 1.0 } else { 0.0 };
                ((y - p) * (indicator - q)).abs()
            })
            .sum();
        loss / abs_target_sum
    });

    Ok(2.0 * weighted_losses.mean())
}

/// Mean of the finite values, `NaN` if there are none.
pub fn safe_mean(values: &[f64]) -> f64 {
    values.iter().filter(|v| v.is_finite()).mean()
}

fn per_item<F>(y_true: &[f64], y_pred: &[f64], spans: &[ItemSpan], error: F) -> Result<Vec<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    validate_lengths(y_true, y_pred)?;
    validate_spans(y_true.len(), spans)?;

    let errors: Vec<f64> = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&y, &p)| error(y, p))
        .collect();
    Ok(group_mean(&errors, spans))
}

/// Mean of each item's values, skipping `NaN`.
fn group_mean(values: &[f64], spans: &[ItemSpan]) -> Vec<f64> {
    spans
        .iter()
        .map(|span| {
            let (sum, count) = values[span.range()]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

fn validate_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(EvalError::InvalidInput(format!(
            "Ground truth and prediction arrays must have the same length: {} vs {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

fn validate_spans(n_rows: usize, spans: &[ItemSpan]) -> Result<()> {
    let mut expected_start = 0;
    for span in spans {
        if span.start != expected_start {
            return Err(EvalError::InvalidInput(format!(
                "Item '{}' starts at row {} but row {} was expected",
                span.item_id, span.start, expected_start
            )));
        }
        expected_start += span.len;
    }
    if expected_start != n_rows {
        return Err(EvalError::InvalidInput(format!(
            "Item grouping covers {} rows but the data has {}",
            expected_start, n_rows
        )));
    }
    Ok(())
}
