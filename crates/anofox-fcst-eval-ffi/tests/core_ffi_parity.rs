//! Core-vs-FFI parity integration tests.
//!
//! Every metric is scored once through the Rust core `Evaluator` and once
//! through the C functions with identical tables. Both must produce
//! bit-identical results since the FFI layer is a thin translation shim.

use std::ffi::{c_char, c_double, CString};

use anofox_fcst_eval::{EvalMetric, Evaluator, EvaluatorOptions, TimeSeriesFrame};
use anofox_fcst_eval_ffi::types::{
    AnofoxError, DataColumn, ErrorCode, EvaluatorHandle, SeriesTable,
};
use anofox_fcst_eval_ffi::{
    anofox_eval_evaluate, anofox_eval_evaluator_free, anofox_eval_evaluator_is_ready,
    anofox_eval_evaluator_new, anofox_eval_save_past_metrics,
    anofox_eval_score_with_saved_past_metrics,
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

const PREDICTION_LENGTH: usize = 2;
const HISTORY: usize = 8;
const EPOCH_2024_MICROS: i64 = 1_704_067_200_000_000;
const DAY_MICROS: i64 = 86_400_000_000;

// ── Fixtures ───────────────────────────────────────────────────────────

const ITEM_A: [f64; HISTORY] = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 8.0, 7.0];
const ITEM_B: [f64; HISTORY] = [10.0, 12.0, 15.0, 11.0, 14.0, 18.0, 16.0, 20.0];
const MEAN_A: [f64; PREDICTION_LENGTH] = [7.5, 8.0];
const MEAN_B: [f64; PREDICTION_LENGTH] = [17.0, 19.0];

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn shifted(values: &[f64], delta: f64) -> Vec<f64> {
    values.iter().map(|v| v + delta).collect()
}

/// Prediction columns as (name, values) stacked over items A then B.
fn prediction_columns(mean: &[f64]) -> Vec<(&'static str, Vec<f64>)> {
    vec![
        ("mean", mean.to_vec()),
        ("0.1", shifted(mean, -1.5)),
        ("0.5", shifted(mean, 0.25)),
        ("0.9", shifted(mean, 2.0)),
    ]
}

fn stacked_mean() -> Vec<f64> {
    MEAN_A.iter().chain(MEAN_B.iter()).copied().collect()
}

fn core_data(len: usize) -> TimeSeriesFrame {
    TimeSeriesFrame::from_regular_series(
        "target",
        start(),
        TimeDelta::days(1),
        &[("A", &ITEM_A[..len]), ("B", &ITEM_B[..len])],
    )
    .unwrap()
}

fn core_predictions(mean: &[f64], first_day: i64) -> TimeSeriesFrame {
    let columns = prediction_columns(mean);
    let (first_name, first_values) = &columns[0];
    let h = PREDICTION_LENGTH;
    let mut frame = TimeSeriesFrame::from_regular_series(
        first_name,
        start() + TimeDelta::days(first_day),
        TimeDelta::days(1),
        &[("A", &first_values[..h]), ("B", &first_values[h..])],
    )
    .unwrap();
    for (name, values) in &columns[1..] {
        frame = frame.with_column(*name, values.clone()).unwrap();
    }
    frame
}

// ── C table builder ────────────────────────────────────────────────────

/// Owns every buffer a [`SeriesTable`] points into.
struct OwnedTable {
    _ids: Vec<CString>,
    id_ptrs: Vec<*const c_char>,
    timestamps: Vec<i64>,
    _names: Vec<CString>,
    _values: Vec<Vec<f64>>,
    _validity: Vec<Vec<u64>>,
    columns: Vec<DataColumn>,
}

impl OwnedTable {
    /// Two items with `len` daily rows each, starting `first_day` days after 2024-01-01.
    fn new(len: usize, first_day: i64, columns: Vec<(&str, Vec<f64>, Option<Vec<u64>>)>) -> Self {
        let ids: Vec<CString> = ["A", "B"]
            .iter()
            .flat_map(|id| std::iter::repeat(CString::new(*id).unwrap()).take(len))
            .collect();
        let id_ptrs = ids.iter().map(|s| s.as_ptr()).collect();
        let timestamps = (0..2)
            .flat_map(|_| {
                (0..len as i64).map(move |d| EPOCH_2024_MICROS + (first_day + d) * DAY_MICROS)
            })
            .collect();

        let names: Vec<CString> = columns
            .iter()
            .map(|(name, _, _)| CString::new(*name).unwrap())
            .collect();
        let mut values = Vec::new();
        let mut validity = Vec::new();
        for (_, v, mask) in columns {
            values.push(v);
            validity.push(mask.unwrap_or_default());
        }
        let data_columns = names
            .iter()
            .zip(values.iter())
            .zip(validity.iter())
            .map(|((name, v), mask)| DataColumn {
                name: name.as_ptr(),
                data: v.as_ptr() as *const c_double,
                validity: if mask.is_empty() {
                    std::ptr::null()
                } else {
                    mask.as_ptr()
                },
            })
            .collect();

        Self {
            _ids: ids,
            id_ptrs,
            timestamps,
            _names: names,
            _values: values,
            _validity: validity,
            columns: data_columns,
        }
    }

    fn data(len: usize) -> Self {
        let target: Vec<f64> = ITEM_A[..len].iter().chain(&ITEM_B[..len]).copied().collect();
        Self::new(len, 0, vec![("target", target, None)])
    }

    fn predictions(mean: &[f64], first_day: i64) -> Self {
        let columns = prediction_columns(mean)
            .into_iter()
            .map(|(name, values)| (name, values, None))
            .collect();
        Self::new(PREDICTION_LENGTH, first_day, columns)
    }

    fn as_table(&self) -> SeriesTable {
        SeriesTable {
            item_ids: self.id_ptrs.as_ptr(),
            timestamps: self.timestamps.as_ptr(),
            length: self.id_ptrs.len(),
            columns: self.columns.as_ptr(),
            n_columns: self.columns.len(),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

fn core_evaluator(metric: EvalMetric) -> Evaluator {
    Evaluator::new(EvaluatorOptions {
        eval_metric: metric,
        prediction_length: PREDICTION_LENGTH,
        ..Default::default()
    })
    .unwrap()
}

fn ffi_evaluator(metric: EvalMetric) -> *mut EvaluatorHandle {
    let name = CString::new(metric.name()).unwrap();
    let mut error = AnofoxError::default();
    let handle = unsafe {
        anofox_eval_evaluator_new(name.as_ptr(), PREDICTION_LENGTH, std::ptr::null(), &mut error)
    };
    assert!(!handle.is_null(), "FFI call failed: {}", error.message_str());
    handle
}

/// Assert two scores are bit-identical (or both NaN).
fn assert_score_eq(metric: EvalMetric, core: f64, ffi: f64) {
    if core.is_nan() && ffi.is_nan() {
        return;
    }
    assert_eq!(
        core.to_bits(),
        ffi.to_bits(),
        "[{metric}] mismatch: core={core} ffi={ffi}"
    );
}

// ── Parity ─────────────────────────────────────────────────────────────

#[test]
fn test_evaluate_parity_all_metrics() {
    let data = core_data(HISTORY);
    let predictions = core_predictions(&stacked_mean(), (HISTORY - PREDICTION_LENGTH) as i64);
    let data_table = OwnedTable::data(HISTORY);
    let pred_table =
        OwnedTable::predictions(&stacked_mean(), (HISTORY - PREDICTION_LENGTH) as i64);

    for metric in EvalMetric::ALL {
        let core = core_evaluator(metric).evaluate(&data, &predictions).unwrap();

        let handle = ffi_evaluator(metric);
        let mut result: c_double = f64::NAN;
        let mut error = AnofoxError::default();
        let ok = unsafe {
            anofox_eval_evaluate(
                handle,
                &data_table.as_table(),
                &pred_table.as_table(),
                &mut result,
                &mut error,
            )
        };
        assert!(ok, "[{metric}] FFI call failed: {}", error.message_str());
        assert!(unsafe { anofox_eval_evaluator_is_ready(handle) });
        unsafe { anofox_eval_evaluator_free(handle) };

        assert!(core.is_finite(), "[{metric}] core score {core}");
        assert_score_eq(metric, core, result);
    }
}

#[test]
fn test_two_phase_parity() {
    let past_len = HISTORY - PREDICTION_LENGTH;
    let future = core_data(HISTORY).slice_by_timestep(Some(-(PREDICTION_LENGTH as isize)), None);
    let predictions = core_predictions(&stacked_mean(), past_len as i64);

    let mut core = core_evaluator(EvalMetric::Mase);
    core.save_past_metrics(&core_data(past_len)).unwrap();
    let expected = core
        .score_with_saved_past_metrics(&future, &predictions)
        .unwrap();

    let future_target: Vec<f64> = ITEM_A[past_len..]
        .iter()
        .chain(&ITEM_B[past_len..])
        .copied()
        .collect();
    let past_table = OwnedTable::data(past_len);
    let future_table = OwnedTable::new(
        PREDICTION_LENGTH,
        past_len as i64,
        vec![("target", future_target, None)],
    );
    let pred_table = OwnedTable::predictions(&stacked_mean(), past_len as i64);

    let handle = ffi_evaluator(EvalMetric::Mase);
    let mut error = AnofoxError::default();
    let mut result: c_double = 0.0;
    unsafe {
        assert!(anofox_eval_save_past_metrics(
            handle,
            &past_table.as_table(),
            &mut error
        ));
        assert!(anofox_eval_score_with_saved_past_metrics(
            handle,
            &future_table.as_table(),
            &pred_table.as_table(),
            &mut result,
            &mut error,
        ));
        anofox_eval_evaluator_free(handle);
    }

    assert_score_eq(EvalMetric::Mase, expected, result);
}

#[test]
fn test_null_prediction_entries_match_nan() {
    let offset = (HISTORY - PREDICTION_LENGTH) as i64;
    let mut mean = stacked_mean();
    let data = core_data(HISTORY);

    // Row 1 (item A, second step) is NULL on the C side.
    let validity = vec![!0b10u64];
    let table_columns = vec![("mean", mean.clone(), Some(validity))];
    mean[1] = f64::NAN;
    let predictions = TimeSeriesFrame::from_regular_series(
        "mean",
        start() + TimeDelta::days(offset),
        TimeDelta::days(1),
        &[("A", &mean[..2]), ("B", &mean[2..])],
    )
    .unwrap();

    let expected = core_evaluator(EvalMetric::Mse)
        .evaluate(&data, &predictions)
        .unwrap();

    let data_table = OwnedTable::data(HISTORY);
    let pred_table = OwnedTable::new(PREDICTION_LENGTH, offset, table_columns);
    let handle = ffi_evaluator(EvalMetric::Mse);
    let mut error = AnofoxError::default();
    let mut result: c_double = 0.0;
    let ok = unsafe {
        anofox_eval_evaluate(
            handle,
            &data_table.as_table(),
            &pred_table.as_table(),
            &mut result,
            &mut error,
        )
    };
    unsafe { anofox_eval_evaluator_free(handle) };

    assert!(ok, "FFI call failed: {}", error.message_str());
    assert_score_eq(EvalMetric::Mse, expected, result);
}

// ── Error reporting ────────────────────────────────────────────────────

#[test]
fn test_score_before_save_reports_missing_past_metrics() {
    let offset = (HISTORY - PREDICTION_LENGTH) as i64;
    let future_table = OwnedTable::new(
        PREDICTION_LENGTH,
        offset,
        vec![("target", vec![7.0, 8.0, 16.0, 20.0], None)],
    );
    let pred_table = OwnedTable::predictions(&stacked_mean(), offset);

    let handle = ffi_evaluator(EvalMetric::Mase);
    let mut error = AnofoxError::default();
    let mut result: c_double = 0.0;
    let ok = unsafe {
        anofox_eval_score_with_saved_past_metrics(
            handle,
            &future_table.as_table(),
            &pred_table.as_table(),
            &mut result,
            &mut error,
        )
    };
    unsafe { anofox_eval_evaluator_free(handle) };

    assert!(!ok);
    assert_eq!(error.code, ErrorCode::PastMetricsMissing);
}

#[test]
fn test_misaligned_predictions_report_index_mismatch() {
    let data_table = OwnedTable::data(HISTORY);
    // One day too early.
    let pred_table =
        OwnedTable::predictions(&stacked_mean(), (HISTORY - PREDICTION_LENGTH) as i64 - 1);

    let handle = ffi_evaluator(EvalMetric::Mape);
    let mut error = AnofoxError::default();
    let mut result: c_double = 0.0;
    let ok = unsafe {
        anofox_eval_evaluate(
            handle,
            &data_table.as_table(),
            &pred_table.as_table(),
            &mut result,
            &mut error,
        )
    };
    unsafe { anofox_eval_evaluator_free(handle) };

    assert!(!ok);
    assert_eq!(error.code, ErrorCode::IndexMismatch);
}

#[test]
fn test_null_table_reports_null_pointer() {
    let handle = ffi_evaluator(EvalMetric::Mse);
    let mut error = AnofoxError::default();
    let ok = unsafe { anofox_eval_save_past_metrics(handle, std::ptr::null(), &mut error) };
    unsafe { anofox_eval_evaluator_free(handle) };

    assert!(!ok);
    assert_eq!(error.code, ErrorCode::NullPointer);
}
