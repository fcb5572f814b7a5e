//! FFI boundary layer for the anofox forecast evaluator.
//!
//! This crate exposes C-compatible functions around
//! [`anofox_fcst_eval::Evaluator`] so a host engine can score forecasts
//! through an opaque handle.

pub mod allocation;
pub mod conversion;
pub mod error_handling;
pub mod types;

use anofox_fcst_eval::{check_get_evaluation_metric, EvalError, EvalMetric, Evaluator};
use core::ffi::c_void;
use libc::{c_char, c_double, c_int, size_t};
use std::ptr;

use conversion::{c_str_to_option, copy_string_to_buffer, series_table_to_frame};
use error_handling::{ffi_bool, ffi_try, require_non_null};

pub use types::*;

/// Resolve a nullable handle pointer into a reference.
unsafe fn handle_ref<'a>(handle: *const EvaluatorHandle) -> Result<&'a EvaluatorHandle, EvalError> {
    handle
        .as_ref()
        .ok_or_else(|| EvalError::InvalidInput("Null evaluator handle".to_string()))
}

// ============================================================================
// Evaluator Lifecycle
// ============================================================================

/// Create an evaluator.
///
/// A null `metric` selects the default metric, a null `target_column`
/// selects "target". Unknown metric names are rejected.
///
/// # Safety
/// String arguments must be null or valid null-terminated strings.
/// Returns null on error; the handle must be released with
/// [`anofox_eval_evaluator_free`].
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_evaluator_new(
    metric: *const c_char,
    prediction_length: size_t,
    target_column: *const c_char,
    out_error: *mut AnofoxError,
) -> *mut EvaluatorHandle {
    let handle = ffi_try(out_error, || {
        let eval_metric = check_get_evaluation_metric(c_str_to_option(metric)?, true)?;
        let target =
            c_str_to_option(target_column)?.unwrap_or(anofox_fcst_eval::DEFAULT_TARGET_COLUMN);
        let inner = Evaluator::new(anofox_fcst_eval::EvaluatorOptions {
            eval_metric,
            prediction_length,
            target_column: target.to_string(),
        })?;
        Ok(Box::new(EvaluatorHandle { inner }))
    });

    match handle {
        Some(boxed) => Box::into_raw(boxed),
        None => ptr::null_mut(),
    }
}

/// Release an evaluator.
///
/// # Safety
/// The handle must be null or come from [`anofox_eval_evaluator_new`] and not
/// have been freed already.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_evaluator_free(handle: *mut EvaluatorHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Whether past metrics have been saved on this evaluator.
///
/// # Safety
/// The handle must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_evaluator_is_ready(handle: *const EvaluatorHandle) -> bool {
    handle.as_ref().is_some_and(|h| h.inner.is_ready())
}

// ============================================================================
// Scoring
// ============================================================================

/// Cache historical statistics from the past portion of the data.
///
/// # Safety
/// `handle` and `data_past` must be valid; the table must satisfy the
/// [`SeriesTable`] layout contract.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_save_past_metrics(
    handle: *mut EvaluatorHandle,
    data_past: *const SeriesTable,
    out_error: *mut AnofoxError,
) -> bool {
    if !require_non_null(out_error, &[handle as *const c_void, data_past as *const c_void]) {
        return false;
    }

    ffi_bool(out_error, || {
        let frame = series_table_to_frame(&*data_past)?;
        (*handle).inner.save_past_metrics(&frame)
    })
}

/// Score predictions against the future portion using cached past metrics.
///
/// # Safety
/// All pointer arguments must be valid and non-null.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_score_with_saved_past_metrics(
    handle: *const EvaluatorHandle,
    data_future: *const SeriesTable,
    predictions: *const SeriesTable,
    out_result: *mut c_double,
    out_error: *mut AnofoxError,
) -> bool {
    if !require_non_null(
        out_error,
        &[
            handle as *const c_void,
            data_future as *const c_void,
            predictions as *const c_void,
            out_result as *const c_void,
        ],
    ) {
        return false;
    }

    let score = ffi_try(out_error, || {
        let evaluator = &handle_ref(handle)?.inner;
        let future = series_table_to_frame(&*data_future)?;
        let predictions = series_table_to_frame(&*predictions)?;
        evaluator.score_with_saved_past_metrics(&future, &predictions)
    });

    match score {
        Some(value) => {
            *out_result = value;
            true
        }
        None => false,
    }
}

/// Save past metrics from `data` and score `predictions` in one call.
///
/// # Safety
/// All pointer arguments must be valid and non-null.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_evaluate(
    handle: *mut EvaluatorHandle,
    data: *const SeriesTable,
    predictions: *const SeriesTable,
    out_result: *mut c_double,
    out_error: *mut AnofoxError,
) -> bool {
    if !require_non_null(
        out_error,
        &[
            handle as *const c_void,
            data as *const c_void,
            predictions as *const c_void,
            out_result as *const c_void,
        ],
    ) {
        return false;
    }

    let score = ffi_try(out_error, || {
        let data = series_table_to_frame(&*data)?;
        let predictions = series_table_to_frame(&*predictions)?;
        (*handle).inner.evaluate(&data, &predictions)
    });

    match score {
        Some(value) => {
            *out_result = value;
            true
        }
        None => false,
    }
}

// ============================================================================
// Metric Registry
// ============================================================================

/// Resolve a metric name into its canonical name.
///
/// A null or empty `name` resolves to the default metric. Unknown names fail with
/// `InvalidMetric` when `raise` is set and resolve to the default otherwise.
/// `out_name` receives the null-terminated canonical name, truncated to
/// `out_name_len` bytes; it may be null when only validation is needed.
///
/// # Safety
/// `name` must be null or a valid string; `out_name` must be null or valid
/// for `out_name_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_check_metric(
    name: *const c_char,
    raise: bool,
    out_name: *mut c_char,
    out_name_len: size_t,
    out_error: *mut AnofoxError,
) -> bool {
    let metric = ffi_try(out_error, || {
        check_get_evaluation_metric(c_str_to_option(name)?, raise)
    });

    match metric {
        Some(metric) => {
            if !out_name.is_null() && out_name_len > 0 {
                let buffer = std::slice::from_raw_parts_mut(out_name, out_name_len);
                copy_string_to_buffer(metric.name(), buffer);
            }
            true
        }
        None => false,
    }
}

/// Sign multiplier turning the named metric's raw score into a
/// higher-is-better score.
///
/// # Safety
/// `name` must be a valid string and `out_coefficient` a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_metric_coefficient(
    name: *const c_char,
    out_coefficient: *mut c_int,
    out_error: *mut AnofoxError,
) -> bool {
    if !require_non_null(out_error, &[name as *const c_void, out_coefficient as *const c_void]) {
        return false;
    }

    let coefficient = ffi_try(out_error, || {
        let metric: EvalMetric = c_str_to_option(name)?.unwrap_or_default().parse()?;
        Ok(metric.coefficient())
    });

    match coefficient {
        Some(value) => {
            *out_coefficient = value as c_int;
            true
        }
        None => false,
    }
}

/// List the registered metric names.
///
/// # Safety
/// Output pointers must be valid. Free the array with
/// [`anofox_eval_free_string_array`].
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_list_metrics(
    out_names: *mut *mut *mut c_char,
    out_count: *mut size_t,
) -> bool {
    if out_names.is_null() || out_count.is_null() {
        return false;
    }

    let names = anofox_fcst_eval::list_metrics();
    let names_ref: Vec<&str> = names.iter().map(String::as_str).collect();

    if !allocation::alloc_string_array(&names_ref, out_names) {
        *out_count = 0;
        return false;
    }
    *out_count = names.len();
    true
}

/// Free a string array returned by [`anofox_eval_list_metrics`].
///
/// # Safety
/// The array must be null or come from this library with `count` entries.
#[no_mangle]
pub unsafe extern "C" fn anofox_eval_free_string_array(array: *mut *mut c_char, count: size_t) {
    allocation::free_string_array(array, count);
}

// ============================================================================
// Version
// ============================================================================

#[no_mangle]
pub extern "C" fn anofox_eval_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}
