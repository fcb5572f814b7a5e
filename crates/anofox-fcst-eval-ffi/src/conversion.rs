//! Conversion utilities for FFI functions.
//!
//! This module converts C strings, nullable arrays and [`SeriesTable`]s into
//! their Rust counterparts.

use core::ffi::{c_char, c_double};
use std::ffi::CStr;

use anofox_fcst_eval::{EvalError, TimeSeriesFrame};
use chrono::NaiveDateTime;

use crate::types::{DataColumn, SeriesTable};

/// Convert a C string pointer to an optional `&str`. Null maps to `None`.
///
/// # Safety
/// The pointer must be null or point to a valid null-terminated string.
pub unsafe fn c_str_to_option<'a>(ptr: *const c_char) -> Result<Option<&'a str>, EvalError> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(Some)
        .map_err(|_| EvalError::InvalidInput("String is not valid UTF-8".to_string()))
}

/// Copy a string to a fixed-size char buffer, truncating if needed.
pub fn copy_string_to_buffer(s: &str, buffer: &mut [c_char]) {
    if buffer.is_empty() {
        return;
    }
    let bytes = s.as_bytes();
    let len = bytes.len().min(buffer.len() - 1);
    for (i, &b) in bytes[..len].iter().enumerate() {
        buffer[i] = b as c_char;
    }
    buffer[len] = 0;
}

/// Convert microseconds since epoch to NaiveDateTime.
///
/// Values outside chrono's representable range are rejected.
pub fn micros_to_datetime(micros: i64) -> Result<NaiveDateTime, EvalError> {
    chrono::DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| EvalError::InvalidInput(format!("Timestamp {} is out of range", micros)))
}

/// Borrow `len` elements from a raw pointer. A zero length never dereferences.
///
/// # Safety
/// For `len > 0` the pointer must be non-null and valid for `len` reads.
unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

/// Build a Vec<f64> from raw pointers, treating NULLs as NaN.
///
/// # Safety
/// `data` must be valid for `length` reads; `validity` must be null or valid
/// for `length.div_ceil(64)` words.
pub unsafe fn build_values(data: *const c_double, validity: *const u64, length: usize) -> Vec<f64> {
    let data_slice = raw_slice(data, length);

    if validity.is_null() {
        data_slice.to_vec()
    } else {
        let validity_slice = raw_slice(validity, length.div_ceil(64));

        (0..length)
            .map(|i| {
                let word = validity_slice[i / 64];
                let is_valid = (word >> (i % 64)) & 1 == 1;
                if is_valid {
                    data_slice[i]
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}

/// Convert a [`SeriesTable`] into a [`TimeSeriesFrame`].
///
/// # Safety
/// All non-null pointers in `table` must be valid for `table.length` rows and
/// `table.n_columns` columns.
pub unsafe fn series_table_to_frame(table: &SeriesTable) -> Result<TimeSeriesFrame, EvalError> {
    let n = table.length;
    if n > 0 && (table.item_ids.is_null() || table.timestamps.is_null()) {
        return Err(EvalError::InvalidInput(
            "Table index pointers must not be null".to_string(),
        ));
    }
    if table.n_columns > 0 && table.columns.is_null() {
        return Err(EvalError::InvalidInput(
            "Table column pointer must not be null".to_string(),
        ));
    }

    let item_ids = raw_slice(table.item_ids, n)
        .iter()
        .enumerate()
        .map(|(row, &ptr)| {
            c_str_to_option(ptr)?
                .map(str::to_string)
                .ok_or_else(|| EvalError::InvalidInput(format!("Null item id at row {}", row)))
        })
        .collect::<Result<Vec<String>, EvalError>>()?;

    let timestamps = raw_slice(table.timestamps, n)
        .iter()
        .map(|&micros| micros_to_datetime(micros))
        .collect::<Result<Vec<NaiveDateTime>, EvalError>>()?;

    let mut frame = TimeSeriesFrame::new(item_ids, timestamps)?;
    for column in raw_slice(table.columns, table.n_columns) {
        frame = add_column(frame, column, n)?;
    }
    Ok(frame)
}

unsafe fn add_column(
    frame: TimeSeriesFrame,
    column: &DataColumn,
    length: usize,
) -> Result<TimeSeriesFrame, EvalError> {
    let name = c_str_to_option(column.name)?
        .ok_or_else(|| EvalError::InvalidInput("Null column name".to_string()))?;
    if length > 0 && column.data.is_null() {
        return Err(EvalError::InvalidInput(format!(
            "Null data pointer for column '{}'",
            name
        )));
    }
    let values = build_values(column.data, column.validity, length);
    frame.with_column(name, values)
}
