//! Error reporting shared by the `anofox_eval_*` entry points.
//!
//! Every entry point writes its outcome to an optional `AnofoxError` out
//! parameter: success is written first, then overwritten by the first
//! failure, whether a null argument, an [`EvalError`] or a caught panic.

use crate::types::{AnofoxError, ErrorCode};
use anofox_fcst_eval::EvalError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Reset the error output to success. A null `out_error` is ignored.
///
/// # Safety
/// `out_error` must be null or valid for writes.
#[inline]
pub unsafe fn clear_error(out_error: *mut AnofoxError) {
    if let Some(error) = out_error.as_mut() {
        *error = AnofoxError::success();
    }
}

/// Record a failure in the error output. A null `out_error` is ignored.
///
/// # Safety
/// `out_error` must be null or valid for writes.
#[inline]
pub unsafe fn report_error(out_error: *mut AnofoxError, code: ErrorCode, message: &str) {
    if let Some(error) = out_error.as_mut() {
        error.set_error(code, message);
    }
}

/// Clear the error output, then report `NullPointer` if any argument is null.
///
/// Returns `true` when every argument is non-null.
///
/// # Safety
/// `out_error` must be null or valid for writes.
pub unsafe fn require_non_null(
    out_error: *mut AnofoxError,
    args: &[*const core::ffi::c_void],
) -> bool {
    clear_error(out_error);
    match args.iter().position(|p| p.is_null()) {
        Some(index) => {
            report_error(
                out_error,
                ErrorCode::NullPointer,
                &format!("Null pointer argument at position {}", index),
            );
            false
        }
        None => true,
    }
}

/// Run an entry point body, translating its error or panic for C.
///
/// Returns `Some(value)` on success and `None` once the failure has been
/// written to `out_error`.
///
/// # Safety
/// `out_error` must be null or valid for writes.
pub unsafe fn ffi_try<F, T>(out_error: *mut AnofoxError, body: F) -> Option<T>
where
    F: FnOnce() -> Result<T, EvalError>,
{
    clear_error(out_error);

    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            report_error(out_error, ErrorCode::from(&err), &err.to_string());
            None
        }
        Err(_) => {
            report_error(out_error, ErrorCode::PanicCaught, "Panic in Rust code");
            None
        }
    }
}

/// [`ffi_try`] for bodies without a result value.
///
/// # Safety
/// `out_error` must be null or valid for writes.
pub unsafe fn ffi_bool<F>(out_error: *mut AnofoxError, body: F) -> bool
where
    F: FnOnce() -> Result<(), EvalError>,
{
    ffi_try(out_error, body).is_some()
}
