//! Memory allocation utilities for FFI functions.
//!
//! Strings handed to C are allocated with `malloc` so the caller can release
//! them through the matching free function.

use core::ffi::c_char;
use std::ptr;

// Memory allocation - use libc on native, std::alloc on WASM
#[cfg(not(target_family = "wasm"))]
use libc::{free, malloc};

// Each WASM block starts with an 8-byte header holding its total layout size.
#[cfg(target_family = "wasm")]
const WASM_HEADER: usize = 8;

#[cfg(target_family = "wasm")]
unsafe fn malloc(size: usize) -> *mut core::ffi::c_void {
    use std::alloc::{alloc, Layout};
    let Some(total) = size.checked_add(WASM_HEADER) else {
        return ptr::null_mut();
    };
    let Ok(layout) = Layout::from_size_align(total, 8) else {
        return ptr::null_mut();
    };
    let base = alloc(layout);
    if base.is_null() {
        return ptr::null_mut();
    }
    (base as *mut usize).write(total);
    base.add(WASM_HEADER) as *mut core::ffi::c_void
}

#[cfg(target_family = "wasm")]
unsafe fn free(ptr: *mut core::ffi::c_void) {
    use std::alloc::{dealloc, Layout};
    if ptr.is_null() {
        return;
    }
    let base = (ptr as *mut u8).sub(WASM_HEADER);
    let total = (base as *const usize).read();
    if let Ok(layout) = Layout::from_size_align(total, 8) {
        dealloc(base, layout);
    }
}

/// Allocate and copy a string array.
///
/// # Safety
/// out_array must be a valid pointer.
/// Returns true on success, false on allocation failure.
pub unsafe fn alloc_string_array(strings: &[&str], out_array: *mut *mut *mut c_char) -> bool {
    let n = strings.len();
    if n == 0 {
        *out_array = ptr::null_mut();
        return true;
    }

    let array_ptr = malloc(n * std::mem::size_of::<*mut c_char>()) as *mut *mut c_char;
    if array_ptr.is_null() {
        return false;
    }

    for (i, s) in strings.iter().enumerate() {
        let str_ptr = malloc(s.len() + 1) as *mut c_char;
        if str_ptr.is_null() {
            // Clean up already allocated strings
            free_string_array(array_ptr, i);
            return false;
        }
        ptr::copy_nonoverlapping(s.as_ptr() as *const c_char, str_ptr, s.len());
        *str_ptr.add(s.len()) = 0;
        *array_ptr.add(i) = str_ptr;
    }

    *out_array = array_ptr;
    true
}

/// Free the first `count` strings of an array and the array itself.
///
/// # Safety
/// The array must be null or come from [`alloc_string_array`] with at least
/// `count` initialized entries.
pub unsafe fn free_string_array(array: *mut *mut c_char, count: usize) {
    if array.is_null() {
        return;
    }
    for i in 0..count {
        free_ptr(*array.add(i) as *mut core::ffi::c_void);
    }
    free_ptr(array as *mut core::ffi::c_void);
}

/// Free a C pointer using platform-appropriate free function.
///
/// # Safety
/// ptr must be either null or a valid pointer allocated by malloc.
#[inline]
pub unsafe fn free_ptr(ptr: *mut core::ffi::c_void) {
    if !ptr.is_null() {
        free(ptr);
    }
}
