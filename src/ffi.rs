//! FFI bindings for Session Lens
//!
//! This module provides C-compatible functions for calling Session Lens from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `lens_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalyzerConfig;
use crate::pipeline::{events_to_report, ReplayProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a recorded event log (JSON array or NDJSON) and return report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lens_free_string`.
/// - Returns NULL on error; call `lens_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lens_events_to_report(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match events_to_report(&json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a ReplayProcessor
pub struct LensProcessorHandle {
    processor: ReplayProcessor,
}

/// Create a new processor. `config_json` may be NULL for default thresholds.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `lens_processor_free`.
/// - Returns NULL on an invalid configuration.
#[no_mangle]
pub unsafe extern "C" fn lens_processor_new(config_json: *const c_char) -> *mut LensProcessorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        AnalyzerConfig::default()
    } else {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match AnalyzerConfig::from_json(&json_str) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(LensProcessorHandle {
        processor: ReplayProcessor::with_config(config),
    });
    Box::into_raw(handle)
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `lens_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lens_processor_free(processor: *mut LensProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Push a chunk of recorded events into a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `lens_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns the number of events accepted, or -1 on error.
#[no_mangle]
pub unsafe extern "C" fn lens_processor_push(
    processor: *mut LensProcessorHandle,
    json: *const c_char,
) -> i64 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.processor.push_json(&json_str) {
        Ok(count) => i64::try_from(count).unwrap_or(i64::MAX),
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Finalize the events pushed so far and return report JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `lens_processor_new`.
/// - Returns a newly allocated string that must be freed with `lens_free_string`.
/// - Returns NULL on error; call `lens_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lens_processor_finish(processor: *mut LensProcessorHandle) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    match handle.processor.finish_report() {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// HTML of the processor's current reconstructed DOM.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `lens_processor_new`.
/// - Returns a newly allocated string that must be freed with `lens_free_string`.
#[no_mangle]
pub unsafe extern "C" fn lens_processor_dom_html(processor: *mut LensProcessorHandle) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    string_to_cstr(&handle.processor.dom_html())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Session Lens functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Session Lens function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lens_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Session Lens call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn lens_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn lens_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
