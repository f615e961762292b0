//! FFI bindings for Volume Manager.
//!
//! This crate provides C ABI functions so a native front-end (tray icon,
//! settings window) can drive the engine. All functions use
//! panic::catch_unwind to prevent Rust panics from unwinding across the FFI
//! boundary. Structured results cross the boundary as UTF-8 JSON.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic;
use std::ptr;
use volume_manager_rs::{
    init_logging, start, AudioError, EngineSnapshot, Service, Settings, Transition,
};

// ============================================================================
// Error Handling
// ============================================================================

/// Error codes returned by FFI functions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    /// The request changed nothing (blank or duplicate add, untracked remove)
    Ignored = 1,
    InvalidHandle = -1,
    InvalidArgument = -2,
    DeviceNotFound = -3,
    OsError = -4,
    JsonError = -5,
    StartupFailed = -6,
    Panic = -99,
}

impl From<&AudioError> for ErrorCode {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::NoDefaultDevice => ErrorCode::DeviceNotFound,
            AudioError::StringConversion(_) => ErrorCode::InvalidArgument,
            _ => ErrorCode::OsError,
        }
    }
}

/// Thread-local storage for the last error.
thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(code: ErrorCode, message: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((code, message.into()));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

// ============================================================================
// Data Types for JSON Serialization
// ============================================================================

/// Attached devices that are not tracked yet.
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailableDevicesResponse {
    pub devices: Vec<String>,
}

/// Result of a per-device volume step.
#[derive(Debug, Serialize, Deserialize)]
pub struct VolumeStepResult {
    pub name: String,
    pub volume_level: f32,
    pub volume_percent: u8,
}

/// Transitions produced by an explicit refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub transitions: Vec<Transition>,
}

// ============================================================================
// Engine Handle Type
// ============================================================================

/// Opaque handle to the volume engine. Actually points to a VolumeEngine struct.
pub type VolumeEngineHandle = *mut c_void;

/// Internal engine state: the running service and its monitor thread.
struct VolumeEngine {
    service: Service,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Allocate a C string from a Rust string. Caller must free with volume_engine_free_string.
fn alloc_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // Interior NUL: hand back an empty string instead
        Err(_) => CString::default().into_raw(),
    }
}

/// Parse a C string to a Rust string slice.
unsafe fn parse_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Borrow the engine behind a handle.
unsafe fn engine_ref<'a>(handle: VolumeEngineHandle) -> Option<&'a VolumeEngine> {
    (handle as *const VolumeEngine).as_ref()
}

/// Serialize `value`, recording a JSON error on failure.
fn to_json_c_string<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => alloc_c_string(&json),
        Err(e) => {
            set_last_error(ErrorCode::JsonError, e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// FFI Functions - Lifecycle
// ============================================================================

/// Create and start a volume engine.
///
/// # Arguments
/// * `config_json` - JSON settings object (can be null for defaults). Keys:
///   `poll_interval_secs`, `log_capacity`, `query_timeout_ms`,
///   `preferences_path`, `log_level`. Missing keys take their defaults.
///
/// # Returns
/// Handle to the engine, or null on failure. Check volume_engine_last_error_code() on failure.
///
/// # Safety
/// The returned handle must be freed with volume_engine_destroy().
#[no_mangle]
pub extern "C" fn volume_engine_create(config_json: *const c_char) -> VolumeEngineHandle {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let settings = if config_json.is_null() {
            Settings::default()
        } else {
            let Some(json_str) = (unsafe { parse_c_str(config_json) }) else {
                set_last_error(ErrorCode::InvalidArgument, "Config is not valid UTF-8");
                return ptr::null_mut();
            };
            match serde_json::from_str::<Settings>(json_str) {
                Ok(settings) => settings,
                Err(e) => {
                    set_last_error(ErrorCode::JsonError, e.to_string());
                    return ptr::null_mut();
                }
            }
        };

        init_logging(&settings.log_level);

        match start(&settings) {
            Ok(service) => {
                let engine = Box::new(VolumeEngine { service });
                Box::into_raw(engine) as VolumeEngineHandle
            }
            Err(e) => {
                set_last_error(ErrorCode::StartupFailed, format!("{e:#}"));
                ptr::null_mut()
            }
        }
    });

    match result {
        Ok(handle) => handle,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during engine creation");
            ptr::null_mut()
        }
    }
}

/// Stop and destroy a volume engine instance.
///
/// Blocks until the monitor thread has finished its current cycle.
///
/// # Safety
/// The handle must have been created by volume_engine_create() and must not be used after this call.
#[no_mangle]
pub extern "C" fn volume_engine_destroy(handle: VolumeEngineHandle) {
    if handle.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| {
        let engine = unsafe { Box::from_raw(handle as *mut VolumeEngine) };
        engine.service.stop();
        if let Err(e) = engine.service.wait() {
            tracing::warn!(error = %e, "monitor did not shut down cleanly");
        }
    });
}

// ============================================================================
// FFI Functions - Queries
// ============================================================================

/// Get the tracked devices, their connection state and levels, and the
/// activity log.
///
/// # Returns
/// JSON string containing the snapshot. Caller must free with volume_engine_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn volume_engine_snapshot(handle: VolumeEngineHandle) -> *mut c_char {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            set_last_error(ErrorCode::InvalidHandle, "Invalid engine handle");
            return ptr::null_mut();
        };
        let snapshot: EngineSnapshot = engine.service.engine().snapshot();
        to_json_c_string(&snapshot)
    });

    match result {
        Ok(json) => json,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during snapshot");
            ptr::null_mut()
        }
    }
}

/// Get attached output devices that are not tracked.
///
/// # Returns
/// JSON string `{"devices": [...]}`. Caller must free with volume_engine_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn volume_engine_available_devices(handle: VolumeEngineHandle) -> *mut c_char {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            set_last_error(ErrorCode::InvalidHandle, "Invalid engine handle");
            return ptr::null_mut();
        };
        match engine.service.engine().available_devices() {
            Ok(devices) => to_json_c_string(&AvailableDevicesResponse { devices }),
            Err(e) => {
                set_last_error(ErrorCode::from(&e), e.to_string());
                ptr::null_mut()
            }
        }
    });

    match result {
        Ok(json) => json,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during device enumeration");
            ptr::null_mut()
        }
    }
}

/// Evaluate the attached devices now instead of waiting for the monitor.
///
/// # Returns
/// JSON string `{"transitions": [...]}`. Caller must free with volume_engine_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn volume_engine_refresh(handle: VolumeEngineHandle) -> *mut c_char {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            set_last_error(ErrorCode::InvalidHandle, "Invalid engine handle");
            return ptr::null_mut();
        };
        let transitions = engine.service.engine().refresh();
        to_json_c_string(&RefreshResponse { transitions })
    });

    match result {
        Ok(json) => json,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during refresh");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// FFI Functions - Tracked Devices
// ============================================================================

/// Start tracking a device name at the default level.
///
/// # Returns
/// 0 when added, 1 when ignored (blank or already tracked), negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_engine_add_tracked(
    handle: VolumeEngineHandle,
    name: *const c_char,
) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            set_last_error(ErrorCode::InvalidHandle, "Invalid engine handle");
            return ErrorCode::InvalidHandle as i32;
        };
        let Some(name) = (unsafe { parse_c_str(name) }) else {
            set_last_error(ErrorCode::InvalidArgument, "Invalid device name");
            return ErrorCode::InvalidArgument as i32;
        };

        if engine.service.engine().add_tracked(name) {
            ErrorCode::Success as i32
        } else {
            ErrorCode::Ignored as i32
        }
    });

    match result {
        Ok(code) => code,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during add tracked device");
            ErrorCode::Panic as i32
        }
    }
}

/// Stop tracking a device name.
///
/// # Returns
/// 0 when removed, 1 when ignored (name not tracked), negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_engine_remove_tracked(
    handle: VolumeEngineHandle,
    name: *const c_char,
) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            set_last_error(ErrorCode::InvalidHandle, "Invalid engine handle");
            return ErrorCode::InvalidHandle as i32;
        };
        let Some(name) = (unsafe { parse_c_str(name) }) else {
            set_last_error(ErrorCode::InvalidArgument, "Invalid device name");
            return ErrorCode::InvalidArgument as i32;
        };

        if engine.service.engine().remove_tracked(name) {
            ErrorCode::Success as i32
        } else {
            ErrorCode::Ignored as i32
        }
    });

    match result {
        Ok(code) => code,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during remove tracked device");
            ErrorCode::Panic as i32
        }
    }
}

/// Raise a tracked device's level by one 5% step.
///
/// # Returns
/// JSON string with the new level. Caller must free with volume_engine_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn volume_engine_increment_volume(
    handle: VolumeEngineHandle,
    name: *const c_char,
) -> *mut c_char {
    step_volume(handle, name, true)
}

/// Lower a tracked device's level by one 5% step.
///
/// # Returns
/// JSON string with the new level. Caller must free with volume_engine_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn volume_engine_decrement_volume(
    handle: VolumeEngineHandle,
    name: *const c_char,
) -> *mut c_char {
    step_volume(handle, name, false)
}

fn step_volume(handle: VolumeEngineHandle, name: *const c_char, up: bool) -> *mut c_char {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            set_last_error(ErrorCode::InvalidHandle, "Invalid engine handle");
            return ptr::null_mut();
        };
        let Some(name) = (unsafe { parse_c_str(name) }) else {
            set_last_error(ErrorCode::InvalidArgument, "Invalid device name");
            return ptr::null_mut();
        };

        let engine = engine.service.engine();
        let stepped = if up {
            engine.increment_volume(name)
        } else {
            engine.decrement_volume(name)
        };

        match stepped {
            Some(level) => to_json_c_string(&VolumeStepResult {
                name: name.to_string(),
                volume_level: level,
                volume_percent: (level * 100.0).round() as u8,
            }),
            None => {
                set_last_error(ErrorCode::DeviceNotFound, format!("'{name}' is not tracked"));
                ptr::null_mut()
            }
        }
    });

    match result {
        Ok(json) => json,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during volume step");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// FFI Functions - Memory Management
// ============================================================================

/// Free a string allocated by this library.
///
/// # Safety
/// The pointer must have been returned by one of the volume_engine_* functions.
/// Do not call this on strings from other sources.
#[no_mangle]
pub extern "C" fn volume_engine_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = CString::from_raw(ptr);
    });
}

// ============================================================================
// FFI Functions - Error Handling
// ============================================================================

/// Get the last error code.
///
/// # Returns
/// The error code from the last failed operation, or 0 if no error.
#[no_mangle]
pub extern "C" fn volume_engine_last_error_code() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(0)
    })
}

/// Get the last error message.
///
/// # Returns
/// Error message string. Caller must free with volume_engine_free_string().
/// Returns null if no error.
#[no_mangle]
pub extern "C" fn volume_engine_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, msg)| alloc_c_string(msg))
            .unwrap_or(ptr::null_mut())
    })
}

// ============================================================================
// FFI Functions - Utility
// ============================================================================

/// Get the library version.
///
/// # Returns
/// Version string. Caller must free with volume_engine_free_string().
#[no_mangle]
pub extern "C" fn volume_engine_version() -> *mut c_char {
    alloc_c_string(env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================
