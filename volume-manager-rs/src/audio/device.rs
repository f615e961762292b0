//! Audio device data models.
//!
//! Defines the data structures exchanged with the OS audio subsystem:
//! attached devices, change notifications, and the error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// An attached audio device as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Opaque OS device identifier (endpoint ID or sink name)
    pub id: String,

    /// Human-readable display name, the string tracked names are matched against
    pub name: String,
}

impl AudioDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// OS device state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Device is active and available for use
    Active,

    /// Device is disabled in the OS sound settings
    Disabled,

    /// Device is not present (driver issue)
    NotPresent,

    /// Device is unplugged (for pluggable devices)
    Unplugged,
}

/// Change notifications from the OS audio subsystem.
///
/// The engine does not interpret the payload beyond logging: any event
/// means "the device list may have changed, re-enumerate".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A new audio device was connected
    DeviceAdded { device_id: String },

    /// An audio device was disconnected
    DeviceRemoved { device_id: String },

    /// Device state changed (active, disabled, not present, unplugged)
    DeviceStateChanged {
        device_id: String,
        new_state: DeviceState,
    },

    /// Default output device changed
    DefaultDeviceChanged {
        device_id: Option<String>, // None if no default device
    },
}

/// Audio service error types.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No default output device available")]
    NoDefaultDevice,

    #[error("Failed to enumerate devices: {0}")]
    EnumerationFailed(String),

    #[error("Volume control not available for device")]
    VolumeNotAvailable,

    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Audio query `{operation}` timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Device notifications unavailable: {0}")]
    NotificationsUnavailable(String),

    #[error("String conversion error: {0}")]
    StringConversion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(windows)]
    #[error("COM initialization failed: {0}")]
    ComInitFailed(#[source] windows::core::Error),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsError(#[source] windows::core::Error),
}
