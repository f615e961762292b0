//! Volume Manager - Library
//!
//! Sets the system output volume according to which tracked audio devices
//! are connected.
//!
//! ## Features
//!
//! - Per-device volume levels for a user-maintained list of device names
//! - Fuzzy, case-insensitive matching of attached devices to tracked names
//! - Edge-triggered volume changes on connect and disconnect
//! - Bounded activity log of connection events
//! - OS change notifications with a periodic poll as fallback
//! - JSON preferences in the per-user config directory

pub mod app;
pub mod audio;
pub mod engine;
pub mod platform;

pub use app::{init_logging, start, PlatformEngine, Service};
pub use audio::{
    AudioDevice, AudioError, DeviceEvent, DeviceRegistry, PlatformBackend, VolumeControl,
};
pub use engine::{
    ActivityEntry, ActivityLog, Config, ConnectionEvent, Engine, EngineEvent, EngineHandle,
    EngineSnapshot, Monitor, TrackedDevice, TrackedDeviceStatus, Transition,
};
pub use platform::{PreferenceStore, PreferencesError, Settings};
