//! Audio module for OS audio subsystem interactions.
//!
//! This module provides device enumeration, default-endpoint volume control,
//! and device change notifications behind the [`DeviceRegistry`] and
//! [`VolumeControl`] traits.

pub mod backend;
pub mod deadline;
pub mod device;

#[cfg(windows)]
pub mod core_audio;
#[cfg(windows)]
pub mod endpoint;
#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod notifications;

#[cfg(not(windows))]
pub mod pulse;

pub use backend::{DeviceRegistry, VolumeControl};
pub use device::{AudioDevice, AudioError, DeviceEvent, DeviceState};

#[cfg(windows)]
pub use core_audio::CoreAudioBackend as PlatformBackend;
#[cfg(not(windows))]
pub use pulse::PulseBackend as PlatformBackend;
