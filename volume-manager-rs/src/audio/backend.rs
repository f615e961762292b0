//! Seams between the engine and the OS audio subsystem.
//!
//! The engine only needs two capabilities: listing attached devices and
//! setting the volume of whatever output endpoint is currently the default.
//! Platform backends implement both; tests substitute in-memory fakes.

use super::device::{AudioDevice, AudioError};

/// Lists the audio devices currently attached to the system.
pub trait DeviceRegistry: Send {
    /// Query all attached devices.
    ///
    /// An `Err` means "no information" and must not be read as
    /// "every device is absent".
    fn devices(&self) -> Result<Vec<AudioDevice>, AudioError>;

    /// Display names of all attached devices.
    fn enumerate(&self) -> Result<Vec<String>, AudioError> {
        Ok(self.devices()?.into_iter().map(|d| d.name).collect())
    }
}

/// Applies a volume level to the current default output endpoint.
pub trait VolumeControl: Send {
    /// Set the default output endpoint's volume (0.0 to 1.0).
    ///
    /// Implementations resolve the default endpoint on every call since
    /// connecting or disconnecting a device may change it.
    fn apply_volume(&self, level: f32) -> Result<(), AudioError>;
}
