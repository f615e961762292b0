//! The default output endpoint and its master volume.

use super::device::{AudioDevice, AudioError};
use super::enumerator::DeviceEnumerator;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::System::Com::CLSCTX_ALL;

/// Whatever render endpoint is the console default at resolution time.
///
/// Resolve a fresh one for every change: connecting headphones usually
/// moves the default.
pub struct DefaultOutput {
    device: AudioDevice,
    master: IAudioEndpointVolume,
}

impl DefaultOutput {
    pub fn resolve(enumerator: &DeviceEnumerator) -> Result<Self, AudioError> {
        let endpoint = enumerator.default_output()?;
        let device = enumerator.describe(&endpoint)?;
        let master: IAudioEndpointVolume = unsafe {
            endpoint
                .Activate(CLSCTX_ALL, None)
                .map_err(|_| AudioError::VolumeNotAvailable)?
        };

        Ok(Self { device, master })
    }

    pub fn device(&self) -> &AudioDevice {
        &self.device
    }

    /// Current master level (0.0 to 1.0).
    pub fn level(&self) -> Result<f32, AudioError> {
        unsafe {
            self.master
                .GetMasterVolumeLevelScalar()
                .map_err(AudioError::WindowsError)
        }
    }

    /// Set the master level, clamped to `[0, 1]`.
    pub fn set_level(&self, level: f32) -> Result<(), AudioError> {
        unsafe {
            self.master
                .SetMasterVolumeLevelScalar(level.clamp(0.0, 1.0), std::ptr::null())
                .map_err(AudioError::WindowsError)
        }
    }
}
