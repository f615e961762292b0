//! Endpoint enumeration through the Windows MMDevice API.

use super::device::{AudioDevice, AudioError};
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eAll, eConsole, eRender, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator,
    DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_MULTITHREADED, STGM_READ,
};
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;

/// Keeps COM initialized on the current thread until dropped.
pub struct ComGuard(());

impl ComGuard {
    pub fn new() -> Result<Self, AudioError> {
        // Multithreaded apartment: none of our threads pump messages
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
            .ok()
            .map_err(AudioError::ComInitFailed)?;
        Ok(Self(()))
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
    }
}

/// Run `f` with COM initialized for the current thread.
pub fn with_com<T, F: FnOnce() -> Result<T, AudioError>>(f: F) -> Result<T, AudioError> {
    let _guard = ComGuard::new()?;
    f()
}

fn enumeration_failed(e: windows::core::Error) -> AudioError {
    AudioError::EnumerationFailed(e.to_string())
}

/// Wrapper over `IMMDeviceEnumerator`. COM must be initialized on the
/// calling thread.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    pub fn new() -> Result<Self, AudioError> {
        let enumerator = unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }
            .map_err(enumeration_failed)?;
        Ok(Self { enumerator })
    }

    /// All active endpoints, render and capture alike.
    ///
    /// Headsets often expose only one side, so both directions count as
    /// "attached". Endpoints whose properties cannot be read are skipped.
    pub fn get_devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        let collection = unsafe { self.enumerator.EnumAudioEndpoints(eAll, DEVICE_STATE_ACTIVE) }
            .map_err(enumeration_failed)?;
        let count = unsafe { collection.GetCount() }.map_err(enumeration_failed)?;

        let mut devices = Vec::with_capacity(count as usize);
        for index in 0..count {
            let endpoint = unsafe { collection.Item(index) }.map_err(enumeration_failed)?;
            if let Ok(device) = self.describe(&endpoint) {
                devices.push(device);
            }
        }
        Ok(devices)
    }

    /// The console-role default render endpoint.
    pub fn default_output(&self) -> Result<IMMDevice, AudioError> {
        unsafe { self.enumerator.GetDefaultAudioEndpoint(eRender, eConsole) }
            .map_err(|_| AudioError::NoDefaultDevice)
    }

    /// Read the id and friendly name of an endpoint.
    pub fn describe(&self, endpoint: &IMMDevice) -> Result<AudioDevice, AudioError> {
        let id = unsafe {
            let raw = endpoint.GetId().map_err(enumeration_failed)?;
            raw.to_string()
                .map_err(|e| AudioError::StringConversion(e.to_string()))?
        };
        let name = friendly_name(endpoint).unwrap_or_else(|| "Unknown".to_string());
        Ok(AudioDevice::new(id, name))
    }

    /// Underlying COM interface, for notification registration.
    pub fn raw_enumerator(&self) -> &IMMDeviceEnumerator {
        &self.enumerator
    }
}

fn friendly_name(endpoint: &IMMDevice) -> Option<String> {
    let key = PROPERTYKEY {
        fmtid: DEVPKEY_Device_FriendlyName.fmtid,
        pid: DEVPKEY_Device_FriendlyName.pid,
    };
    let value = unsafe {
        let store = endpoint.OpenPropertyStore(STGM_READ).ok()?;
        store.GetValue(&key).ok()?
    };
    Some(value.to_string()).filter(|name| !name.is_empty())
}
