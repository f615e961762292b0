//! Endpoint change notifications through IMMNotificationClient.
//!
//! Callbacks arrive on OS-owned threads. They only push a [`DeviceEvent`]
//! into a channel; the monitor thread does the actual re-enumeration.

use super::device::{DeviceEvent, DeviceState};
use super::enumerator::DeviceEnumerator;
use std::sync::mpsc::Sender;
use tracing::warn;
use windows::core::{implement, PCWSTR};
use windows::Win32::Media::Audio::{
    eRender, EDataFlow, ERole, IMMDeviceEnumerator, IMMNotificationClient,
    IMMNotificationClient_Impl, DEVICE_STATE, DEVICE_STATE_ACTIVE, DEVICE_STATE_DISABLED,
    DEVICE_STATE_NOTPRESENT, DEVICE_STATE_UNPLUGGED,
};
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;
// The implement macro expands to paths under windows_core
#[allow(unused_imports)]
use windows_core;

impl From<DEVICE_STATE> for DeviceState {
    fn from(state: DEVICE_STATE) -> Self {
        match state {
            DEVICE_STATE_ACTIVE => DeviceState::Active,
            DEVICE_STATE_DISABLED => DeviceState::Disabled,
            DEVICE_STATE_UNPLUGGED => DeviceState::Unplugged,
            DEVICE_STATE_NOTPRESENT => DeviceState::NotPresent,
            _ => DeviceState::NotPresent,
        }
    }
}

/// COM callback object forwarding endpoint changes to a channel.
#[implement(IMMNotificationClient)]
struct EndpointListener {
    sender: Sender<DeviceEvent>,
}

impl EndpointListener {
    fn forward(&self, device_id: &PCWSTR, event: impl FnOnce(String) -> DeviceEvent) {
        match unsafe { device_id.to_string() } {
            // A closed channel only means the monitor has gone away
            Ok(id) => {
                let _ = self.sender.send(event(id));
            }
            Err(e) => warn!(error = %e, "unreadable endpoint id in notification"),
        }
    }
}

impl IMMNotificationClient_Impl for EndpointListener_Impl {
    fn OnDeviceStateChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        self.forward(pwstrdeviceid, |device_id| DeviceEvent::DeviceStateChanged {
            device_id,
            new_state: dwnewstate.into(),
        });
        Ok(())
    }

    fn OnDeviceAdded(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        self.forward(pwstrdeviceid, |device_id| DeviceEvent::DeviceAdded { device_id });
        Ok(())
    }

    fn OnDeviceRemoved(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        self.forward(pwstrdeviceid, |device_id| DeviceEvent::DeviceRemoved { device_id });
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        _role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        // Capture defaults have no bearing on output volume
        if flow != eRender {
            return Ok(());
        }

        if pwstrdefaultdeviceid.is_null() {
            let _ = self
                .sender
                .send(DeviceEvent::DefaultDeviceChanged { device_id: None });
        } else {
            self.forward(pwstrdefaultdeviceid, |id| DeviceEvent::DefaultDeviceChanged {
                device_id: Some(id),
            });
        }
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _key: &PROPERTYKEY,
    ) -> windows::core::Result<()> {
        Ok(())
    }
}

/// A live notification registration. Unregisters on drop.
pub struct EndpointSubscription {
    enumerator: IMMDeviceEnumerator,
    client: IMMNotificationClient,
}

impl EndpointSubscription {
    /// Register a listener that sends every endpoint change to `sender`.
    pub fn register(
        enumerator: &DeviceEnumerator,
        sender: Sender<DeviceEvent>,
    ) -> windows::core::Result<Self> {
        let client: IMMNotificationClient = EndpointListener { sender }.into();
        let enumerator = enumerator.raw_enumerator().clone();
        unsafe { enumerator.RegisterEndpointNotificationCallback(&client)? };
        Ok(Self { enumerator, client })
    }
}

impl Drop for EndpointSubscription {
    fn drop(&mut self) {
        unsafe {
            let _ = self
                .enumerator
                .UnregisterEndpointNotificationCallback(&self.client);
        }
    }
}
