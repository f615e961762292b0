//! The detection-and-control engine.
//!
//! One [`Engine`] owns the live config, connection states, and activity
//! log. Each evaluation runs registry -> matcher -> tracker, and only when
//! the tracker reports transitions does it touch the output volume, the
//! activity log, and the preference store.

use super::activity::{ActivityEntry, ActivityLog};
use super::config::{Config, DEFAULT_VOLUME};
use super::matcher;
use super::tracker::{ConnectionEvent, StateTracker, Transition};
use crate::audio::{AudioError, DeviceRegistry, VolumeControl};
use crate::platform::PreferenceStore;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

/// Level applied when no tracked device is connected.
pub const MUTED: f32 = 0.0;

/// Display row for one tracked device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedDeviceStatus {
    pub name: String,
    pub is_connected: bool,
    pub volume_level: f32,
    pub volume_percent: u8,
}

/// Consistent copy of everything a front-end displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Tracked devices in user order
    pub tracked: Vec<TrackedDeviceStatus>,

    /// Activity log, oldest first
    pub activity: Vec<ActivityEntry>,

    /// Tracked device whose level currently applies, if any is connected
    pub active_device: Option<String>,
}

/// Notifications published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A tracked device connected or disconnected
    Transition {
        device_name: String,
        event: ConnectionEvent,
    },

    /// The output volume was set after transitions
    VolumeApplied { level: f32, succeeded: bool },

    /// The tracked-device list or a level changed
    ConfigChanged,
}

/// Detection-and-control engine over a device registry and volume control.
pub struct Engine<R, V> {
    registry: R,
    volume: V,
    store: PreferenceStore,
    config: Config,
    tracker: StateTracker,
    activity: ActivityLog,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl<R: DeviceRegistry, V: VolumeControl> Engine<R, V> {
    /// Create an engine with the config loaded from `store`.
    pub fn new(registry: R, volume: V, store: PreferenceStore, log_capacity: usize) -> Self {
        let config = store.load();
        Self::with_config(registry, volume, store, config, log_capacity)
    }

    /// Create an engine with an explicit starting config.
    pub fn with_config(
        registry: R,
        volume: V,
        store: PreferenceStore,
        config: Config,
        log_capacity: usize,
    ) -> Self {
        let mut tracker = StateTracker::new();
        for name in config.names() {
            tracker.track(name);
        }

        Self {
            registry,
            volume,
            store,
            config,
            tracker,
            activity: ActivityLog::new(log_capacity),
            subscribers: Vec::new(),
        }
    }

    /// Query the registry and evaluate the result.
    ///
    /// A failed query skips the cycle entirely: unknown is not the same as
    /// "nothing connected", and muting on a transient failure would be wrong.
    pub fn refresh(&mut self) -> Vec<Transition> {
        match self.registry.enumerate() {
            Ok(connected) => self.evaluate(&connected),
            Err(e) => {
                warn!(error = %e, "device query failed, skipping cycle");
                Vec::new()
            }
        }
    }

    /// Evaluate one device snapshot and act on any transitions.
    pub fn evaluate(&mut self, connected: &[String]) -> Vec<Transition> {
        let present = matcher::match_present(connected, self.config.names());
        let transitions = self.tracker.evaluate(&present);

        if transitions.is_empty() {
            debug!(devices = connected.len(), present = present.len(), "no transitions");
            return transitions;
        }

        for transition in &transitions {
            info!(
                device = %transition.device_name,
                event = %transition.event,
                "tracked device transition"
            );
            self.activity.append(ActivityEntry::new(
                transition.device_name.clone(),
                transition.event,
            ));
            self.publish(EngineEvent::Transition {
                device_name: transition.device_name.clone(),
                event: transition.event,
            });
        }

        self.apply_policy();
        self.persist();

        transitions
    }

    /// Level for the most recently connected device, or mute.
    fn target_volume(&self) -> f32 {
        match self.tracker.most_recently_connected() {
            Some(name) => self.config.volume_for(name),
            None => MUTED,
        }
    }

    /// Apply the target level and tell subscribers how it went.
    fn apply_policy(&mut self) {
        let level = self.target_volume();
        let succeeded = self.apply_volume(level);
        self.publish(EngineEvent::VolumeApplied { level, succeeded });
    }

    fn apply_volume(&self, level: f32) -> bool {
        match self.volume.apply_volume(level) {
            Ok(()) => {
                info!(level, "output volume applied");
                true
            }
            Err(e) => {
                warn!(error = %e, level, "failed to apply output volume");
                false
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.config) {
            warn!(error = %e, "failed to save preferences");
        }
    }

    fn config_changed(&mut self) {
        self.persist();
        self.publish(EngineEvent::ConfigChanged);
    }

    /// Start tracking `name` at the default level.
    ///
    /// Blank and already-tracked names are ignored. The device is
    /// evaluated on the next refresh.
    pub fn add_tracked(&mut self, name: &str) -> bool {
        if !self.config.add(name) {
            debug!(name, "ignoring add of blank or already tracked device");
            return false;
        }
        self.tracker.track(name.trim());
        info!(name = name.trim(), volume = DEFAULT_VOLUME, "tracking device");
        self.config_changed();
        true
    }

    /// Stop tracking `name`, dropping its state and volume setting.
    ///
    /// No activity entry is written. If the removed device was the one whose
    /// level currently applies, the policy is re-applied: the next most
    /// recent connected device's level, or mute when none is left.
    pub fn remove_tracked(&mut self, name: &str) -> bool {
        let Some(removed) = self.config.remove(name) else {
            debug!(name, "ignoring removal of untracked device");
            return false;
        };
        let was_active = self
            .tracker
            .most_recently_connected()
            .is_some_and(|active| active == removed.name);

        self.tracker.untrack(&removed.name);
        info!(name = %removed.name, "stopped tracking device");
        if was_active {
            self.apply_policy();
        }
        self.config_changed();
        true
    }

    /// Raise the stored level for `name` by one step (max 100%).
    ///
    /// The new level applies on the device's next connection.
    pub fn increment_volume(&mut self, name: &str) -> Option<f32> {
        let before = self.config.get(name)?.volume_level;
        let after = self.config.increment_volume(name)?;
        if after != before {
            debug!(name, level = after, "raised device volume");
            self.config_changed();
        }
        Some(after)
    }

    /// Lower the stored level for `name` by one step (min 0%).
    pub fn decrement_volume(&mut self, name: &str) -> Option<f32> {
        let before = self.config.get(name)?.volume_level;
        let after = self.config.decrement_volume(name)?;
        if after != before {
            debug!(name, level = after, "lowered device volume");
            self.config_changed();
        }
        Some(after)
    }

    /// Attached devices that match no tracked name.
    pub fn available_devices(&self) -> Result<Vec<String>, AudioError> {
        let connected = self.registry.enumerate()?;
        Ok(matcher::untracked(&connected, self.config.names()))
    }

    /// Receive engine events from now on.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: EngineEvent) {
        // Dropped receivers are pruned on send failure
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Copy of the current display state.
    pub fn snapshot(&self) -> EngineSnapshot {
        let tracked = self
            .config
            .tracked_devices
            .iter()
            .map(|device| TrackedDeviceStatus {
                name: device.name.clone(),
                is_connected: self.tracker.is_connected(&device.name),
                volume_level: device.volume_level,
                volume_percent: device.volume_percent(),
            })
            .collect();

        EngineSnapshot {
            tracked,
            activity: self.activity.entries(),
            active_device: self.tracker.most_recently_connected().map(str::to_string),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }
}
