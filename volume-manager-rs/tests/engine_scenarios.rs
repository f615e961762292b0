//! End-to-end scenarios through the public API with in-memory devices.

use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use volume_manager_rs::{
    AudioDevice, AudioError, Config, ConnectionEvent, DeviceEvent, DeviceRegistry, Engine,
    EngineEvent, EngineHandle, Monitor, PreferenceStore, TrackedDevice, VolumeControl,
};

#[derive(Clone, Default)]
struct SharedDevices(Arc<Mutex<Vec<String>>>);

impl SharedDevices {
    fn set(&self, names: &[&str]) {
        *self.0.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
    }
}

impl DeviceRegistry for SharedDevices {
    fn devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, name)| AudioDevice::new(format!("dev-{i}"), name.clone()))
            .collect())
    }
}

#[derive(Clone, Default)]
struct RecordingVolume(Arc<Mutex<Vec<f32>>>);

impl RecordingVolume {
    fn calls(&self) -> Vec<f32> {
        self.0.lock().unwrap().clone()
    }
}

impl VolumeControl for RecordingVolume {
    fn apply_volume(&self, level: f32) -> Result<(), AudioError> {
        self.0.lock().unwrap().push(level);
        Ok(())
    }
}

struct Harness {
    engine: EngineHandle<SharedDevices, RecordingVolume>,
    devices: SharedDevices,
    volume: RecordingVolume,
    dir: tempfile::TempDir,
}

fn harness(tracked: &[(&str, f32)]) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(dir.path().join("preferences.json"));
    let config = Config::with_devices(
        tracked
            .iter()
            .map(|(name, level)| TrackedDevice::new(*name, *level))
            .collect(),
    );
    let devices = SharedDevices::default();
    let volume = RecordingVolume::default();
    let engine = EngineHandle::new(Engine::with_config(
        devices.clone(),
        volume.clone(),
        store,
        config,
        50,
    ));

    Harness {
        engine,
        devices,
        volume,
        dir,
    }
}

#[test]
fn headphones_connect_then_disconnect() {
    let h = harness(&[("AirPods", 0.5)]);

    h.devices.set(&["AirPods Pro"]);
    let transitions = h.engine.refresh();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].device_name, "AirPods");
    assert_eq!(transitions[0].event, ConnectionEvent::Connected);
    assert_eq!(h.volume.calls(), vec![0.5]);

    h.devices.set(&[]);
    let transitions = h.engine.refresh();
    assert_eq!(transitions[0].event, ConnectionEvent::Disconnected);
    assert_eq!(h.volume.calls(), vec![0.5, 0.0]);

    // Nothing changed since the last poll
    assert!(h.engine.refresh().is_empty());
    assert_eq!(h.volume.calls(), vec![0.5, 0.0]);

    let snapshot = h.engine.snapshot();
    let events: Vec<ConnectionEvent> = snapshot.activity.iter().map(|e| e.event).collect();
    assert_eq!(
        events,
        vec![ConnectionEvent::Connected, ConnectionEvent::Disconnected]
    );
    assert!(snapshot.activity[0].timestamp <= snapshot.activity[1].timestamp);
}

#[test]
fn repeated_snapshots_are_edge_triggered() {
    let h = harness(&[("AirPods", 0.5), ("Zone Vibe", 0.3)]);
    h.devices.set(&["Zone Vibe 100", "Built-in Output"]);

    h.engine.refresh();
    h.engine.refresh();
    h.engine.refresh();

    assert_eq!(h.volume.calls(), vec![0.3]);
    assert_eq!(h.engine.snapshot().activity.len(), 1);
}

#[test]
fn configuration_survives_restart() {
    let h = harness(&[("AirPods", 0.5)]);
    assert!(h.engine.add_tracked("Desk Speakers"));
    h.engine.decrement_volume("Desk Speakers");
    h.engine.decrement_volume("Desk Speakers");
    assert!(h.engine.remove_tracked("airpods"));

    let reloaded = PreferenceStore::new(h.dir.path().join("preferences.json")).load();

    assert_eq!(reloaded.names().collect::<Vec<_>>(), vec!["Desk Speakers"]);
    assert_eq!(reloaded.volume_for("Desk Speakers"), 0.4);
}

#[test]
fn available_devices_lists_untracked_only() {
    let h = harness(&[("AirPods", 0.5)]);
    h.devices.set(&["AirPods Pro", "Built-in Output", "HDMI Display"]);

    let available = h.engine.available_devices().unwrap();

    assert_eq!(available, vec!["Built-in Output", "HDMI Display"]);
}

#[test]
fn concurrent_refreshes_fire_one_edge() {
    let h = harness(&[("AirPods", 0.6)]);
    h.devices.set(&["AirPods Pro"]);
    let start = Arc::new(Barrier::new(8));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let engine = h.engine.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                engine.refresh().len()
            })
        })
        .collect();
    let fired: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

    assert_eq!(fired, 1);
    assert_eq!(h.volume.calls(), vec![0.6]);
    assert_eq!(h.engine.snapshot().activity.len(), 1);
}

#[test]
fn monitor_reacts_to_device_notifications() {
    let h = harness(&[("AirPods", 0.7)]);
    let engine_events = h.engine.subscribe();
    let (tx, rx) = mpsc::channel();

    // Long poll interval so only the notification can trigger the second cycle
    let monitor = Monitor::new(h.engine.clone(), Some(rx), Duration::from_secs(30));
    let stop = monitor.stop_flag();
    let monitor_thread = monitor.spawn().unwrap();

    h.devices.set(&["AirPods"]);
    tx.send(DeviceEvent::DeviceAdded {
        device_id: "dev-0".to_string(),
    })
    .unwrap();

    let event = engine_events
        .recv_timeout(Duration::from_secs(5))
        .expect("no transition published");
    assert_eq!(
        event,
        EngineEvent::Transition {
            device_name: "AirPods".to_string(),
            event: ConnectionEvent::Connected,
        }
    );

    stop.store(true, std::sync::atomic::Ordering::SeqCst);
    // Dropping the sender wakes the monitor so it can observe the flag
    drop(tx);
    monitor_thread.join().unwrap();

    assert_eq!(h.volume.calls(), vec![0.7]);
}
