//! Shared, serialized access to one engine.
//!
//! Every caller (OS notification path, fallback timer, front-ends) goes
//! through the same mutex, so evaluations and mutations never interleave
//! and snapshots are never torn.

use super::orchestrator::{Engine, EngineEvent, EngineSnapshot};
use super::tracker::Transition;
use crate::audio::{AudioError, DeviceRegistry, VolumeControl};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to an engine shared across threads.
pub struct EngineHandle<R, V> {
    inner: Arc<Mutex<Engine<R, V>>>,
}

impl<R, V> Clone for EngineHandle<R, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: DeviceRegistry, V: VolumeControl> EngineHandle<R, V> {
    pub fn new(engine: Engine<R, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Lock the engine. A panic in another holder does not leave the
    /// engine unusable: its state is only ever updated whole.
    fn lock(&self) -> MutexGuard<'_, Engine<R, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut Engine<R, V>) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn refresh(&self) -> Vec<Transition> {
        self.lock().refresh()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.lock().snapshot()
    }

    pub fn add_tracked(&self, name: &str) -> bool {
        self.lock().add_tracked(name)
    }

    pub fn remove_tracked(&self, name: &str) -> bool {
        self.lock().remove_tracked(name)
    }

    pub fn increment_volume(&self, name: &str) -> Option<f32> {
        self.lock().increment_volume(name)
    }

    pub fn decrement_volume(&self, name: &str) -> Option<f32> {
        self.lock().decrement_volume(name)
    }

    pub fn available_devices(&self) -> Result<Vec<String>, AudioError> {
        self.lock().available_devices()
    }

    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.lock().subscribe()
    }
}
