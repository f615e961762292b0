//! Application lifecycle.
//!
//! Wires the platform backend, preference store, engine, and monitor
//! together and owns the background threads.

use crate::audio::PlatformBackend;
use crate::engine::{Engine, EngineHandle, Monitor};
use crate::platform::{PreferenceStore, Settings};
use anyhow::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Engine bound to the backend for the current OS.
pub type PlatformEngine = EngineHandle<PlatformBackend, PlatformBackend>;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; `default_level` applies otherwise. Calling
/// this more than once is harmless.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}

/// A running engine and its monitor thread.
pub struct Service {
    engine: PlatformEngine,
    monitor: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

/// Load preferences, start watching for device changes, and begin
/// monitoring.
///
/// Notification registration failure is not fatal: the monitor falls back
/// to polling alone.
pub fn start(settings: &Settings) -> anyhow::Result<Service> {
    let store = match &settings.preferences_path {
        Some(path) => PreferenceStore::new(path.clone()),
        None => PreferenceStore::default_location()
            .context("failed to locate the preferences file")?,
    };
    info!(path = %store.path().display(), "using preferences file");

    let backend = PlatformBackend::new(settings.query_timeout());
    let engine = EngineHandle::new(Engine::new(
        backend.clone(),
        backend,
        store,
        settings.log_capacity,
    ));

    let (tx, rx) = mpsc::channel();
    let events = match PlatformBackend::spawn_watcher(tx) {
        Ok(_watcher) => Some(rx),
        Err(e) => {
            warn!(error = %e, "device notifications unavailable; polling only");
            None
        }
    };

    let monitor = Monitor::new(engine.clone(), events, settings.poll_interval());
    let stop = monitor.stop_flag();
    let monitor = monitor
        .spawn()
        .context("failed to start the monitor thread")?;

    Ok(Service {
        engine,
        monitor: Some(monitor),
        stop,
    })
}

impl Service {
    /// Handle for queries and mutations from front-ends.
    pub fn engine(&self) -> &PlatformEngine {
        &self.engine
    }

    /// Ask the monitor to stop at its next wake-up.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Block until the monitor thread exits.
    pub fn wait(mut self) -> anyhow::Result<()> {
        if let Some(monitor) = self.monitor.take() {
            monitor
                .join()
                .map_err(|_| anyhow::anyhow!("monitor thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}
