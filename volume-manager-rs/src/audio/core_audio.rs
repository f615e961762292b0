//! Windows Core Audio backend.
//!
//! COM objects are created per call rather than held across calls, so the
//! backend can be moved between threads and every volume call sees the
//! endpoint that is the default right now.

use super::backend::{DeviceRegistry, VolumeControl};
use super::deadline::DeadlineRunner;
use super::device::{AudioDevice, AudioError, DeviceEvent};
use super::endpoint::DefaultOutput;
use super::enumerator::{with_com, ComGuard, DeviceEnumerator};
use super::notifications::EndpointSubscription;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Core Audio implementation of the registry and volume seams.
///
/// Clones share one deadline runner, so a wedged audio service holds at
/// most one blocked worker thread across enumeration and volume calls.
#[derive(Debug, Clone)]
pub struct CoreAudioBackend {
    runner: DeadlineRunner,
}

impl CoreAudioBackend {
    /// Create a backend whose OS calls are abandoned after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            runner: DeadlineRunner::new(timeout),
        }
    }

    /// Run `f` with COM initialized on the runner's worker thread.
    fn run_with_timeout<T, F>(&self, operation: &str, f: F) -> Result<T, AudioError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AudioError> + Send + 'static,
    {
        self.runner.run(operation, move || with_com(f))
    }

    /// Register for endpoint notifications on a dedicated thread.
    ///
    /// The thread owns the enumerator and the registered client for the
    /// lifetime of the process; events are forwarded to `sender`.
    pub fn spawn_watcher(sender: Sender<DeviceEvent>) -> Result<JoinHandle<()>, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("core-audio-watcher".to_string())
            .spawn(move || {
                let registration = ComGuard::new().and_then(|guard| {
                    let enumerator = DeviceEnumerator::new()?;
                    let subscription = EndpointSubscription::register(&enumerator, sender)
                        .map_err(AudioError::WindowsError)?;
                    Ok((subscription, enumerator, guard))
                });

                match registration {
                    Ok(_registered) => {
                        let _ = ready_tx.send(Ok(()));
                        debug!("endpoint notification client registered");
                        // Callbacks run on OS threads; this thread only keeps
                        // the registration alive
                        loop {
                            thread::park();
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AudioError::NotificationsUnavailable(
                "watcher thread exited during registration".to_string(),
            )),
        }
    }
}

impl DeviceRegistry for CoreAudioBackend {
    fn devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        self.run_with_timeout("enumerate", || DeviceEnumerator::new()?.get_devices())
    }
}

impl VolumeControl for CoreAudioBackend {
    fn apply_volume(&self, level: f32) -> Result<(), AudioError> {
        self.run_with_timeout("set-volume", move || {
            let output = DefaultOutput::resolve(&DeviceEnumerator::new()?)?;
            match output.level() {
                Ok(previous) => debug!(
                    endpoint = %output.device().name,
                    previous,
                    level,
                    "setting default endpoint volume"
                ),
                Err(e) => warn!(error = %e, "could not read current endpoint volume"),
            }
            output.set_level(level)
        })
    }
}
