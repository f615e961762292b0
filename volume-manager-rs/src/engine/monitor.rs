//! Trigger funnel: OS notifications and the fallback poll timer.
//!
//! Both trigger sources end up on one thread that calls
//! [`EngineHandle::refresh`]. A burst of notifications is coalesced into a
//! single evaluation; the poll covers notifications the OS never sends.

use super::handle::EngineHandle;
use crate::audio::{DeviceEvent, DeviceRegistry, VolumeControl};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives an engine from device notifications and a periodic poll.
pub struct Monitor<R, V> {
    engine: EngineHandle<R, V>,
    events: Option<Receiver<DeviceEvent>>,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl<R, V> Monitor<R, V>
where
    R: DeviceRegistry + 'static,
    V: VolumeControl + 'static,
{
    /// `events` may be `None` when the platform offers no notifications;
    /// the monitor then polls only.
    pub fn new(
        engine: EngineHandle<R, V>,
        events: Option<Receiver<DeviceEvent>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            events,
            poll_interval,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends the loop at its next wake-up when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run the monitor on a named background thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("volume-monitor".to_string())
            .spawn(move || self.run())
    }

    /// Evaluate once immediately, then on every trigger until stopped.
    pub fn run(mut self) {
        info!(poll_interval = ?self.poll_interval, "monitor started");
        self.engine.refresh();

        while !self.stop.load(Ordering::SeqCst) {
            if self.wait_for_trigger() {
                self.engine.refresh();
            }
        }

        info!("monitor stopped");
    }

    /// Block until a notification arrives or the poll interval elapses.
    /// Returns `false` when woken only to observe the stop flag.
    fn wait_for_trigger(&mut self) -> bool {
        let Some(events) = &self.events else {
            thread::sleep(self.poll_interval);
            return !self.stop.load(Ordering::SeqCst);
        };

        match events.recv_timeout(self.poll_interval) {
            Ok(event) => {
                debug!(?event, "device notification");
                // Coalesce a burst into one evaluation
                while let Ok(event) = events.try_recv() {
                    debug!(?event, "device notification (coalesced)");
                }
                !self.stop.load(Ordering::SeqCst)
            }
            Err(RecvTimeoutError::Timeout) => !self.stop.load(Ordering::SeqCst),
            Err(RecvTimeoutError::Disconnected) => {
                warn!("device notifications ended; continuing with polling only");
                self.events = None;
                false
            }
        }
    }
}
