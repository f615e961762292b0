//! Deadline-bounded execution of blocking OS audio calls.
//!
//! A call that overruns is left to finish on its worker thread, but at most
//! one such worker exists at a time: while it is still stuck, new calls fail
//! immediately instead of piling up more blocked threads.

use super::device::AudioError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Runs closures on a worker thread with a hard deadline.
///
/// Clones share the in-flight slot.
#[derive(Debug, Clone)]
pub struct DeadlineRunner {
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

/// Frees the in-flight slot when the worker finishes, even by panic.
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DeadlineRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a previous call is still running on its worker.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run `f` on a worker thread and wait at most the configured timeout.
    pub fn run<T, F>(&self, operation: &str, f: F) -> Result<T, AudioError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AudioError> + Send + 'static,
    {
        let timed_out = || AudioError::Timeout {
            operation: operation.to_string(),
            timeout: self.timeout,
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(operation, "previous audio call still blocked; skipping");
            return Err(timed_out());
        }

        let guard = SlotGuard(Arc::clone(&self.in_flight));
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("audio-{operation}"))
            .spawn(move || {
                let _guard = guard;
                let _ = tx.send(f());
            })?;

        rx.recv_timeout(self.timeout).map_err(|_| timed_out())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn wait_until_idle(runner: &DeadlineRunner) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while runner.is_busy() {
            assert!(Instant::now() < deadline, "worker never finished");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_fast_call_returns_value() {
        let runner = DeadlineRunner::new(Duration::from_secs(2));
        assert_eq!(runner.run("add", || Ok(2 + 2)).unwrap(), 4);
        wait_until_idle(&runner);
    }

    #[test]
    fn test_errors_pass_through() {
        let runner = DeadlineRunner::new(Duration::from_secs(2));
        let result: Result<(), _> = runner.run("fail", || Err(AudioError::NoDefaultDevice));
        assert!(matches!(result, Err(AudioError::NoDefaultDevice)));
    }

    #[test]
    fn test_stuck_call_blocks_new_workers() {
        let runner = DeadlineRunner::new(Duration::from_millis(50));
        let started = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let counter = Arc::clone(&started);
        let result: Result<(), _> = runner.run("stuck", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = release_rx.recv();
            Ok(())
        });
        assert!(matches!(result, Err(AudioError::Timeout { .. })));
        assert!(runner.is_busy());

        // Fails fast without starting another worker, from any clone
        let clone = runner.clone();
        for _ in 0..3 {
            let counter = Arc::clone(&started);
            let result: Result<(), _> = clone.run("again", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            assert!(matches!(result, Err(AudioError::Timeout { .. })));
        }
        assert_eq!(started.load(Ordering::SeqCst), 1);

        release_tx.send(()).unwrap();
        wait_until_idle(&runner);
        assert_eq!(runner.run("recovered", || Ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_panicking_call_frees_slot() {
        let runner = DeadlineRunner::new(Duration::from_millis(200));
        let result: Result<(), _> = runner.run("panic", || panic!("driver exploded"));
        assert!(result.is_err());
        wait_until_idle(&runner);
        assert_eq!(runner.run("after", || Ok(1)).unwrap(), 1);
    }
}
