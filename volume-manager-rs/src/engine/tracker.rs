//! Per-device connection state with edge detection.
//!
//! Each tracked device is `Disconnected` until an evaluation sees it
//! present. [`StateTracker::evaluate`] reports only the devices whose state
//! flipped, so an unchanged presence set yields no transitions at all.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Direction of a connection transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::Connected => write!(f, "Connected"),
            ConnectionEvent::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Connection state of one tracked device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub device_name: String,
    pub is_connected: bool,
}

/// A state change detected by one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub device_name: String,
    pub event: ConnectionEvent,
}

/// Connection states for all tracked devices, in tracked-list order.
#[derive(Debug, Default)]
pub struct StateTracker {
    states: Vec<ConnectionState>,

    /// Connected devices, least recently connected first
    connect_order: Vec<String>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `name` as disconnected. No-op if already tracked.
    pub fn track(&mut self, name: &str) -> bool {
        if self.position(name).is_some() {
            return false;
        }
        self.states.push(ConnectionState {
            device_name: name.to_string(),
            is_connected: false,
        });
        true
    }

    /// Stop tracking `name`, discarding its state without a transition.
    pub fn untrack(&mut self, name: &str) -> Option<ConnectionState> {
        let index = self.position(name)?;
        let state = self.states.remove(index);
        self.connect_order.retain(|n| n != &state.device_name);
        Some(state)
    }

    /// Compare `present` against the last known states and flip the ones
    /// that changed. Transitions are returned in tracked-list order.
    pub fn evaluate(&mut self, present: &BTreeSet<String>) -> Vec<Transition> {
        let mut transitions = Vec::new();

        for state in &mut self.states {
            let now_connected = present.contains(&state.device_name);
            if now_connected == state.is_connected {
                continue;
            }

            state.is_connected = now_connected;
            let event = if now_connected {
                self.connect_order.push(state.device_name.clone());
                ConnectionEvent::Connected
            } else {
                self.connect_order.retain(|n| n != &state.device_name);
                ConnectionEvent::Disconnected
            };

            transitions.push(Transition {
                device_name: state.device_name.clone(),
                event,
            });
        }

        transitions
    }

    /// The connected device whose Connected transition fired last.
    pub fn most_recently_connected(&self) -> Option<&str> {
        self.connect_order.last().map(String::as_str)
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.position(name)
            .map(|i| self.states[i].is_connected)
            .unwrap_or(false)
    }

    pub fn states(&self) -> &[ConnectionState] {
        &self.states
    }

    fn position(&self, name: &str) -> Option<usize> {
        let lower = name.to_lowercase();
        self.states
            .iter()
            .position(|s| s.device_name.to_lowercase() == lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn tracker_for(names: &[&str]) -> StateTracker {
        let mut tracker = StateTracker::new();
        for name in names {
            tracker.track(name);
        }
        tracker
    }

    #[test]
    fn test_initially_disconnected() {
        let tracker = tracker_for(&["AirPods"]);
        assert!(!tracker.is_connected("AirPods"));
        assert_eq!(tracker.most_recently_connected(), None);
    }

    #[test]
    fn test_connect_then_disconnect() {
        let mut tracker = tracker_for(&["AirPods"]);

        let transitions = tracker.evaluate(&present(&["AirPods"]));
        assert_eq!(
            transitions,
            vec![Transition {
                device_name: "AirPods".to_string(),
                event: ConnectionEvent::Connected,
            }]
        );
        assert!(tracker.is_connected("airpods"));

        let transitions = tracker.evaluate(&present(&[]));
        assert_eq!(transitions[0].event, ConnectionEvent::Disconnected);
        assert!(!tracker.is_connected("AirPods"));
    }

    #[test]
    fn test_unchanged_presence_is_silent() {
        let mut tracker = tracker_for(&["AirPods", "Zone Vibe"]);
        assert_eq!(tracker.evaluate(&present(&["AirPods"])).len(), 1);
        assert!(tracker.evaluate(&present(&["AirPods"])).is_empty());
        assert!(tracker.evaluate(&present(&["AirPods"])).is_empty());

        let mut idle = tracker_for(&["AirPods"]);
        assert!(idle.evaluate(&present(&[])).is_empty());
    }

    #[test]
    fn test_most_recent_connection_wins() {
        let mut tracker = tracker_for(&["AirPods", "Zone Vibe"]);
        tracker.evaluate(&present(&["Zone Vibe"]));
        tracker.evaluate(&present(&["Zone Vibe", "AirPods"]));
        assert_eq!(tracker.most_recently_connected(), Some("AirPods"));

        // Losing the latest falls back to the survivor
        tracker.evaluate(&present(&["Zone Vibe"]));
        assert_eq!(tracker.most_recently_connected(), Some("Zone Vibe"));
    }

    #[test]
    fn test_simultaneous_connections_use_list_order() {
        let mut tracker = tracker_for(&["AirPods", "Zone Vibe"]);
        let transitions = tracker.evaluate(&present(&["AirPods", "Zone Vibe"]));
        assert_eq!(transitions.len(), 2);
        assert_eq!(tracker.most_recently_connected(), Some("Zone Vibe"));
    }

    #[test]
    fn test_untrack_drops_state() {
        let mut tracker = tracker_for(&["AirPods"]);
        tracker.evaluate(&present(&["AirPods"]));
        let removed = tracker.untrack("AIRPODS").unwrap();
        assert!(removed.is_connected);
        assert!(tracker.states().is_empty());
        assert_eq!(tracker.most_recently_connected(), None);
        assert!(tracker.untrack("AirPods").is_none());
    }

    #[test]
    fn test_track_is_idempotent() {
        let mut tracker = tracker_for(&["AirPods"]);
        assert!(!tracker.track("airpods"));
        assert_eq!(tracker.states().len(), 1);
    }
}
