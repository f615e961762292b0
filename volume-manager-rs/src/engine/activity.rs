//! Bounded record of connect/disconnect transitions.

use super::tracker::ConnectionEvent;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// One recorded transition. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub device_name: String,
    pub event: ConnectionEvent,
    pub timestamp: DateTime<Local>,
}

impl ActivityEntry {
    /// Create an entry stamped with the current local time.
    pub fn new(device_name: impl Into<String>, event: ConnectionEvent) -> Self {
        Self::at(device_name, event, Local::now())
    }

    pub fn at(device_name: impl Into<String>, event: ConnectionEvent, timestamp: DateTime<Local>) -> Self {
        Self {
            device_name: device_name.into(),
            event,
            timestamp,
        }
    }

    /// Text for list display, e.g. `AirPods - Connected at 14:05`.
    pub fn display_text(&self) -> String {
        format!(
            "{} - {} at {}",
            self.device_name,
            self.event,
            self.timestamp.format("%H:%M")
        )
    }
}

/// Append-only log that evicts its oldest entry once full.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityLog {
    /// Create a log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when at capacity.
    ///
    /// Timestamps are kept non-decreasing: an entry stamped earlier than the
    /// newest one (wall clock stepped back) takes the newest timestamp.
    pub fn append(&mut self, mut entry: ActivityEntry) {
        if let Some(last) = self.entries.back() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }

        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&ActivityEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at_minute(minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut log = ActivityLog::new(3);
        for i in 0..4 {
            log.append(ActivityEntry::at(
                format!("Device {i}"),
                ConnectionEvent::Connected,
                at_minute(i),
            ));
        }

        let names: Vec<String> = log.entries().into_iter().map(|e| e.device_name).collect();
        assert_eq!(names, vec!["Device 1", "Device 2", "Device 3"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut log = ActivityLog::new(5);
        for _ in 0..20 {
            log.append(ActivityEntry::new("AirPods", ConnectionEvent::Disconnected));
            assert!(log.len() <= log.capacity());
        }
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut log = ActivityLog::new(0);
        log.append(ActivityEntry::new("AirPods", ConnectionEvent::Connected));
        log.append(ActivityEntry::new("AirPods", ConnectionEvent::Disconnected));
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().event, ConnectionEvent::Disconnected);
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let mut log = ActivityLog::new(10);
        let later = at_minute(30);
        log.append(ActivityEntry::at("AirPods", ConnectionEvent::Connected, later));
        log.append(ActivityEntry::at(
            "AirPods",
            ConnectionEvent::Disconnected,
            later - Duration::minutes(5),
        ));

        let entries = log.entries();
        assert_eq!(entries[1].timestamp, later);
    }

    #[test]
    fn test_display_text() {
        let entry = ActivityEntry::at("AirPods", ConnectionEvent::Connected, at_minute(5));
        assert_eq!(entry.display_text(), "AirPods - Connected at 09:05");
    }
}
