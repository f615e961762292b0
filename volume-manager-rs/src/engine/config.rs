//! Tracked-device configuration.
//!
//! Volume levels live on a five-percent grid; the step helpers are the only
//! way the engine changes a stored level.

use serde::{Deserialize, Serialize};

/// Level applied to a tracked device with no explicit setting.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Increment/decrement granularity in percent.
pub const VOLUME_STEP_PERCENT: i32 = 5;

/// Current persisted format version.
pub const CONFIG_VERSION: u32 = 1;

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// A device name pattern with the volume to apply when it connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedDevice {
    pub name: String,

    /// Volume level (0.0 - 1.0)
    #[serde(rename = "volume", default = "default_volume")]
    pub volume_level: f32,
}

impl TrackedDevice {
    pub fn new(name: impl Into<String>, volume_level: f32) -> Self {
        Self {
            name: name.into(),
            volume_level: snap_volume(volume_level),
        }
    }

    /// Volume as percentage (0-100).
    pub fn volume_percent(&self) -> u8 {
        to_percent(self.volume_level) as u8
    }
}

/// The tracked-device list, in user order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// File format version
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub tracked_devices: Vec<TrackedDevice>,
}

impl Default for Config {
    /// The seed list used when nothing usable is persisted.
    fn default() -> Self {
        Self::with_devices(vec![
            TrackedDevice::new("AirPods", DEFAULT_VOLUME),
            TrackedDevice::new("Zone Vibe", DEFAULT_VOLUME),
        ])
    }
}

impl Config {
    pub fn with_devices(tracked_devices: Vec<TrackedDevice>) -> Self {
        Self {
            version: CONFIG_VERSION,
            tracked_devices,
        }
    }

    /// Tracked names in list order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tracked_devices.iter().map(|d| d.name.as_str())
    }

    /// Find a tracked device by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&TrackedDevice> {
        let lower = name.to_lowercase();
        self.tracked_devices
            .iter()
            .find(|d| d.name.to_lowercase() == lower)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut TrackedDevice> {
        let lower = name.to_lowercase();
        self.tracked_devices
            .iter_mut()
            .find(|d| d.name.to_lowercase() == lower)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Configured level for `name`, or the default when it has none.
    pub fn volume_for(&self, name: &str) -> f32 {
        self.get(name).map_or(DEFAULT_VOLUME, |d| d.volume_level)
    }

    /// Append a new tracked device at the default level.
    ///
    /// Returns `false` for blank names and for names already tracked under
    /// any capitalization.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.tracked_devices
            .push(TrackedDevice::new(name, DEFAULT_VOLUME));
        true
    }

    /// Remove a tracked device, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<TrackedDevice> {
        let lower = name.to_lowercase();
        let index = self
            .tracked_devices
            .iter()
            .position(|d| d.name.to_lowercase() == lower)?;
        Some(self.tracked_devices.remove(index))
    }

    /// Raise a device's level by one step. Returns the new level.
    pub fn increment_volume(&mut self, name: &str) -> Option<f32> {
        let device = self.get_mut(name)?;
        device.volume_level = step_up(device.volume_level);
        Some(device.volume_level)
    }

    /// Lower a device's level by one step. Returns the new level.
    pub fn decrement_volume(&mut self, name: &str) -> Option<f32> {
        let device = self.get_mut(name)?;
        device.volume_level = step_down(device.volume_level);
        Some(device.volume_level)
    }

    /// Normalize data read from disk: clamp and snap levels, drop blank
    /// names and case-insensitive duplicates (first occurrence wins).
    pub fn sanitize(mut self) -> Self {
        let mut seen: Vec<String> = Vec::with_capacity(self.tracked_devices.len());
        self.tracked_devices.retain_mut(|device| {
            device.name = device.name.trim().to_string();
            let lower = device.name.to_lowercase();
            if device.name.is_empty() || seen.contains(&lower) {
                return false;
            }
            seen.push(lower);
            device.volume_level = snap_volume(device.volume_level);
            true
        });
        self.version = CONFIG_VERSION;
        self
    }
}

/// Level as a whole percentage, clamped to 0..=100.
fn to_percent(level: f32) -> i32 {
    if level.is_nan() {
        return 0;
    }
    (level.clamp(0.0, 1.0) * 100.0).round() as i32
}

fn from_percent(percent: i32) -> f32 {
    percent.clamp(0, 100) as f32 / 100.0
}

/// Clamp to `[0, 1]` and round to the nearest step.
pub fn snap_volume(level: f32) -> f32 {
    let percent = to_percent(level);
    let snapped = ((percent as f32 / VOLUME_STEP_PERCENT as f32).round() as i32) * VOLUME_STEP_PERCENT;
    from_percent(snapped)
}

/// Next step up, landing on the grid and never exceeding 1.0.
pub fn step_up(level: f32) -> f32 {
    let percent = to_percent(level) + VOLUME_STEP_PERCENT;
    from_percent((percent / VOLUME_STEP_PERCENT * VOLUME_STEP_PERCENT).min(100))
}

/// Next step down, landing on the grid and never going below 0.0.
pub fn step_down(level: f32) -> f32 {
    let percent = (to_percent(level) - VOLUME_STEP_PERCENT).max(0);
    from_percent(percent / VOLUME_STEP_PERCENT * VOLUME_STEP_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percent(level: f32) -> i32 {
        (level * 100.0).round() as i32
    }

    #[test]
    fn test_step_up_clamps_at_full() {
        assert_eq!(percent(step_up(0.98)), 100);
        assert_eq!(percent(step_up(1.0)), 100);
        assert!(step_up(0.98) <= 1.0);
    }

    #[test]
    fn test_step_down_clamps_at_zero() {
        assert_eq!(percent(step_down(0.02)), 0);
        assert_eq!(percent(step_down(0.0)), 0);
        assert!(step_down(0.02) >= 0.0);
    }

    #[test]
    fn test_steps_stay_on_grid() {
        assert_eq!(percent(step_up(0.5)), 55);
        assert_eq!(percent(step_down(0.5)), 45);
        assert_eq!(percent(step_up(0.52)), 55);
        assert_eq!(percent(step_down(0.52)), 45);

        // Repeated float steps must not drift off the grid
        let mut level = 0.0;
        for expected in (5..=100).step_by(5) {
            level = step_up(level);
            assert_eq!(percent(level), expected);
        }
    }

    #[test]
    fn test_snap_volume() {
        assert_eq!(percent(snap_volume(0.53)), 55);
        assert_eq!(percent(snap_volume(0.51)), 50);
        assert_eq!(percent(snap_volume(1.7)), 100);
        assert_eq!(percent(snap_volume(-0.3)), 0);
        assert_eq!(percent(snap_volume(f32::NAN)), 0);
    }

    #[test]
    fn test_add_rejects_duplicates_and_blank_names() {
        let mut config = Config::with_devices(Vec::new());
        assert!(config.add("AirPods"));
        assert!(!config.add("airpods"));
        assert!(!config.add("   "));
        assert_eq!(config.tracked_devices.len(), 1);
        assert_eq!(config.volume_for("AirPods"), DEFAULT_VOLUME);
    }

    #[test]
    fn test_remove_and_volume_for_untracked() {
        let mut config = Config::default();
        assert!(config.remove("zone vibe").is_some());
        assert!(config.remove("zone vibe").is_none());
        assert_eq!(config.names().collect::<Vec<_>>(), vec!["AirPods"]);
        assert_eq!(config.volume_for("Unknown"), DEFAULT_VOLUME);
    }

    #[test]
    fn test_increment_unknown_device() {
        let mut config = Config::default();
        assert_eq!(config.increment_volume("Speakers"), None);
        assert_eq!(config.decrement_volume("Speakers"), None);
    }

    #[test]
    fn test_sanitize() {
        let config = Config {
            version: 0,
            tracked_devices: vec![
                TrackedDevice {
                    name: " AirPods ".to_string(),
                    volume_level: 0.73,
                },
                TrackedDevice {
                    name: "AIRPODS".to_string(),
                    volume_level: 0.1,
                },
                TrackedDevice {
                    name: "".to_string(),
                    volume_level: 0.1,
                },
                TrackedDevice {
                    name: "Desk Speakers".to_string(),
                    volume_level: 3.0,
                },
            ],
        }
        .sanitize();

        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(
            config.names().collect::<Vec<_>>(),
            vec!["AirPods", "Desk Speakers"]
        );
        assert_eq!(percent(config.volume_for("airpods")), 75);
        assert_eq!(percent(config.volume_for("desk speakers")), 100);
    }

    #[test]
    fn test_missing_volume_defaults_on_deserialize() {
        let config: Config =
            serde_json::from_str(r#"{"tracked_devices":[{"name":"AirPods"}]}"#).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.volume_for("AirPods"), DEFAULT_VOLUME);
    }
}
