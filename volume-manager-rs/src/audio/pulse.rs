//! PulseAudio / PipeWire backend driven through `pactl`.
//!
//! Every one-shot query runs under a hard deadline; a sound server that
//! stops answering costs one skipped cycle, never a stuck monitor.

use super::backend::{DeviceRegistry, VolumeControl};
use super::device::{AudioDevice, AudioError, DeviceEvent};
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PACTL: &str = "pactl";

/// How often a running command is checked for completion.
const WAIT_STEP: Duration = Duration::from_millis(10);

/// `pactl` implementation of the registry and volume seams.
#[derive(Debug, Clone)]
pub struct PulseBackend {
    timeout: Duration,
}

impl PulseBackend {
    /// Create a backend whose commands are killed after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `pactl` with `args` and return its stdout.
    fn run(&self, args: &[&str]) -> Result<String, AudioError> {
        let command = format!("{} {}", PACTL, args.join(" "));

        let mut child = Command::new(PACTL)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AudioError::CommandFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| AudioError::CommandFailed {
            command: command.clone(),
            message: "stdout not captured".to_string(),
        })?;

        // Drain stdout concurrently so a large listing cannot fill the pipe
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AudioError::Timeout {
                        operation: command,
                        timeout: self.timeout,
                    });
                }
                None => thread::sleep(WAIT_STEP),
            }
        };

        let output = reader.join().unwrap_or_default();

        if !status.success() {
            return Err(AudioError::CommandFailed {
                command,
                message: format!("exited with {status}"),
            });
        }

        Ok(output)
    }

    /// Start `pactl subscribe` and forward relevant events to `sender`.
    ///
    /// The thread ends when the subscription process exits or the receiver
    /// is dropped; the engine's fallback poll covers the gap.
    pub fn spawn_watcher(sender: Sender<DeviceEvent>) -> Result<JoinHandle<()>, AudioError> {
        let mut child = Command::new(PACTL)
            .arg("subscribe")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AudioError::NotificationsUnavailable(e.to_string()))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AudioError::NotificationsUnavailable("stdout not captured".to_string())
        })?;

        let handle = thread::Builder::new()
            .name("pactl-watcher".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if let Some(event) = parse_subscribe_line(&line) {
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                }
                let _ = child.kill();
                let _ = child.wait();
                warn!("pactl subscription ended; relying on polling");
            })?;

        Ok(handle)
    }
}

impl DeviceRegistry for PulseBackend {
    fn devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        let output = self.run(&["list", "sinks"])?;
        let devices = parse_sink_list(&output);
        debug!(count = devices.len(), "enumerated sinks");
        Ok(devices)
    }
}

impl VolumeControl for PulseBackend {
    fn apply_volume(&self, level: f32) -> Result<(), AudioError> {
        let percent = format!("{}%", (level.clamp(0.0, 1.0) * 100.0).round() as u32);
        // @DEFAULT_SINK@ is resolved by the server at call time
        self.run(&["set-sink-volume", "@DEFAULT_SINK@", &percent])?;
        Ok(())
    }
}

/// Parse the output of `pactl list sinks` into devices.
///
/// The sink `Name:` is the identifier and `Description:` the display name.
pub fn parse_sink_list(output: &str) -> Vec<AudioDevice> {
    let mut devices = Vec::new();
    let mut id: Option<String> = None;
    let mut name: Option<String> = None;

    let mut flush = |id: &mut Option<String>, name: &mut Option<String>| {
        if let (Some(i), Some(n)) = (id.take(), name.take()) {
            devices.push(AudioDevice::new(i, n));
        }
    };

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Sink #") {
            flush(&mut id, &mut name);
        } else if let Some(value) = trimmed.strip_prefix("Name: ") {
            // Only the first Name/Description per block; properties repeat keys
            if id.is_none() {
                id = Some(value.trim().to_string());
            }
        } else if let Some(value) = trimmed.strip_prefix("Description: ") {
            if name.is_none() {
                name = Some(value.trim().to_string());
            }
        }
    }
    flush(&mut id, &mut name);

    devices
}

/// Map one `pactl subscribe` line to a device event.
///
/// Only sink/card arrivals and removals and server changes (which include
/// default-sink changes) are relevant; volume `change` events on sinks are
/// ignored so our own volume writes do not retrigger evaluation.
pub fn parse_subscribe_line(line: &str) -> Option<DeviceEvent> {
    let rest = line.trim().strip_prefix("Event '")?;
    let (kind, rest) = rest.split_once("' on ")?;
    let (facility, index) = match rest.split_once(' ') {
        Some((facility, index)) => (facility, index.trim()),
        None => (rest.trim(), ""),
    };

    match (kind, facility) {
        ("new", "sink") | ("new", "card") => Some(DeviceEvent::DeviceAdded {
            device_id: format!("{facility} {index}"),
        }),
        ("remove", "sink") | ("remove", "card") => Some(DeviceEvent::DeviceRemoved {
            device_id: format!("{facility} {index}"),
        }),
        ("change", "server") => Some(DeviceEvent::DefaultDeviceChanged { device_id: None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINKS: &str = "\
Sink #0
\tState: SUSPENDED
\tName: alsa_output.pci-0000_00_1f.3.analog-stereo
\tDescription: Built-in Audio Analog Stereo
\tDriver: module-alsa-card.c
\tProperties:
\t\tdevice.description = \"Built-in Audio\"

Sink #12
\tState: RUNNING
\tName: bluez_output.AA_BB_CC_DD_EE_FF.1
\tDescription: Bob's AirPods Pro
\tDriver: module-bluez5-device.c
";

    #[test]
    fn test_parse_sink_list() {
        let devices = parse_sink_list(SINKS);
        assert_eq!(
            devices,
            vec![
                AudioDevice::new(
                    "alsa_output.pci-0000_00_1f.3.analog-stereo",
                    "Built-in Audio Analog Stereo"
                ),
                AudioDevice::new("bluez_output.AA_BB_CC_DD_EE_FF.1", "Bob's AirPods Pro"),
            ]
        );
    }

    #[test]
    fn test_parse_sink_list_empty() {
        assert!(parse_sink_list("").is_empty());
    }

    #[test]
    fn test_parse_subscribe_line() {
        assert_eq!(
            parse_subscribe_line("Event 'new' on sink #53"),
            Some(DeviceEvent::DeviceAdded {
                device_id: "sink #53".to_string()
            })
        );
        assert_eq!(
            parse_subscribe_line("Event 'remove' on card #7"),
            Some(DeviceEvent::DeviceRemoved {
                device_id: "card #7".to_string()
            })
        );
        assert_eq!(
            parse_subscribe_line("Event 'change' on server"),
            Some(DeviceEvent::DefaultDeviceChanged { device_id: None })
        );
    }

    #[test]
    fn test_volume_changes_are_ignored() {
        assert_eq!(parse_subscribe_line("Event 'change' on sink #53"), None);
        assert_eq!(parse_subscribe_line("Event 'new' on sink-input #9"), None);
        assert_eq!(parse_subscribe_line("garbage"), None);
    }
}
