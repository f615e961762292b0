//! Detection-and-control engine.
//!
//! Matches attached devices against the tracked list, edge-detects
//! connect/disconnect transitions, and applies per-device volume levels.

pub mod activity;
pub mod config;
pub mod handle;
pub mod matcher;
pub mod monitor;
pub mod orchestrator;
pub mod tracker;

pub use activity::{ActivityEntry, ActivityLog};
pub use config::{Config, TrackedDevice, DEFAULT_VOLUME};
pub use handle::EngineHandle;
pub use monitor::Monitor;
pub use orchestrator::{Engine, EngineEvent, EngineSnapshot, TrackedDeviceStatus, MUTED};
pub use tracker::{ConnectionEvent, ConnectionState, StateTracker, Transition};
