//! Platform services: preference persistence and runtime settings.

pub mod preferences;
pub mod settings;

pub use preferences::{PreferenceStore, PreferencesError};
pub use settings::Settings;
