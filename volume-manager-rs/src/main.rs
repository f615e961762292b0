#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use anyhow::Result;
use tracing::info;
use volume_manager_rs::{init_logging, start, Settings};

fn main() -> Result<()> {
    let settings = Settings::from_env();
    init_logging(&settings.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "volume manager starting");
    let service = start(&settings)?;

    let snapshot = service.engine().snapshot();
    for device in &snapshot.tracked {
        info!(
            name = %device.name,
            volume = device.volume_percent,
            "tracked device"
        );
    }

    service.wait()
}
