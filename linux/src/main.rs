mod board;
mod config;

use anyhow::Context;

use board::LinuxBoard;
use config::HardwareConfig;

/// A minimal main function that brings up the sensor and polls it until interrupted.
///
/// Readings go to stdout, logs go to stderr (`RUST_LOG` controls the level).
/// Any failure ends the process with a diagnostic and a non-zero exit code.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = HardwareConfig::from_env()?;
    log::info!("Using {:?}", config);

    let mut board = LinuxBoard::new(config);
    let mut monitor =
        bmp280_monitor_common::initialize(&mut board).context("Failed to initialize the BMP280")?;

    let stdout = std::io::stdout();
    match monitor
        .run(&mut stdout.lock())
        .context("Stopped polling the BMP280")? {}
}
