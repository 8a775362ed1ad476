//! Reads a BMP280 over SPI and prints temperature and pressure once per second.
//!
//! Everything here is written against the `embedded-hal` traits; the platform crate
//! only has to provide a [`Board`].

pub mod bmp280;
mod board;
mod error;
mod monitor;
mod sensor;

#[cfg(test)]
mod testing;

pub use board::{initialize, Board, BoardSensor};
pub use error::Error;
pub use monitor::Monitor;
pub use sensor::{BarometricSensor, SensorReading, SEA_LEVEL_PRESSURE_HPA};
