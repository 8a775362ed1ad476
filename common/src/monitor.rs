use std::convert::Infallible;
use std::io::Write;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::sensor::{BarometricSensor, SensorReading};
use crate::Error;

/// Owns the sensor and prints a fresh reading once per [`Monitor::INTERVAL`].
///
/// There is one monitor per process; it is created by [`crate::initialize`] and
/// holds the only handle to the sensor, so the sea level reference set during
/// initialization stays as it is for the lifetime of the monitor.
pub struct Monitor<S, D> {
    sensor: S,
    delay: D,
}

impl<S, D> Monitor<S, D>
where
    S: BarometricSensor,
    D: DelayNs,
{
    /// Pause between the end of one poll and the start of the next.
    pub const INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(sensor: S, delay: D) -> Self {
        Self { sensor, delay }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Reads temperature, then pressure. Stops at the first failing read.
    pub fn read(&mut self) -> Result<SensorReading, Error> {
        let temperature_celsius = self.sensor.temperature()?;
        let pressure_hpa = self.sensor.pressure()?;

        Ok(SensorReading {
            temperature_celsius,
            pressure_hpa,
        })
    }

    /// Takes one reading and writes it to `out`.
    pub fn poll<W: Write>(&mut self, out: &mut W) -> Result<SensorReading, Error> {
        let reading = self.read()?;

        writeln!(out, "{reading}")?;
        out.flush()?;

        if let Some(altitude) = self.sensor.altitude_for(reading.pressure_hpa) {
            log::debug!(
                "Altitude: {:.1} m (sea level {:.2} hPa)",
                altitude,
                self.sensor.sea_level_pressure()
            );
        }

        Ok(reading)
    }

    /// Polls forever. Only returns if a poll fails; the error is passed on untouched.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<Infallible, Error> {
        log::info!("Polling every {:?}", Self::INTERVAL);

        loop {
            self.poll(out)?;
            self.delay.delay_ms(Self::INTERVAL.as_millis() as u32);
        }
    }
}
