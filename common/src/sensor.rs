use crate::Error;

/// Sea level reference the monitor configures the sensor with, in hPa.
pub const SEA_LEVEL_PRESSURE_HPA: f32 = 1013.25;

/// One temperature/pressure pair as produced by a single poll.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorReading {
    pub temperature_celsius: f32,
    pub pressure_hpa: f32,
}

/// Renders the two output lines, both values with two decimals.
impl core::fmt::Display for SensorReading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Temperature: {:.2} °C", self.temperature_celsius)?;
        write!(f, "Pressure: {:.2} hPa", self.pressure_hpa)
    }
}

/// A sensor that measures temperature and barometric pressure.
///
/// Implemented by the BMP280 driver, and by stubs in tests.
pub trait BarometricSensor {
    /// Takes a fresh measurement and returns the temperature in °C.
    fn temperature(&mut self) -> Result<f32, Error>;

    /// Takes a fresh measurement and returns the pressure in hPa.
    fn pressure(&mut self) -> Result<f32, Error>;

    /// The sea level reference in hPa.
    fn sea_level_pressure(&self) -> f32;

    /// Replaces the sea level reference, in hPa.
    fn set_sea_level_pressure(&mut self, hpa: f32);

    /// Altitude in metres for an already measured pressure, if the sensor can tell.
    fn altitude_for(&self, _pressure_hpa: f32) -> Option<f32> {
        None
    }
}

#[test]
fn test_reading_renders_two_decimals() {
    let reading = SensorReading {
        temperature_celsius: 23.456,
        pressure_hpa: 1012.3,
    };

    assert_eq!(
        reading.to_string(),
        "Temperature: 23.46 °C\nPressure: 1012.30 hPa"
    );
}

#[test]
fn test_reading_renders_negative_and_whole_values() {
    let reading = SensorReading {
        temperature_celsius: -5.0,
        pressure_hpa: 1000.0,
    };

    let rendered = reading.to_string();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines, ["Temperature: -5.00 °C", "Pressure: 1000.00 hPa"]);
}
