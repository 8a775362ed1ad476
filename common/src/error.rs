use crate::bmp280;

/// Everything that can stop the monitor.
///
/// None of these are recovered from locally; they travel up to `main` and end the process.
#[derive(Debug)]
pub enum Error {
    /// The SPI bus or the chip-select pin could not be claimed.
    HardwareUnavailable(String),
    /// Something answered on the bus, but it is not a BMP280.
    SensorNotFound { chip_id: u8 },
    /// The handshake with the sensor failed or its calibration data is unusable.
    SensorProtocol(String),
    /// A transfer failed while taking a measurement.
    SensorCommunication(String),
    /// The sensor answered with a value outside of its valid range.
    SensorValue(String),
    /// Writing the readings to the output failed.
    Output(std::io::Error),
}

impl Error {
    /// Classifies a driver error raised while the driver is being constructed.
    pub fn from_handshake<E: core::fmt::Debug>(err: bmp280::Error<E>) -> Self {
        match err {
            bmp280::Error::UnsupportedChip(chip_id) => Self::SensorNotFound { chip_id },
            other => Self::SensorProtocol(other.to_string()),
        }
    }

    /// Classifies a driver error raised while reading a measurement.
    pub fn from_measurement<E: core::fmt::Debug>(err: bmp280::Error<E>) -> Self {
        match err {
            bmp280::Error::Spi(_) | bmp280::Error::MeasurementTimeout => {
                Self::SensorCommunication(err.to_string())
            }
            bmp280::Error::MeasurementSkipped | bmp280::Error::OutOfRange { .. } => {
                Self::SensorValue(err.to_string())
            }
            // The chip id is only checked during the handshake.
            bmp280::Error::UnsupportedChip(_) | bmp280::Error::InvalidCalibration => {
                Self::SensorProtocol(err.to_string())
            }
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HardwareUnavailable(what) => write!(f, "hardware unavailable: {what}"),
            Self::SensorNotFound { chip_id } => {
                write!(f, "no BMP280 found on the bus (chip id 0x{chip_id:02X})")
            }
            Self::SensorProtocol(what) => write!(f, "sensor protocol error: {what}"),
            Self::SensorCommunication(what) => write!(f, "sensor communication error: {what}"),
            Self::SensorValue(what) => write!(f, "sensor value error: {what}"),
            Self::Output(err) => write!(f, "failed to write readings: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Output(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Output(err)
    }
}
