//! Bosch BMP280 temperature/pressure sensor on a 4-wire SPI bus.
//!
//! Register access follows the datasheet:
//! - Read: send `reg | 0x80`, then clock out the data; reads auto-increment the address.
//! - Write: send `reg & 0x7F` followed by the value.
//! - Chip id `0x58` at `0xD0`, soft reset by writing `0xB6` to `0xE0` (2 ms start-up).
//! - Raw readings are 20 bits wide and compensated with the factory trimming coefficients.

mod calibration;
pub mod registers;

pub use calibration::Calibration;
pub use registers::{Filter, Mode, Oversampling, Settings, Standby};

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::sensor::{BarometricSensor, SEA_LEVEL_PRESSURE_HPA};

/// Time the sensor needs after a soft reset before it answers again.
const STARTUP_TIME_MS: u32 = 2;

/// Status polls, 1 ms apart, after the expected conversion time has passed.
const MAX_CONVERSION_POLLS: u32 = 100;

const TEMPERATURE_RANGE: core::ops::RangeInclusive<f32> = -40.0..=85.0;
const PRESSURE_RANGE_HPA: core::ops::RangeInclusive<f32> = 300.0..=1100.0;

/// Which measurement a range error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Pressure,
}

/// Driver errors
#[derive(Debug)]
pub enum Error<E> {
    /// The SPI transfer itself failed.
    Spi(E),
    /// The chip id register holds something other than a BMP280 id.
    UnsupportedChip(u8),
    /// The trimming coefficients cannot be used for compensation.
    InvalidCalibration,
    /// A forced conversion did not finish in time.
    MeasurementTimeout,
    /// The requested channel is configured with [`Oversampling::Skipped`].
    MeasurementSkipped,
    /// The compensated value lies outside of the sensor's operating range.
    OutOfRange { quantity: Quantity, value: f32 },
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spi(err) => write!(f, "SPI transfer failed: {err:?}"),
            Self::UnsupportedChip(id) => write!(f, "unsupported chip id 0x{id:02X}"),
            Self::InvalidCalibration => write!(f, "invalid calibration data"),
            Self::MeasurementTimeout => write!(f, "conversion did not complete"),
            Self::MeasurementSkipped => write!(f, "measurement channel is skipped"),
            Self::OutOfRange {
                quantity: Quantity::Temperature,
                value,
            } => write!(f, "temperature reading {value:.2} °C is outside of the valid range"),
            Self::OutOfRange {
                quantity: Quantity::Pressure,
                value,
            } => write!(f, "pressure reading {value:.2} hPa is outside of the valid range"),
        }
    }
}

/// Raw, uncompensated ADC values of one burst read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawData {
    pub pressure: i32,
    pub temperature: i32,
}

impl RawData {
    fn from_registers(data: &[u8; registers::DATA_LEN]) -> Self {
        let raw = |msb: u8, lsb: u8, xlsb: u8| {
            (i32::from(msb) << 12) | (i32::from(lsb) << 4) | (i32::from(xlsb) >> 4)
        };

        Self {
            pressure: raw(data[0], data[1], data[2]),
            temperature: raw(data[3], data[4], data[5]),
        }
    }
}

pub struct Bmp280<SPI, D> {
    spi: SPI,
    delay: D,
    settings: Settings,
    calibration: Calibration,
    chip_id: u8,
    sea_level_hpa: f32,
}

impl<SPI, D> Bmp280<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Resets and configures the sensor with the default [`Settings`].
    pub fn new(spi: SPI, delay: D) -> Result<Self, Error<SPI::Error>> {
        Self::with_settings(spi, delay, Settings::default())
    }

    /// Resets the sensor, verifies its chip id, reads the calibration and applies `settings`.
    pub fn with_settings(spi: SPI, delay: D, settings: Settings) -> Result<Self, Error<SPI::Error>> {
        let mut sensor = Self {
            spi,
            delay,
            settings,
            calibration: Calibration::default(),
            chip_id: 0,
            sea_level_hpa: SEA_LEVEL_PRESSURE_HPA,
        };

        sensor.reset()?;

        sensor.chip_id = sensor.read_register(registers::CHIP_ID)?;
        if !registers::KNOWN_CHIP_IDS.contains(&sensor.chip_id) {
            log::error!("Unexpected chip id 0x{:02X} on the bus", sensor.chip_id);
            return Err(Error::UnsupportedChip(sensor.chip_id));
        }
        log::info!("BMP280 detected (chip id 0x{:02X})", sensor.chip_id);

        let mut data = [0u8; registers::CALIBRATION_LEN];
        sensor.read_registers(registers::CALIBRATION, &mut data)?;
        sensor.calibration = Calibration::parse(&data).ok_or(Error::InvalidCalibration)?;
        log::debug!("BMP280 calibration: {:?}", sensor.calibration);

        sensor.apply_settings(settings)?;

        // After reset the data registers hold 0x80000 until the first conversion is done.
        if settings.mode == Mode::Normal {
            sensor.wait_for_conversion()?;
        }

        Ok(sensor)
    }

    /// Soft-resets the sensor and waits for it to come back up.
    pub fn reset(&mut self) -> Result<(), Error<SPI::Error>> {
        self.write_register(registers::RESET, registers::RESET_MAGIC)?;
        self.delay.delay_ms(STARTUP_TIME_MS);
        Ok(())
    }

    /// Writes `settings` to the sensor. `config` goes first since it is only
    /// guaranteed to be accepted outside of normal mode.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), Error<SPI::Error>> {
        self.write_register(registers::CONFIG, settings.config())?;
        self.write_register(registers::CTRL_MEAS, settings.ctrl_meas())?;
        self.settings = settings;
        log::info!(
            "BMP280 configured (ctrl_meas 0x{:02X}, config 0x{:02X})",
            settings.ctrl_meas(),
            settings.config()
        );
        Ok(())
    }

    pub fn chip_id(&self) -> u8 {
        self.chip_id
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sea_level_pressure(&self) -> f32 {
        self.sea_level_hpa
    }

    /// Sets the pressure at sea level used by [`Self::altitude`].
    pub fn set_sea_level_pressure(&mut self, hpa: f32) {
        self.sea_level_hpa = hpa;
    }

    /// Takes a fresh measurement and returns the raw ADC values.
    pub fn read_raw(&mut self) -> Result<RawData, Error<SPI::Error>> {
        if self.settings.mode == Mode::Forced {
            self.trigger_conversion()?;
        }

        let mut data = [0u8; registers::DATA_LEN];
        self.read_registers(registers::PRESS_MSB, &mut data)?;
        let raw = RawData::from_registers(&data);
        log::trace!("BMP280 raw: {:?}", raw);
        Ok(raw)
    }

    /// Temperature in °C.
    pub fn temperature(&mut self) -> Result<f32, Error<SPI::Error>> {
        let raw = self.read_raw()?;
        let (temperature, _) = self.compensate_temperature(raw.temperature)?;
        Ok(temperature)
    }

    /// Pressure in hPa.
    pub fn pressure(&mut self) -> Result<f32, Error<SPI::Error>> {
        let raw = self.read_raw()?;
        let (_, t_fine) = self.compensate_temperature(raw.temperature)?;
        self.compensate_pressure(raw.pressure, t_fine)
    }

    /// Altitude in metres relative to the configured sea level pressure.
    pub fn altitude(&mut self) -> Result<f32, Error<SPI::Error>> {
        let pressure = self.pressure()?;
        Ok(self.altitude_for(pressure))
    }

    /// Altitude in metres for an already measured `pressure_hpa`.
    pub fn altitude_for(&self, pressure_hpa: f32) -> f32 {
        altitude(pressure_hpa, self.sea_level_hpa)
    }

    /// Gives the bus and the delay back.
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    fn compensate_temperature(&self, adc_t: i32) -> Result<(f32, i32), Error<SPI::Error>> {
        if self.settings.temperature_oversampling == Oversampling::Skipped {
            return Err(Error::MeasurementSkipped);
        }

        let (centi_celsius, t_fine) = self.calibration.compensate_temperature(adc_t);
        let temperature = centi_celsius as f32 / 100.0;

        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(Error::OutOfRange {
                quantity: Quantity::Temperature,
                value: temperature,
            });
        }

        Ok((temperature, t_fine))
    }

    fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> Result<f32, Error<SPI::Error>> {
        if self.settings.pressure_oversampling == Oversampling::Skipped {
            return Err(Error::MeasurementSkipped);
        }

        let pascal_q24_8 = self
            .calibration
            .compensate_pressure(adc_p, t_fine)
            .ok_or(Error::InvalidCalibration)?;
        let pressure = (f64::from(pascal_q24_8) / 25600.0) as f32;

        if !PRESSURE_RANGE_HPA.contains(&pressure) {
            return Err(Error::OutOfRange {
                quantity: Quantity::Pressure,
                value: pressure,
            });
        }

        Ok(pressure)
    }

    /// Starts a single conversion and waits until the sensor reports it done.
    fn trigger_conversion(&mut self) -> Result<(), Error<SPI::Error>> {
        let ctrl_meas = self.settings.ctrl_meas_with_mode(Mode::Forced);
        self.write_register(registers::CTRL_MEAS, ctrl_meas)?;
        self.wait_for_conversion()
    }

    /// Sleeps for the expected conversion time, then polls the measuring bit until it clears.
    fn wait_for_conversion(&mut self) -> Result<(), Error<SPI::Error>> {
        self.delay.delay_ms(self.settings.max_measurement_time_ms());

        for _ in 0..MAX_CONVERSION_POLLS {
            self.delay.delay_ms(1);
            let status = self.read_register(registers::STATUS)?;
            if status & registers::STATUS_MEASURING == 0 {
                return Ok(());
            }
        }

        log::warn!(
            "BMP280 conversion still running after {} ms",
            self.settings.max_measurement_time_ms() + MAX_CONVERSION_POLLS
        );
        Err(Error::MeasurementTimeout)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error<SPI::Error>> {
        let mut value = [0u8; 1];
        self.read_registers(register, &mut value)?;
        Ok(value[0])
    }

    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[registers::read_address(register)]),
                Operation::Read(buffer),
            ])
            .map_err(Error::Spi)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<SPI::Error>> {
        self.spi
            .write(&[registers::write_address(register), value])
            .map_err(Error::Spi)
    }
}

impl<SPI, D> BarometricSensor for Bmp280<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    fn temperature(&mut self) -> Result<f32, crate::Error> {
        Bmp280::temperature(self).map_err(crate::Error::from_measurement)
    }

    fn pressure(&mut self) -> Result<f32, crate::Error> {
        Bmp280::pressure(self).map_err(crate::Error::from_measurement)
    }

    fn sea_level_pressure(&self) -> f32 {
        self.sea_level_hpa
    }

    fn set_sea_level_pressure(&mut self, hpa: f32) {
        self.sea_level_hpa = hpa;
    }

    fn altitude_for(&self, pressure_hpa: f32) -> Option<f32> {
        Some(Bmp280::altitude_for(self, pressure_hpa))
    }
}

/// International barometric formula.
pub fn altitude(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44330.0 * (1.0 - (pressure_hpa / sea_level_hpa).powf(0.1903))
}
