use std::path::PathBuf;

use anyhow::Context;

/// Where the sensor is wired on the host.
///
/// Defaults describe a Raspberry Pi with the sensor on SPI0 and chip-select on GPIO5.
/// Each field can be overridden through an environment variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HardwareConfig {
    /// spidev node of the bus carrying SCK, MOSI and MISO.
    pub spi_device: PathBuf,
    pub spi_speed_hz: u32,
    /// GPIO character device the chip-select line belongs to.
    pub gpio_chip: PathBuf,
    pub chip_select_line: u32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            spi_device: PathBuf::from("/dev/spidev0.0"),
            spi_speed_hz: 100_000,
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            chip_select_line: 5,
        }
    }
}

impl HardwareConfig {
    pub const SPI_DEVICE_VAR: &'static str = "BMP280_SPI_DEVICE";
    pub const SPI_SPEED_VAR: &'static str = "BMP280_SPI_SPEED_HZ";
    pub const GPIO_CHIP_VAR: &'static str = "BMP280_GPIO_CHIP";
    pub const CS_LINE_VAR: &'static str = "BMP280_CS_LINE";

    /// Reads the overrides from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(Self::SPI_DEVICE_VAR) {
            config.spi_device = path.into();
        }
        if let Some(speed) = lookup(Self::SPI_SPEED_VAR) {
            config.spi_speed_hz = speed.trim().parse().with_context(|| {
                format!(
                    "{} must be a frequency in Hz, got {speed:?}",
                    Self::SPI_SPEED_VAR
                )
            })?;
        }
        if let Some(path) = lookup(Self::GPIO_CHIP_VAR) {
            config.gpio_chip = path.into();
        }
        if let Some(line) = lookup(Self::CS_LINE_VAR) {
            config.chip_select_line = line.trim().parse().with_context(|| {
                format!("{} must be a line offset, got {line:?}", Self::CS_LINE_VAR)
            })?;
        }

        Ok(config)
    }
}
