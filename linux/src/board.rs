use bmp280_monitor_common::{Board, Error};
use gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, Delay, SPIError, SpidevBus};
use spidev::{SpiModeFlags, SpidevOptions};

use crate::config::HardwareConfig;

/// The sensor as seen from a Linux host: a spidev bus plus a GPIO line as chip-select.
pub struct LinuxBoard {
    config: HardwareConfig,
}

impl LinuxBoard {
    const CONSUMER: &'static str = "bmp280-monitor";

    pub fn new(config: HardwareConfig) -> Self {
        Self { config }
    }
}

impl Board for LinuxBoard {
    type Bus = SpidevBus;
    type ChipSelect = CdevPin;
    type Delay = Delay;

    fn acquire_spi(&mut self) -> Result<Self::Bus, Error> {
        let path = &self.config.spi_device;
        let unavailable =
            |e: SPIError| Error::HardwareUnavailable(format!("SPI bus {}: {e}", path.display()));

        let mut bus = SpidevBus::open(path).map_err(unavailable)?;

        // The BMP280 samples on the rising edge with the clock idling low (mode 0).
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(self.config.spi_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        bus.configure(&options).map_err(|e| unavailable(e.into()))?;

        log::debug!(
            "Opened {} at {} Hz, mode 0",
            path.display(),
            self.config.spi_speed_hz
        );
        Ok(bus)
    }

    fn configure_chip_select(&mut self) -> Result<Self::ChipSelect, Error> {
        let chip_path = &self.config.gpio_chip;
        let line_offset = self.config.chip_select_line;
        let unavailable = |e: gpio_cdev::Error| {
            Error::HardwareUnavailable(format!(
                "chip-select line {line_offset} on {}: {e}",
                chip_path.display()
            ))
        };

        let mut chip = Chip::new(chip_path).map_err(unavailable)?;
        // Requested high so the sensor stays deselected until the first transfer.
        let handle = chip
            .get_line(line_offset)
            .and_then(|line| line.request(LineRequestFlags::OUTPUT, 1, Self::CONSUMER))
            .map_err(unavailable)?;

        CdevPin::new(handle).map_err(unavailable)
    }

    fn delay(&mut self) -> Self::Delay {
        Delay
    }
}
