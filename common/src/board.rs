use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use embedded_hal_bus::spi::ExclusiveDevice;

use crate::bmp280::Bmp280;
use crate::monitor::Monitor;
use crate::sensor::SEA_LEVEL_PRESSURE_HPA;
use crate::Error;

/// A trait to provide the hardware the sensor is wired to.
///
/// To be implemented for each platform.
pub trait Board {
    type Bus: SpiBus;
    type ChipSelect: OutputPin;
    type Delay: DelayNs;

    /// Claims the SPI bus (clock, data-out and data-in lines).
    fn acquire_spi(&mut self) -> Result<Self::Bus, Error>;

    /// Claims the chip-select line and configures it as an output.
    fn configure_chip_select(&mut self) -> Result<Self::ChipSelect, Error>;

    fn delay(&mut self) -> Self::Delay;
}

/// The sensor driver as built from the parts of a [`Board`].
pub type BoardSensor<B> = Bmp280<
    ExclusiveDevice<<B as Board>::Bus, <B as Board>::ChipSelect, <B as Board>::Delay>,
    <B as Board>::Delay,
>;

/// Brings up the sensor on `board` and returns the monitor that owns it.
///
/// Runs bus-acquire, pin-configure, driver-construct and set-sea-level-reference
/// once each, in that order. The first failing step ends initialization.
pub fn initialize<B: Board>(board: &mut B) -> Result<Monitor<BoardSensor<B>, B::Delay>, Error> {
    let bus = board.acquire_spi()?;
    log::info!("SPI bus acquired");

    let chip_select = board.configure_chip_select()?;
    log::info!("Chip-select configured");

    let device = ExclusiveDevice::new(bus, chip_select, board.delay())
        .map_err(|e| Error::HardwareUnavailable(format!("failed to deassert chip-select: {e:?}")))?;
    let mut sensor = Bmp280::new(device, board.delay()).map_err(Error::from_handshake)?;

    sensor.set_sea_level_pressure(SEA_LEVEL_PRESSURE_HPA);
    log::info!("Sea level pressure set to {:.2} hPa", SEA_LEVEL_PRESSURE_HPA);

    Ok(Monitor::new(sensor, board.delay()))
}
