//! BMP280 register map and control register encodings.

pub const CALIBRATION: u8 = 0x88;
pub const CALIBRATION_LEN: usize = 24;
pub const CHIP_ID: u8 = 0xD0;
pub const RESET: u8 = 0xE0;
pub const STATUS: u8 = 0xF3;
pub const CTRL_MEAS: u8 = 0xF4;
pub const CONFIG: u8 = 0xF5;
pub const PRESS_MSB: u8 = 0xF7;
pub const DATA_LEN: usize = 6;

/// Writing this to [`RESET`] performs a power-on reset.
pub const RESET_MAGIC: u8 = 0xB6;

/// Set while a conversion is running.
pub const STATUS_MEASURING: u8 = 1 << 3;

/// Chip ids of the BMP280 (two engineering samples and mass production).
pub const KNOWN_CHIP_IDS: [u8; 3] = [0x56, 0x57, 0x58];

/// Raw ADC value of a skipped channel, also held by the data registers after reset.
pub const SKIPPED_ADC: i32 = 0x80000;

/// Address byte for a read; the MSB selects the direction on SPI.
pub fn read_address(register: u8) -> u8 {
    register | 0x80
}

/// Address byte for a write.
pub fn write_address(register: u8) -> u8 {
    register & 0x7F
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Oversampling {
    Skipped,
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    fn bits(self) -> u8 {
        match self {
            Self::Skipped => 0b000,
            Self::X1 => 0b001,
            Self::X2 => 0b010,
            Self::X4 => 0b011,
            Self::X8 => 0b100,
            Self::X16 => 0b101,
        }
    }

    /// Samples averaged per conversion.
    fn factor(self) -> u32 {
        match self {
            Self::Skipped => 0,
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }
}

/// IIR filter coefficient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    Off,
    X2,
    X4,
    X8,
    X16,
}

impl Filter {
    fn bits(self) -> u8 {
        match self {
            Self::Off => 0b000,
            Self::X2 => 0b001,
            Self::X4 => 0b010,
            Self::X8 => 0b011,
            Self::X16 => 0b100,
        }
    }
}

/// Inactive time between two conversions in normal mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Standby {
    #[default]
    Millis0_5,
    Millis62_5,
    Millis125,
    Millis250,
    Millis500,
    Millis1000,
    Millis2000,
    Millis4000,
}

impl Standby {
    fn bits(self) -> u8 {
        match self {
            Self::Millis0_5 => 0b000,
            Self::Millis62_5 => 0b001,
            Self::Millis125 => 0b010,
            Self::Millis250 => 0b011,
            Self::Millis500 => 0b100,
            Self::Millis1000 => 0b101,
            Self::Millis2000 => 0b110,
            Self::Millis4000 => 0b111,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    Sleep,
    /// A single conversion is started for every reading.
    Forced,
    /// Conversions run continuously, paced by [`Standby`].
    #[default]
    Normal,
}

impl Mode {
    fn bits(self) -> u8 {
        match self {
            Self::Sleep => 0b00,
            Self::Forced => 0b01,
            Self::Normal => 0b11,
        }
    }
}

/// Measurement settings written to `ctrl_meas` and `config`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub mode: Mode,
    pub standby: Standby,
    pub filter: Filter,
}

impl Default for Settings {
    /// Temperature x1, pressure x4, normal mode, 0.5 ms standby, filter 16.
    fn default() -> Self {
        Self {
            temperature_oversampling: Oversampling::X1,
            pressure_oversampling: Oversampling::X4,
            mode: Mode::Normal,
            standby: Standby::Millis0_5,
            filter: Filter::X16,
        }
    }
}

impl Settings {
    pub fn ctrl_meas(&self) -> u8 {
        self.ctrl_meas_with_mode(self.mode)
    }

    pub(crate) fn ctrl_meas_with_mode(&self, mode: Mode) -> u8 {
        self.temperature_oversampling.bits() << 5
            | self.pressure_oversampling.bits() << 2
            | mode.bits()
    }

    pub fn config(&self) -> u8 {
        // spi3w_en stays cleared, the sensor is wired for 4-wire SPI.
        self.standby.bits() << 5 | self.filter.bits() << 2
    }

    /// Worst-case duration of one conversion, rounded up to whole milliseconds
    /// (datasheet section 3.8.1, maximum column).
    pub fn max_measurement_time_ms(&self) -> u32 {
        let mut micros = 1250 + 2300 * self.temperature_oversampling.factor();
        if self.pressure_oversampling != Oversampling::Skipped {
            micros += 2300 * self.pressure_oversampling.factor() + 575;
        }
        micros.div_ceil(1000)
    }
}
