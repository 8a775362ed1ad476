//! Register-level stand-in for a BMP280 behind an SPI bus, for host tests.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{ErrorKind, SpiBus};

use crate::bmp280::registers;

/// Coefficients of the worked example in the BMP280 datasheet, as register bytes.
pub const DATASHEET_CALIBRATION: [u8; registers::CALIBRATION_LEN] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C,
    0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
];

/// Raw values of the datasheet example, 25.08 °C and 1006.53 hPa.
pub const EXAMPLE_ADC_P: i32 = 415148;
pub const EXAMPLE_ADC_T: i32 = 519888;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Frame {
    Address,
    Read(u8),
    Write(u8),
}

struct State {
    registers: [u8; 256],
    frame: Frame,
    writes: Vec<(u8, u8)>,
    data_reads: usize,
    status_reads: usize,
    /// Raw pressure and temperature the next finished conversion stores.
    sample: (i32, i32),
    /// Status reads that report a running conversion after `ctrl_meas` starts one.
    conversion_polls: u32,
    measuring_polls: u32,
    fail: bool,
}

impl State {
    /// Datasheet reset values: every data register reads as a skipped channel.
    fn power_on(&mut self) {
        self.store_raw(registers::SKIPPED_ADC, registers::SKIPPED_ADC);
        self.registers[registers::CTRL_MEAS as usize] = 0;
        self.registers[registers::CONFIG as usize] = 0;
        self.measuring_polls = 0;
    }

    fn store_raw(&mut self, pressure: i32, temperature: i32) {
        let split = |raw: i32| [(raw >> 12) as u8, (raw >> 4) as u8, ((raw & 0x0F) << 4) as u8];
        let base = registers::PRESS_MSB as usize;
        self.registers[base..base + 3].copy_from_slice(&split(pressure));
        self.registers[base + 3..base + 6].copy_from_slice(&split(temperature));
    }

    fn start_conversion(&mut self) {
        self.measuring_polls = self.conversion_polls;
        if self.measuring_polls == 0 {
            self.finish_conversion();
        }
    }

    fn finish_conversion(&mut self) {
        let (pressure, temperature) = self.sample;
        self.store_raw(pressure, temperature);
    }

    fn feed(&mut self, byte: u8) {
        self.frame = match self.frame {
            Frame::Address if byte & 0x80 != 0 => {
                // Every register lives above 0x80, so the address byte is the register.
                let register = byte;
                match register {
                    registers::PRESS_MSB => self.data_reads += 1,
                    registers::STATUS => self.status_reads += 1,
                    _ => {}
                }
                Frame::Read(register)
            }
            Frame::Address => Frame::Write(byte | 0x80),
            Frame::Write(register) => {
                self.writes.push((register, byte));
                match register {
                    registers::RESET if byte == registers::RESET_MAGIC => self.power_on(),
                    registers::RESET => {}
                    registers::CTRL_MEAS => {
                        self.registers[register as usize] = byte;
                        // Forced and normal mode both start a conversion right away.
                        if byte & 0b11 != 0 {
                            self.start_conversion();
                        }
                    }
                    _ => self.registers[register as usize] = byte,
                }
                Frame::Address
            }
            // Bytes clocked out during a read are don't-care.
            read @ Frame::Read(_) => read,
        };
    }

    fn next(&mut self) -> u8 {
        let Frame::Read(register) = self.frame else {
            return 0xFF;
        };
        self.frame = Frame::Read(register.wrapping_add(1));

        if register == registers::STATUS {
            if self.measuring_polls > 0 {
                self.measuring_polls -= 1;
                if self.measuring_polls == 0 {
                    self.finish_conversion();
                }
                return registers::STATUS_MEASURING;
            }
            return 0;
        }
        self.registers[register as usize]
    }
}

/// Both the bus and its chip-select share one state, so clones observe each other.
#[derive(Clone)]
pub struct FakeBmp280(Rc<RefCell<State>>);

impl FakeBmp280 {
    /// A freshly powered sensor with the datasheet coefficients.
    ///
    /// The data registers hold their reset values until a conversion finishes; conversions
    /// produce the datasheet example and take two status polls.
    pub fn new() -> Self {
        let mut state = State {
            registers: [0; 256],
            frame: Frame::Address,
            writes: Vec::new(),
            data_reads: 0,
            status_reads: 0,
            sample: (EXAMPLE_ADC_P, EXAMPLE_ADC_T),
            conversion_polls: 2,
            measuring_polls: 0,
            fail: false,
        };

        state.power_on();
        state.registers[registers::CHIP_ID as usize] = 0x58;
        let calibration = registers::CALIBRATION as usize;
        state.registers[calibration..calibration + registers::CALIBRATION_LEN]
            .copy_from_slice(&DATASHEET_CALIBRATION);

        Self(Rc::new(RefCell::new(state)))
    }

    pub fn chip_select(&self) -> FakeChipSelect {
        FakeChipSelect(self.0.clone())
    }

    pub fn set_register(&self, register: u8, value: u8) {
        self.0.borrow_mut().registers[register as usize] = value;
    }

    /// Loads 20-bit raw pressure and temperature, as if a conversion just produced them.
    /// Later conversions produce the same values.
    pub fn set_raw(&self, pressure: i32, temperature: i32) {
        let mut state = self.0.borrow_mut();
        state.sample = (pressure, temperature);
        state.store_raw(pressure, temperature);
    }

    /// Number of status reads that report a running conversion after one is started.
    pub fn set_conversion_polls(&self, polls: u32) {
        self.0.borrow_mut().conversion_polls = polls;
    }

    pub fn fail_transfers(&self, fail: bool) {
        self.0.borrow_mut().fail = fail;
    }

    /// All register writes so far, in order.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.0.borrow().writes.clone()
    }

    pub fn data_reads(&self) -> usize {
        self.0.borrow().data_reads
    }

    pub fn status_reads(&self) -> usize {
        self.0.borrow().status_reads
    }

    fn check(&self) -> Result<(), ErrorKind> {
        if self.0.borrow().fail {
            Err(ErrorKind::Other)
        } else {
            Ok(())
        }
    }
}

impl embedded_hal::spi::ErrorType for FakeBmp280 {
    type Error = ErrorKind;
}

impl SpiBus for FakeBmp280 {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.check()?;
        let mut state = self.0.borrow_mut();
        for word in words {
            *word = state.next();
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        let mut state = self.0.borrow_mut();
        for word in words {
            state.feed(*word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write)?;
        self.read(read)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let written = words.to_vec();
        self.transfer(words, &written)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Chip-select of [`FakeBmp280`]; asserting it starts a new command frame.
pub struct FakeChipSelect(Rc<RefCell<State>>);

impl embedded_hal::digital::ErrorType for FakeChipSelect {
    type Error = Infallible;
}

impl OutputPin for FakeChipSelect {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().frame = Frame::Address;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().frame = Frame::Address;
        Ok(())
    }
}
