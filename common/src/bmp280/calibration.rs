use super::registers::CALIBRATION_LEN;

/// Trimming coefficients burned into the sensor's NVM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl Calibration {
    /// Decodes the little-endian block starting at `0x88`.
    ///
    /// Returns `None` if the block cannot come from a working sensor: a floating bus reads
    /// back as all-equal bytes, and `dig_T1`/`dig_P1` of zero would divide by zero later on.
    pub fn parse(data: &[u8; CALIBRATION_LEN]) -> Option<Self> {
        if data.iter().all(|byte| *byte == data[0]) {
            return None;
        }

        let unsigned = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([data[i], data[i + 1]]);

        let calibration = Self {
            dig_t1: unsigned(0),
            dig_t2: signed(2),
            dig_t3: signed(4),
            dig_p1: unsigned(6),
            dig_p2: signed(8),
            dig_p3: signed(10),
            dig_p4: signed(12),
            dig_p5: signed(14),
            dig_p6: signed(16),
            dig_p7: signed(18),
            dig_p8: signed(20),
            dig_p9: signed(22),
        };

        if calibration.dig_t1 == 0 || calibration.dig_p1 == 0 {
            return None;
        }

        Some(calibration)
    }

    /// Returns the temperature in 1/100 °C together with `t_fine`, which the pressure
    /// compensation needs.
    pub fn compensate_temperature(&self, adc_t: i32) -> (i32, i32) {
        // i64 keeps the squared term from overflowing on out-of-family raw values.
        let adc_t = i64::from(adc_t);
        let t1 = i64::from(self.dig_t1);
        let t2 = i64::from(self.dig_t2);
        let t3 = i64::from(self.dig_t3);

        let var1 = (((adc_t >> 3) - (t1 << 1)) * t2) >> 11;
        let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * t3) >> 14;
        let t_fine = (var1 + var2) as i32;
        let temperature = (t_fine * 5 + 128) >> 8;

        (temperature, t_fine)
    }

    /// Returns the pressure in Pa as unsigned Q24.8, or `None` if the coefficients make the
    /// conversion divide by zero or leave the 64-bit range.
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> Option<u32> {
        let p1 = i64::from(self.dig_p1);
        let p2 = i64::from(self.dig_p2);
        let p3 = i64::from(self.dig_p3);
        let p4 = i64::from(self.dig_p4);
        let p5 = i64::from(self.dig_p5);
        let p6 = i64::from(self.dig_p6);
        let p7 = i64::from(self.dig_p7);
        let p8 = i64::from(self.dig_p8);
        let p9 = i64::from(self.dig_p9);

        // Corrupt coefficients that still pass `parse` can push any of these terms past i64.
        let var1 = i64::from(t_fine) - 128_000;
        let var2 = var1.checked_mul(var1)?.checked_mul(p6)?;
        let var2 = var2.checked_add(var1.checked_mul(p5)?.checked_mul(1 << 17)?)?;
        let var2 = var2.checked_add(p4.checked_mul(1 << 35)?)?;
        let var1 = (var1.checked_mul(var1)?.checked_mul(p3)? >> 8)
            .checked_add(var1.checked_mul(p2)?.checked_mul(1 << 12)?)?;
        let var1 = (1i64 << 47).checked_add(var1)?.checked_mul(p1)? >> 33;

        let p = 1_048_576 - i64::from(adc_p);
        let p = p
            .checked_mul(1 << 31)?
            .checked_sub(var2)?
            .checked_mul(3125)?
            .checked_div(var1)?;
        let var1 = p9.checked_mul(p >> 13)?.checked_mul(p >> 13)? >> 25;
        let var2 = p8.checked_mul(p)? >> 19;
        let p = (p.checked_add(var1)?.checked_add(var2)? >> 8).checked_add(p7 << 4)?;

        u32::try_from(p).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DATASHEET_CALIBRATION, EXAMPLE_ADC_P, EXAMPLE_ADC_T};

    #[test]
    fn test_parse_datasheet_coefficients() {
        let calibration = Calibration::parse(&DATASHEET_CALIBRATION).unwrap();
        assert_eq!(calibration.dig_t1, 27504);
        assert_eq!(calibration.dig_t2, 26435);
        assert_eq!(calibration.dig_t3, -1000);
        assert_eq!(calibration.dig_p1, 36477);
        assert_eq!(calibration.dig_p2, -10685);
        assert_eq!(calibration.dig_p6, -7);
        assert_eq!(calibration.dig_p8, -14600);
        assert_eq!(calibration.dig_p9, 6000);
    }

    #[test]
    fn test_parse_rejects_floating_bus() {
        assert_eq!(Calibration::parse(&[0xFF; CALIBRATION_LEN]), None);
        assert_eq!(Calibration::parse(&[0x00; CALIBRATION_LEN]), None);
    }

    #[test]
    fn test_parse_rejects_zero_divisors() {
        let mut bytes = DATASHEET_CALIBRATION;
        bytes[6] = 0;
        bytes[7] = 0;
        assert_eq!(Calibration::parse(&bytes), None);
    }

    #[test]
    fn test_compensation_matches_datasheet() {
        let calibration = Calibration::parse(&DATASHEET_CALIBRATION).unwrap();

        let (temperature, t_fine) = calibration.compensate_temperature(EXAMPLE_ADC_T);
        assert_eq!(t_fine, 128422);
        assert_eq!(temperature, 2508);

        let pressure = calibration.compensate_pressure(EXAMPLE_ADC_P, t_fine).unwrap();
        assert_eq!(pressure, 25767233);
    }

    #[test]
    fn test_pressure_overflow_is_rejected() {
        let mut bytes = DATASHEET_CALIBRATION;
        // dig_P1 = 1 passes `parse` but blows up the second half of the conversion.
        bytes[6] = 1;
        bytes[7] = 0;
        let calibration = Calibration::parse(&bytes).unwrap();
        let (_, t_fine) = calibration.compensate_temperature(EXAMPLE_ADC_T);

        assert_eq!(calibration.compensate_pressure(EXAMPLE_ADC_P, t_fine), None);
    }
}
