// Copyright (c) 2026 The nixie-rtc developers
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Conversion between the DS1307's packed BCD time registers and `ClockValue`.
//!
//! Each register holds two decimal digits, the ones in bits 3:0 and the tens
//! in the upper nibble. How many tens bits a field has depends on its range,
//! and the remaining upper bits carry flags. The hours register is the odd
//! one out: bit 6 selects the 12-hour convention, in which case bit 5 is the
//! PM flag and only bit 4 holds the tens digit. In the 24-hour convention
//! bits 5:4 hold the tens digit.

use crate::datetime::{ClockValue, Meridiem, BASE_YEAR};

use super::{BitFlags, Register};

/// Number of timekeeping registers, 0x00 through 0x06.
pub const TIME_REGISTERS: usize = 7;

/// Tens-digit masks, per field.
pub struct TensMask;

impl TensMask {
    /// Bit 7 is the oscillator-halt flag.
    pub const SECONDS: u8 = 0b0111_0000;
    pub const MINUTES: u8 = 0b0111_0000;
    pub const HOURS_12H: u8 = 0b0001_0000;
    pub const HOURS_24H: u8 = 0b0011_0000;
    pub const DAY: u8 = 0b0011_0000;
    pub const MONTH: u8 = 0b0001_0000;
    pub const YEAR: u8 = 0b1111_0000;
}

/// Converts a packed BCD byte to decimal, using only the tens bits in `tens_mask`.
pub fn bcd_to_decimal(value: u8, tens_mask: u8) -> u8 {
    ((value & tens_mask) >> 4) * 10 + (value & 0x0F)
}

/// Converts a decimal value (0-99) to packed BCD.
pub fn decimal_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Decodes the hours register.
pub fn decode_hours(value: u8) -> (u8, Option<Meridiem>) {
    if value & BitFlags::H12 != 0 {
        let meridiem = if value & BitFlags::PM != 0 {
            Meridiem::Pm
        } else {
            Meridiem::Am
        };

        (bcd_to_decimal(value, TensMask::HOURS_12H), Some(meridiem))
    } else {
        (bcd_to_decimal(value, TensMask::HOURS_24H), None)
    }
}

/// Encodes the hours register.
pub fn encode_hours(hour: u8, meridiem: Option<Meridiem>) -> u8 {
    let hours = decimal_to_bcd(hour);

    match meridiem {
        None => hours,
        Some(Meridiem::Am) => hours | BitFlags::H12,
        Some(Meridiem::Pm) => hours | BitFlags::H12 | BitFlags::PM,
    }
}

/// Decodes the timekeeping registers, indexed by register address.
///
/// The day-of-week register is ignored, as is the oscillator-halt flag.
pub fn decode(registers: &[u8; TIME_REGISTERS]) -> ClockValue {
    let second = bcd_to_decimal(registers[Register::SECONDS as usize], TensMask::SECONDS);
    let minute = bcd_to_decimal(registers[Register::MINUTES as usize], TensMask::MINUTES);
    let (hour, meridiem) = decode_hours(registers[Register::HOURS as usize]);
    let day = bcd_to_decimal(registers[Register::DAY as usize], TensMask::DAY);
    let month = bcd_to_decimal(registers[Register::MONTH as usize], TensMask::MONTH);
    let year = bcd_to_decimal(registers[Register::YEAR as usize], TensMask::YEAR);
    let year = BASE_YEAR + u16::from(year);

    match meridiem {
        Some(meridiem) => ClockValue::new_12h(year, month, day, hour, minute, second, meridiem),
        None => ClockValue::new(year, month, day, hour, minute, second),
    }
}

/// Encodes `value` into timekeeping registers, indexed by register address.
///
/// The seconds register is written with the oscillator-halt flag cleared.
/// The day-of-week slot is left at 0. Years are stored modulo 100, counting
/// from 2000.
pub fn encode(value: &ClockValue) -> [u8; TIME_REGISTERS] {
    let mut registers = [0u8; TIME_REGISTERS];
    let year = (value.year().saturating_sub(BASE_YEAR) % 100) as u8;

    registers[Register::SECONDS as usize] = decimal_to_bcd(value.second());
    registers[Register::MINUTES as usize] = decimal_to_bcd(value.minute());
    registers[Register::HOURS as usize] = encode_hours(value.hour(), value.meridiem());
    registers[Register::DAY as usize] = decimal_to_bcd(value.day());
    registers[Register::MONTH as usize] = decimal_to_bcd(value.month());
    registers[Register::YEAR as usize] = decimal_to_bcd(year);

    registers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_packing() {
        assert_eq!(decimal_to_bcd(59), 0x59);
        assert_eq!(decimal_to_bcd(0), 0x00);
        assert_eq!(bcd_to_decimal(0x37, 0xF0), 37);
    }

    #[test]
    fn seconds_ignore_halt_flag() {
        assert_eq!(bcd_to_decimal(0x80 | 0x42, TensMask::SECONDS), 42);
    }

    #[test]
    fn hours_bit_width_asymmetry() {
        // 12-hour: only bit 4 is a tens bit, bit 5 is PM.
        assert_eq!(decode_hours(0b0111_0000), (10, Some(Meridiem::Pm)));
        assert_eq!(decode_hours(0b0101_0010), (12, Some(Meridiem::Am)));
        // 24-hour: bits 5:4 are tens bits.
        assert_eq!(decode_hours(0b0010_0010), (22, None));

        assert_eq!(encode_hours(10, Some(Meridiem::Am)), 0b0101_0000);
        assert_eq!(encode_hours(10, Some(Meridiem::Pm)), 0b0111_0000);
        assert_eq!(encode_hours(22, None), 0b0010_0010);
    }

    #[test]
    fn hours_round_trip() {
        for hour in 0..24 {
            assert_eq!(decode_hours(encode_hours(hour, None)), (hour, None));
        }

        for hour in 1..=12 {
            for meridiem in [Meridiem::Am, Meridiem::Pm] {
                assert_eq!(
                    decode_hours(encode_hours(hour, Some(meridiem))),
                    (hour, Some(meridiem))
                );
            }
        }
    }

    #[test]
    fn fields_round_trip() {
        for n in 0..60 {
            let value = ClockValue::new(2000 + u16::from(n), n % 12 + 1, n % 31 + 1, n % 24, n, n);
            assert_eq!(decode(&encode(&value)), value);
        }

        for year in 2000..2100 {
            let value = ClockValue::new(year, 12, 31, 23, 59, 59);
            assert_eq!(decode(&encode(&value)), value);
        }

        let value = ClockValue::new_12h(2017, 2, 13, 6, 14, 10, Meridiem::Pm);
        assert_eq!(decode(&encode(&value)), value);
    }

    #[test]
    fn encode_layout() {
        let value = ClockValue::new_12h(2017, 2, 13, 6, 14, 10, Meridiem::Pm);

        assert_eq!(encode(&value), [0x10, 0x14, 0x66, 0x00, 0x13, 0x02, 0x17]);
    }

    #[test]
    fn year_offset() {
        let registers = encode(&ClockValue::new(2099, 1, 1, 0, 0, 0));
        assert_eq!(registers[Register::YEAR as usize], 0x99);

        let registers = encode(&ClockValue::new(2100, 1, 1, 0, 0, 0));
        assert_eq!(registers[Register::YEAR as usize], 0x00);
    }
}
