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

//! Calendar date and time of day, as kept by the RTC.
//!
//! A [`ClockValue`] is an immutable value. It either follows the 24-hour
//! convention, or the 12-hour convention with an AM/PM [`Meridiem`]. The
//! meridiem only exists in the 12-hour case, so there's no AM/PM flag to
//! ignore on a 24-hour value.
//!
//! [`ClockValue`]: struct.ClockValue.html
//! [`Meridiem`]: enum.Meridiem.html

use std::error;
use std::fmt;
use std::result;

/// Year that two-digit years are counted from.
pub const BASE_YEAR: u16 = 2000;

/// Half of the day in the 12-hour convention.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    fn toggled(self) -> Meridiem {
        match self {
            Meridiem::Am => Meridiem::Pm,
            Meridiem::Pm => Meridiem::Am,
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Meridiem::Am => write!(f, "AM"),
            Meridiem::Pm => write!(f, "PM"),
        }
    }
}

/// Time field that can be stepped by the adjustment buttons.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Field {
    Hour,
    Minute,
    Second,
}

/// Errors that can occur when parsing build date and time strings.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ParseError {
    /// The date or time string is shorter than its fixed layout.
    TooShort,
    /// The month abbreviation doesn't start with a known letter.
    UnknownMonth(char),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::TooShort => write!(f, "Date or time string too short"),
            ParseError::UnknownMonth(c) => write!(f, "Unknown month abbreviation: {}", c),
        }
    }
}

impl error::Error for ParseError {}

/// Result type returned from parsing methods that can have `ParseError`s.
pub type Result<T> = result::Result<T, ParseError>;

/// Calendar date and time of day.
///
/// Values aren't range-checked. `ClockValue` stores whatever it's given, and
/// the RTC will store whatever it's sent.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ClockValue {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    meridiem: Option<Meridiem>,
}

impl ClockValue {
    /// Constructs a new `ClockValue` using the 24-hour convention.
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> ClockValue {
        ClockValue {
            year,
            month,
            day,
            hour,
            minute,
            second,
            meridiem: None,
        }
    }

    /// Constructs a new `ClockValue` using the 12-hour convention.
    ///
    /// `hour` should be in the range 1-12.
    pub fn new_12h(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        meridiem: Meridiem,
    ) -> ClockValue {
        ClockValue {
            meridiem: Some(meridiem),
            ..ClockValue::new(year, month, day, hour, minute, second)
        }
    }

    /// Constructs a new `ClockValue` from a compiler-style build date and time.
    ///
    /// `date` uses the `"Mmm DD YYYY"` layout (for instance `"Feb 13 2017"`),
    /// and `time` uses `"HH:MM:SS"`. Fields are read at fixed character
    /// positions. A non-digit in the tens position counts as zero, so
    /// space-padded days such as `"Feb  5 2017"` are accepted. Only the last
    /// two digits of the year are used.
    ///
    /// If `twelve_hour` is `true`, hours above 12 are moved to the 12-hour
    /// convention and marked PM. Every other hour is marked AM as-is.
    ///
    /// No range checking is done. A day of `"40"` produces day 40.
    pub fn from_build_strings(date: &str, time: &str, twelve_hour: bool) -> Result<ClockValue> {
        let date = date.as_bytes();
        let time = time.as_bytes();

        if date.len() < 11 || time.len() < 8 {
            return Err(ParseError::TooShort);
        }

        let year = BASE_YEAR + u16::from(two_digits(&date[9..11]));
        let month = month_number([date[0], date[1], date[2]])?;
        let day = two_digits(&date[4..6]);
        let mut hour = two_digits(&time[0..2]);
        let minute = two_digits(&time[3..5]);
        let second = two_digits(&time[6..8]);

        let meridiem = if twelve_hour {
            if hour > 12 {
                hour -= 12;
                Some(Meridiem::Pm)
            } else {
                Some(Meridiem::Am)
            }
        } else {
            None
        };

        Ok(ClockValue {
            year,
            month,
            day,
            hour,
            minute,
            second,
            meridiem,
        })
    }

    /// Returns the absolute year, for instance 2017.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Returns the month (1-12).
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Returns the day of the month (1-31).
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Returns the hour, 0-23 or 1-12 depending on the convention.
    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    /// Returns the meridiem, or `None` for the 24-hour convention.
    pub fn meridiem(&self) -> Option<Meridiem> {
        self.meridiem
    }

    /// Returns `true` if the 12-hour convention is in effect.
    pub fn is_12_hour(&self) -> bool {
        self.meridiem.is_some()
    }

    /// Returns `true` for a 12-hour value in the PM half of the day.
    pub fn is_pm(&self) -> bool {
        self.meridiem == Some(Meridiem::Pm)
    }

    /// Returns a copy with the hour replaced.
    pub fn with_hour(&self, hour: u8) -> ClockValue {
        ClockValue { hour, ..*self }
    }

    /// Returns a copy with the minute replaced.
    pub fn with_minute(&self, minute: u8) -> ClockValue {
        ClockValue { minute, ..*self }
    }

    /// Returns a copy with the second replaced.
    pub fn with_second(&self, second: u8) -> ClockValue {
        ClockValue { second, ..*self }
    }

    /// Returns a copy with `field` advanced by one step.
    ///
    /// Minutes and seconds wrap from 59 to 0 without carrying into the next
    /// field. Hours wrap from 23 to 0 in the 24-hour convention. In the
    /// 12-hour convention they run 1 through 12, and the meridiem flips when
    /// the hour reaches 12. The date is never touched.
    pub fn incremented(&self, field: Field) -> ClockValue {
        match field {
            Field::Hour => match self.meridiem {
                None => self.with_hour(self.hour.wrapping_add(1) % 24),
                Some(meridiem) => {
                    let hour = self.hour % 12 + 1;
                    let meridiem = if hour == 12 { meridiem.toggled() } else { meridiem };

                    ClockValue {
                        hour,
                        meridiem: Some(meridiem),
                        ..*self
                    }
                }
            },
            Field::Minute => self.with_minute(self.minute.wrapping_add(1) % 60),
            Field::Second => self.with_second(self.second.wrapping_add(1) % 60),
        }
    }
}

impl fmt::Display for ClockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;

        if let Some(meridiem) = self.meridiem {
            write!(f, " {}", meridiem)?;
        }

        Ok(())
    }
}

// Tens digit falls back to 0 when it isn't a digit. The ones digit is taken as-is.
fn two_digits(digits: &[u8]) -> u8 {
    let tens = if digits[0].is_ascii_digit() {
        digits[0] - b'0'
    } else {
        0
    };

    tens.wrapping_mul(10).wrapping_add(digits[1].wrapping_sub(b'0'))
}

fn month_number(name: [u8; 3]) -> Result<u8> {
    let month = match name {
        [b'J', b'a', _] => 1,
        [b'J', _, b'n'] => 6,
        [b'J', _, _] => 7,
        [b'F', _, _] => 2,
        [b'M', _, b'r'] => 3,
        [b'M', _, _] => 5,
        [b'A', _, b'r'] => 4,
        [b'A', _, _] => 8,
        [b'S', _, _] => 9,
        [b'O', _, _] => 10,
        [b'N', _, _] => 11,
        [b'D', _, _] => 12,
        [first, _, _] => return Err(ParseError::UnknownMonth(char::from(first))),
    };

    Ok(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_build_strings_12h() {
        let value = ClockValue::from_build_strings("Feb 13 2017", "18:14:10", true).unwrap();

        assert_eq!(value.year(), 2017);
        assert_eq!(value.month(), 2);
        assert_eq!(value.day(), 13);
        assert_eq!(value.hour(), 6);
        assert_eq!(value.minute(), 14);
        assert_eq!(value.second(), 10);
        assert_eq!(value.meridiem(), Some(Meridiem::Pm));
    }

    #[test]
    fn parse_build_strings_24h() {
        let value = ClockValue::from_build_strings("Feb 13 2017", "18:14:10", false).unwrap();

        assert_eq!(value, ClockValue::new(2017, 2, 13, 18, 14, 10));
        assert!(!value.is_12_hour());
    }

    #[test]
    fn noon_and_midnight_stay_am() {
        let noon = ClockValue::from_build_strings("Mar 01 2020", "12:00:00", true).unwrap();
        let midnight = ClockValue::from_build_strings("Mar 01 2020", "00:30:00", true).unwrap();

        assert_eq!((noon.hour(), noon.meridiem()), (12, Some(Meridiem::Am)));
        assert_eq!((midnight.hour(), midnight.meridiem()), (0, Some(Meridiem::Am)));
    }

    #[test]
    fn month_table() {
        let names = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];

        for (index, name) in names.iter().enumerate() {
            let date = format!("{} 01 2019", name);
            let value = ClockValue::from_build_strings(&date, "00:00:00", false).unwrap();
            assert_eq!(value.month() as usize, index + 1, "{}", name);
        }
    }

    #[test]
    fn june_and_july_differ_by_third_letter() {
        let june = ClockValue::from_build_strings("Jun 21 2017", "10:00:00", false).unwrap();
        let july = ClockValue::from_build_strings("Jul 21 2017", "10:00:00", false).unwrap();

        assert_eq!(june.month(), 6);
        assert_eq!(july.month(), 7);
    }

    #[test]
    fn space_padded_day() {
        let value = ClockValue::from_build_strings("Feb  5 2017", "08:01:02", false).unwrap();

        assert_eq!(value.day(), 5);
    }

    #[test]
    fn out_of_range_is_accepted() {
        let value = ClockValue::from_build_strings("Feb 40 2017", "25:61:99", false).unwrap();

        assert_eq!((value.day(), value.hour()), (40, 25));
        assert_eq!((value.minute(), value.second()), (61, 99));
    }

    #[test]
    fn malformed_input() {
        assert_eq!(
            ClockValue::from_build_strings("Feb 13", "18:14:10", false),
            Err(ParseError::TooShort)
        );
        assert_eq!(
            ClockValue::from_build_strings("Feb 13 2017", "18:14", false),
            Err(ParseError::TooShort)
        );
        assert_eq!(
            ClockValue::from_build_strings("Xyz 13 2017", "18:14:10", false),
            Err(ParseError::UnknownMonth('X'))
        );
    }

    #[test]
    fn increment_wraps_without_carry() {
        let value = ClockValue::new(2017, 2, 13, 23, 59, 59);

        assert_eq!(value.incremented(Field::Hour), value.with_hour(0));
        assert_eq!(value.incremented(Field::Minute), value.with_minute(0));
        assert_eq!(value.incremented(Field::Second), value.with_second(0));
    }

    #[test]
    fn increment_12h_flips_meridiem_at_twelve() {
        let value = ClockValue::new_12h(2017, 2, 13, 11, 0, 0, Meridiem::Am);

        let noon = value.incremented(Field::Hour);
        assert_eq!((noon.hour(), noon.meridiem()), (12, Some(Meridiem::Pm)));

        let one = noon.incremented(Field::Hour);
        assert_eq!((one.hour(), one.meridiem()), (1, Some(Meridiem::Pm)));
    }

    #[test]
    fn display() {
        let value = ClockValue::new_12h(2017, 2, 13, 6, 14, 10, Meridiem::Pm);
        assert_eq!(value.to_string(), "2017-02-13 06:14:10 PM");
        assert_eq!(
            ClockValue::new(2017, 2, 13, 18, 14, 10).to_string(),
            "2017-02-13 18:14:10"
        );
    }
}
