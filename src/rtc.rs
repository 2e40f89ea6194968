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

//! Interface for the Maxim Integrated DS1307 real-time clock.
//!
//! The DS1307 keeps time in seven packed BCD registers, starting at register
//! 0x00. [`Ds1307`] reads and writes them one register per bus transaction
//! through a [`RegisterClient`], and converts them to and from
//! [`ClockValue`]s with the [`codec`] module.
//!
//! ## Oscillator
//!
//! Bit 7 of the seconds register (CH) halts the oscillator. The bit is set
//! when the chip first powers up, and the clock won't run until it's
//! cleared. [`init`] clears it while preserving the current seconds.
//!
//! ## Errors
//!
//! Every method propagates bus failures. [`now`] fails as soon as any of the
//! timekeeping registers can't be read, instead of returning a partially
//! filled in value.
//!
//! [`Ds1307`]: struct.Ds1307.html
//! [`RegisterClient`]: ../device/struct.RegisterClient.html
//! [`ClockValue`]: ../datetime/struct.ClockValue.html
//! [`codec`]: codec/index.html
//! [`init`]: struct.Ds1307.html#method.init
//! [`now`]: struct.Ds1307.html#method.now

use log::info;

use crate::datetime::ClockValue;
use crate::device::RegisterClient;
use crate::twi::{Result, Twi, TwiRegisters};

pub mod codec;

use self::codec::TIME_REGISTERS;

/// DS1307 7-bit slave address.
pub const ADDRESS: u8 = 0x68;

/// DS1307 register addresses.
pub struct Register;

impl Register {
    pub const SECONDS: u8 = 0x00;
    pub const MINUTES: u8 = 0x01;
    pub const HOURS: u8 = 0x02;
    pub const DAY_OF_WEEK: u8 = 0x03;
    pub const DAY: u8 = 0x04;
    pub const MONTH: u8 = 0x05;
    pub const YEAR: u8 = 0x06;
    pub const CONTROL: u8 = 0x07;
    /// Start of the 56 bytes of battery-backed RAM.
    pub const NVRAM: u8 = 0x08;
}

struct BitFlags;

impl BitFlags {
    /// Clock halt, in the seconds register.
    const CH: u8 = 0b1000_0000;
    /// 12-hour mode, in the hours register.
    const H12: u8 = 0b0100_0000;
    /// PM, in the hours register when in 12-hour mode.
    const PM: u8 = 0b0010_0000;
}

/// SQW/OUT pin configuration, written as-is to the control register.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum SqwPinMode {
    /// Output driven low.
    Off = 0x00,
    /// Output driven high.
    On = 0x80,
    /// 1 Hz square wave.
    SquareWave1Hz = 0x10,
    /// 4.096 kHz square wave.
    SquareWave4kHz = 0x11,
    /// 8.192 kHz square wave.
    SquareWave8kHz = 0x12,
    /// 32.768 kHz square wave.
    SquareWave32kHz = 0x13,
}

/// DS1307 real-time clock.
#[derive(Debug)]
pub struct Ds1307<R> {
    client: RegisterClient<R>,
}

impl<R: TwiRegisters> Ds1307<R> {
    /// Constructs a new `Ds1307` on the specified bus.
    pub fn new(twi: Twi<R>) -> Ds1307<R> {
        Ds1307 {
            client: RegisterClient::new(twi, ADDRESS),
        }
    }

    /// Returns a reference to the underlying `RegisterClient`.
    pub fn client(&self) -> &RegisterClient<R> {
        &self.client
    }

    /// Returns a mutable reference to the underlying `RegisterClient`.
    pub fn client_mut(&mut self) -> &mut RegisterClient<R> {
        &mut self.client
    }

    /// Consumes the `Ds1307`, returning the underlying `RegisterClient`.
    pub fn into_inner(self) -> RegisterClient<R> {
        self.client
    }

    /// Starts the oscillator by clearing the clock halt flag.
    pub fn init(&mut self) -> Result<()> {
        let seconds = self.client.read_register(Register::SECONDS)?;
        self.client
            .write_register(Register::SECONDS, seconds & !BitFlags::CH)?;

        if seconds & BitFlags::CH != 0 {
            info!("DS1307 oscillator started");
        }

        Ok(())
    }

    /// Returns `true` if the oscillator is running.
    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.client.read_register(Register::SECONDS)? & BitFlags::CH == 0)
    }

    /// Configures the SQW/OUT pin.
    pub fn set_square_wave(&mut self, mode: SqwPinMode) -> Result<()> {
        self.client.write_register(Register::CONTROL, mode as u8)
    }

    /// Reads the current date and time.
    ///
    /// The timekeeping registers are read one at a time, so a rollover in
    /// between reads can produce an inconsistent value.
    pub fn now(&mut self) -> Result<ClockValue> {
        let mut registers = [0u8; TIME_REGISTERS];

        for (register, value) in registers.iter_mut().enumerate() {
            if register as u8 == Register::DAY_OF_WEEK {
                continue;
            }

            *value = self.client.read_register(register as u8)?;
        }

        Ok(codec::decode(&registers))
    }

    /// Sets the current date and time.
    ///
    /// Writing the seconds register also clears the clock halt flag. The
    /// day-of-week register is left untouched.
    pub fn adjust(&mut self, value: &ClockValue) -> Result<()> {
        let registers = codec::encode(value);

        for (register, &byte) in registers.iter().enumerate() {
            if register as u8 == Register::DAY_OF_WEEK {
                continue;
            }

            self.client.write_register(register as u8, byte)?;
        }

        info!("DS1307 set to {}", value);

        Ok(())
    }
}
