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

//! TWI register block layout and the register access trait.

/// TWI peripheral registers, in data-space order starting at TWBR.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Register {
    /// Bit rate register.
    Twbr = 0,
    /// Status register. Bits 7:3 hold the status code, bits 1:0 the prescaler.
    Twsr = 1,
    /// Slave address register.
    Twar = 2,
    /// Data register.
    Twdr = 3,
    /// Control register.
    Twcr = 4,
    /// Slave address mask register.
    Twamr = 5,
}

/// Number of registers in the TWI block.
pub const REGISTER_COUNT: usize = 6;

/// Data-space address of TWBR on the ATmega328P. The rest of the block follows it.
///
/// This is an address in the microcontroller's own data space, for use with
/// [`TwiMem::from_ptr`]. It isn't a physical address on a Linux host, and
/// [`TwiMem::open`] rejects it.
///
/// [`TwiMem::from_ptr`]: struct.TwiMem.html#method.from_ptr
/// [`TwiMem::open`]: struct.TwiMem.html#method.open
pub const ATMEGA328P_TWI_BASE: usize = 0xB8;

impl Register {
    /// Offset of the register from the start of the block.
    #[inline(always)]
    pub fn offset(self) -> usize {
        self as usize
    }
}

/// TWCR bits.
pub(crate) struct Twcr;

impl Twcr {
    pub const TWINT: u8 = 0b1000_0000;
    pub const TWEA: u8 = 0b0100_0000;
    pub const TWSTA: u8 = 0b0010_0000;
    pub const TWSTO: u8 = 0b0001_0000;
    pub const TWEN: u8 = 0b0000_0100;
}

/// Masks the prescaler bits out of TWSR.
pub const STATUS_MASK: u8 = 0xF8;

/// Provides read and write access to the TWI register block.
///
/// `Twi` drives the bus exclusively through this trait, which keeps the
/// protocol logic independent of where the registers actually live. The
/// crate ships [`TwiMem`], which accesses a memory-mapped register block, and
/// [`SimulatedBus`], a software model of the controller with a DS1307
/// attached.
///
/// Writes to [`Register::Twcr`] have side effects on real hardware: writing
/// a `1` to TWINT clears the flag and starts the requested bus operation.
/// Implementations must not cache or reorder register accesses.
///
/// [`TwiMem`]: struct.TwiMem.html
/// [`SimulatedBus`]: sim/struct.SimulatedBus.html
/// [`Register::Twcr`]: enum.Register.html#variant.Twcr
pub trait TwiRegisters {
    /// Reads the current value of `register`.
    fn read(&mut self, register: Register) -> u8;

    /// Writes `value` to `register`.
    fn write(&mut self, register: Register, value: u8);
}

impl<T: TwiRegisters + ?Sized> TwiRegisters for &mut T {
    fn read(&mut self, register: Register) -> u8 {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u8) {
        (**self).write(register, value)
    }
}
