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

//! Interface for the two-wire (TWI) master peripheral.
//!
//! The TWI controller found on AVR microcontrollers implements the I2C
//! protocol in hardware, but leaves sequencing to software. Every bus phase
//! (START, address, data, STOP) is started by writing the control register,
//! and its outcome is reported as a status code in the status register once
//! the interrupt flag (TWINT) is raised. [`Twi`] issues those phases one at a
//! time and checks the status code after each one.
//!
//! `Twi` doesn't access hardware registers directly. All register traffic goes
//! through a [`TwiRegisters`] implementation, which is either a memory-mapped
//! register block ([`TwiMem`]) or the software model in [`sim`].
//!
//! ## Transmission speed
//!
//! The bus clock is derived from the controller's source clock:
//! `SCL = source / (16 + 2 * TWBR)` with the prescaler set to 1. By default
//! `Twi` assumes a 16 MHz source and targets 100 kHz, which results in a
//! TWBR value of 72.
//!
//! ## Not supported
//!
//! Multi-master arbitration, bus recovery, interrupt-driven operation and
//! multi-byte burst transfers. Clock stretching is only supported in the
//! sense that `Twi` waits for the controller to finish a phase.
//!
//! ## Timeouts
//!
//! Each phase busy-waits on the control register. By default the wait is
//! unbounded, so a controller that never raises TWINT (or never clears
//! TWSTO) hangs the caller. A bounded wait can be configured with
//! [`set_timeout`], in which case a stuck phase returns [`Error::Timeout`].
//!
//! Bus phases busy-wait, so they must never be started from an interrupt
//! handler.
//!
//! [`Twi`]: struct.Twi.html
//! [`TwiRegisters`]: trait.TwiRegisters.html
//! [`TwiMem`]: struct.TwiMem.html
//! [`sim`]: sim/index.html
//! [`set_timeout`]: struct.Twi.html#method.set_timeout
//! [`Error::Timeout`]: enum.Error.html#variant.Timeout

use std::error;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::result;

use log::{debug, warn};

mod hal;
mod mem;
mod registers;
pub mod sim;

pub use self::mem::TwiMem;
pub use self::registers::{
    Register, TwiRegisters, ATMEGA328P_TWI_BASE, REGISTER_COUNT, STATUS_MASK,
};

use self::registers::Twcr;

/// Default source clock frequency in hertz (Hz).
pub const DEFAULT_SOURCE_CLOCK: u32 = 16_000_000;
/// Default bus clock frequency in hertz (Hz).
pub const DEFAULT_BUS_FREQUENCY: u32 = 100_000;

/// Master mode status codes, as reported by TWSR with the prescaler bits masked out.
pub struct Status;

impl Status {
    /// No relevant state information available, TWINT is low.
    pub const NO_INFO: u8 = 0xF8;
    /// Illegal START or STOP condition.
    pub const BUS_ERROR: u8 = 0x00;
    /// START condition transmitted.
    pub const START: u8 = 0x08;
    /// Repeated START condition transmitted.
    pub const REPEATED_START: u8 = 0x10;
    /// SLA+W transmitted, ACK received.
    pub const SLA_W_ACK: u8 = 0x18;
    /// SLA+W transmitted, NACK received.
    pub const SLA_W_NACK: u8 = 0x20;
    /// Data byte transmitted, ACK received.
    pub const DATA_TX_ACK: u8 = 0x28;
    /// Data byte transmitted, NACK received.
    pub const DATA_TX_NACK: u8 = 0x30;
    /// Arbitration lost in SLA+R/W or data bytes.
    pub const ARBITRATION_LOST: u8 = 0x38;
    /// SLA+R transmitted, ACK received.
    pub const SLA_R_ACK: u8 = 0x40;
    /// SLA+R transmitted, NACK received.
    pub const SLA_R_NACK: u8 = 0x48;
    /// Data byte received, ACK returned.
    pub const DATA_RX_ACK: u8 = 0x50;
    /// Data byte received, NACK returned.
    pub const DATA_RX_NACK: u8 = 0x58;
}

/// Bus phase during which an error occurred.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Phase {
    /// START or repeated START condition.
    Start,
    /// STOP condition.
    Stop,
    /// Outgoing byte (address or data).
    Write,
    /// Incoming byte.
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Phase::Start => write!(f, "START"),
            Phase::Stop => write!(f, "STOP"),
            Phase::Write => write!(f, "write"),
            Phase::Read => write!(f, "read"),
        }
    }
}

/// Errors that can occur when accessing the TWI peripheral.
#[derive(Debug)]
pub enum Error {
    /// I/O error.
    Io(io::Error),
    /// Permission denied when opening `/dev/mem`.
    ///
    /// Mapping the physical register block requires superuser privileges.
    PermissionDenied(String),
    /// Unexpected status code.
    ///
    /// The controller reported a status other than the ones that indicate
    /// success for `phase`. This includes a NACK from the slave device, a
    /// missing device and arbitration loss. `status` holds the raw TWSR value
    /// with the prescaler bits masked out.
    Status { phase: Phase, status: u8 },
    /// The controller didn't complete `phase` within the configured bound.
    ///
    /// Only returned when a bounded wait is configured through
    /// [`Twi::set_timeout`].
    ///
    /// [`Twi::set_timeout`]: struct.Twi.html#method.set_timeout
    Timeout(Phase),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(f, "I/O error: {}", err),
            Error::PermissionDenied(ref path) => write!(f, "Permission denied: {}", path),
            Error::Status { phase, status } => {
                write!(f, "Unexpected status during {}: 0x{:02X}", phase, status)
            }
            Error::Timeout(phase) => write!(f, "Timed out waiting for {}", phase),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Result type returned from methods that can have `twi::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Bound applied to every busy-wait on the controller.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Timeout {
    /// Wait until the controller completes the phase, however long that takes.
    Unbounded,
    /// Give up after polling the control register this many times.
    Polls(u32),
}

impl Default for Timeout {
    fn default() -> Timeout {
        Timeout::Unbounded
    }
}

/// Calculates the TWBR value for the requested bus frequency.
///
/// `divisor = (source_clock / bus_frequency - 16) / 2`, saturating at 0 for
/// bus frequencies the source clock can't reach, and at 255 for frequencies
/// too low to represent.
pub fn bit_rate_divisor(source_clock: u32, bus_frequency: u32) -> u8 {
    let ratio = source_clock.checked_div(bus_frequency).unwrap_or(u32::MAX);
    let divisor = ratio.saturating_sub(16) / 2;

    if divisor > u32::from(u8::MAX) {
        u8::MAX
    } else {
        divisor as u8
    }
}

/// Provides access to a TWI controller in master mode.
///
/// `Twi` offers the raw protocol primitives: [`start`], [`stop`],
/// [`write_byte`] and [`read_byte`]. It has no knowledge of slave devices or
/// register layouts, and never issues a STOP on its own. When a primitive
/// fails, the bus stays in whatever state the controller reports, and it's up
/// to the caller to abort the transaction.
///
/// `Twi` isn't `Sync`. Only a single thread of control should drive the bus.
///
/// [`start`]: #method.start
/// [`stop`]: #method.stop
/// [`write_byte`]: #method.write_byte
/// [`read_byte`]: #method.read_byte
#[derive(Debug)]
pub struct Twi<R> {
    regs: R,
    source_clock: u32,
    divisor: u8,
    timeout: Timeout,
    // Forces !Sync. Concurrent register access would interleave bus phases.
    not_sync: PhantomData<*const ()>,
}

impl<R: TwiRegisters> Twi<R> {
    /// Constructs a new `Twi` and enables the controller.
    ///
    /// Assumes a 16 MHz source clock, and configures the bus for 100 kHz.
    pub fn new(regs: R) -> Twi<R> {
        Twi::with_clock(regs, DEFAULT_SOURCE_CLOCK, DEFAULT_BUS_FREQUENCY)
    }

    /// Constructs a new `Twi` for the specified source clock and bus
    /// frequency, both in hertz (Hz), and enables the controller.
    pub fn with_clock(regs: R, source_clock: u32, bus_frequency: u32) -> Twi<R> {
        let mut twi = Twi {
            regs,
            source_clock,
            divisor: bit_rate_divisor(source_clock, bus_frequency),
            timeout: Timeout::default(),
            not_sync: PhantomData,
        };

        twi.initialize();

        twi
    }

    fn initialize(&mut self) {
        debug!(
            "TWI init: source {} Hz, TWBR {} (~{} Hz)",
            self.source_clock,
            self.divisor,
            self.clock_speed()
        );

        self.regs.write(Register::Twbr, self.divisor);
        // Prescaler 1
        self.regs.write(Register::Twsr, 0);
        let control = self.regs.read(Register::Twcr);
        self.regs.write(Register::Twcr, control | Twcr::TWEN);
    }

    /// Returns the TWBR value in use.
    pub fn divisor(&self) -> u8 {
        self.divisor
    }

    /// Returns the resulting bus clock frequency in hertz (Hz).
    pub fn clock_speed(&self) -> u32 {
        self.source_clock / (16 + 2 * u32::from(self.divisor))
    }

    /// Returns the bound applied to busy-waits.
    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    /// Sets the bound applied to busy-waits.
    ///
    /// By default, `timeout` is set to [`Timeout::Unbounded`].
    ///
    /// [`Timeout::Unbounded`]: enum.Timeout.html#variant.Unbounded
    pub fn set_timeout(&mut self, timeout: Timeout) {
        self.timeout = timeout;
    }

    /// Returns a reference to the underlying register access.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Returns a mutable reference to the underlying register access.
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Consumes the `Twi`, returning the underlying register access.
    pub fn into_inner(self) -> R {
        self.regs
    }

    /// Returns the current status code, with the prescaler bits masked out.
    pub fn status(&mut self) -> u8 {
        self.regs.read(Register::Twsr) & STATUS_MASK
    }

    /// Sends a START condition, or a repeated START if the bus is already
    /// claimed, and waits until it's been transmitted.
    ///
    /// The resulting status code isn't checked. With the default unbounded
    /// wait, `start` always returns `Ok`.
    pub fn start(&mut self) -> Result<()> {
        self.regs
            .write(Register::Twcr, Twcr::TWINT | Twcr::TWSTA | Twcr::TWEN);
        self.wait_until(Phase::Start, |control| control & Twcr::TWINT != 0)
    }

    /// Sends a STOP condition and waits until the controller has released the bus.
    pub fn stop(&mut self) -> Result<()> {
        self.regs
            .write(Register::Twcr, Twcr::TWINT | Twcr::TWSTO | Twcr::TWEN);
        self.wait_until(Phase::Stop, |control| control & Twcr::TWSTO == 0)
    }

    /// Transmits a single byte, which is either an address byte (SLA+R/W) or
    /// a data byte.
    ///
    /// Succeeds if the slave device acknowledged the byte, which corresponds
    /// to status 0x18 (SLA+W), 0x40 (SLA+R) or 0x28 (data). Any other status
    /// returns [`Error::Status`]. No STOP condition is sent on failure.
    ///
    /// [`Error::Status`]: enum.Error.html#variant.Status
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.regs.write(Register::Twdr, byte);
        self.regs.write(Register::Twcr, Twcr::TWINT | Twcr::TWEN);
        self.wait_until(Phase::Write, |control| control & Twcr::TWINT != 0)?;

        match self.status() {
            Status::SLA_W_ACK | Status::SLA_R_ACK | Status::DATA_TX_ACK => Ok(()),
            status => {
                debug!("TWI write 0x{:02X}: status 0x{:02X}", byte, status);
                Err(Error::Status {
                    phase: Phase::Write,
                    status,
                })
            }
        }
    }

    /// Receives a single byte.
    ///
    /// If `ack` is `true`, the byte is acknowledged, which tells the slave
    /// device more bytes are expected. Set `ack` to `false` for the last byte
    /// of a transfer.
    ///
    /// Succeeds if the status is 0x50 (ACK returned) or 0x58 (NACK
    /// returned). Any other status returns [`Error::Status`].
    ///
    /// [`Error::Status`]: enum.Error.html#variant.Status
    pub fn read_byte(&mut self, ack: bool) -> Result<u8> {
        let control = if ack {
            Twcr::TWINT | Twcr::TWEA | Twcr::TWEN
        } else {
            Twcr::TWINT | Twcr::TWEN
        };

        self.regs.write(Register::Twcr, control);
        self.wait_until(Phase::Read, |control| control & Twcr::TWINT != 0)?;

        match self.status() {
            Status::DATA_RX_ACK | Status::DATA_RX_NACK => Ok(self.regs.read(Register::Twdr)),
            status => {
                debug!("TWI read: status 0x{:02X}", status);
                Err(Error::Status {
                    phase: Phase::Read,
                    status,
                })
            }
        }
    }

    fn wait_until<F>(&mut self, phase: Phase, done: F) -> Result<()>
    where
        F: Fn(u8) -> bool,
    {
        let mut polls: u32 = 0;

        loop {
            if done(self.regs.read(Register::Twcr)) {
                return Ok(());
            }

            if let Timeout::Polls(limit) = self.timeout {
                polls = polls.saturating_add(1);
                if polls >= limit {
                    warn!("TWI {} timed out after {} polls", phase, polls);
                    return Err(Error::Timeout(phase));
                }
            }

            std::hint::spin_loop();
        }
    }
}

// Send is safe for Twi as long as the register access is, but we're marked
// !Send because of the dummy pointer that's needed to force !Sync.
unsafe impl<R: Send> Send for Twi<R> {}

#[cfg(test)]
mod tests {
    use super::sim::{BusEvent, SimulatedBus};
    use super::*;

    #[test]
    fn divisor_for_default_clock() {
        assert_eq!(bit_rate_divisor(16_000_000, 100_000), 72);
        assert_eq!(bit_rate_divisor(16_000_000, 400_000), 12);
        assert_eq!(bit_rate_divisor(8_000_000, 100_000), 32);
    }

    #[test]
    fn divisor_saturates() {
        assert_eq!(bit_rate_divisor(1_000_000, 1_000_000), 0);
        assert_eq!(bit_rate_divisor(16_000_000, 1_000), 255);
        assert_eq!(bit_rate_divisor(16_000_000, 0), 255);
    }

    #[test]
    fn initialize_enables_controller() {
        let twi = Twi::new(SimulatedBus::new());

        assert_eq!(twi.divisor(), 72);
        assert_eq!(twi.clock_speed(), 100_000);

        let mut bus = twi.into_inner();
        assert_eq!(bus.read(Register::Twbr), 72);
        assert_eq!(bus.read(Register::Twsr) & 0x03, 0);
        assert_ne!(bus.read(Register::Twcr) & Twcr::TWEN, 0);
    }

    #[test]
    fn write_byte_accepts_address_ack() {
        let mut twi = Twi::new(SimulatedBus::new());

        twi.start().unwrap();
        assert_eq!(twi.status(), Status::START);
        twi.write_byte(0x68 << 1).unwrap();
        assert_eq!(twi.status(), Status::SLA_W_ACK);
        twi.stop().unwrap();

        assert_eq!(
            twi.registers().events(),
            &[BusEvent::Start, BusEvent::Write(0xD0), BusEvent::Stop]
        );
    }

    #[test]
    fn write_byte_rejects_missing_device() {
        let mut twi = Twi::new(SimulatedBus::new());

        twi.start().unwrap();
        match twi.write_byte(0x50 << 1) {
            Err(Error::Status { phase, status }) => {
                assert_eq!(phase, Phase::Write);
                assert_eq!(status, Status::SLA_W_NACK);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn read_byte_without_address_fails() {
        let mut twi = Twi::new(SimulatedBus::new());

        twi.start().unwrap();
        twi.write_byte(0x68 << 1).unwrap();

        // Slave is addressed for writing, so a read isn't valid here.
        assert!(matches!(
            twi.read_byte(false),
            Err(Error::Status {
                phase: Phase::Read,
                ..
            })
        ));
    }

    #[test]
    fn bounded_wait_times_out() {
        let mut bus = SimulatedBus::new();
        bus.set_stuck(true);

        let mut twi = Twi::new(bus);
        twi.set_timeout(Timeout::Polls(100));

        assert!(matches!(twi.start(), Err(Error::Timeout(Phase::Start))));
        assert!(matches!(twi.stop(), Err(Error::Timeout(Phase::Stop))));
        assert!(matches!(twi.write_byte(0), Err(Error::Timeout(Phase::Write))));
    }

    #[test]
    fn error_display() {
        let err = Error::Status {
            phase: Phase::Write,
            status: Status::DATA_TX_NACK,
        };

        assert_eq!(err.to_string(), "Unexpected status during write: 0x30");
        assert_eq!(
            Error::Timeout(Phase::Stop).to_string(),
            "Timed out waiting for STOP"
        );
    }
}
