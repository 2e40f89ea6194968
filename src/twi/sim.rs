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

//! Software model of a TWI controller with a DS1307-style slave attached.
//!
//! [`SimulatedBus`] implements [`TwiRegisters`], so a [`Twi`] can drive it
//! exactly like real hardware. Each write to TWCR with TWINT set runs the
//! requested bus phase to completion immediately, updates TWSR with the
//! status code the hardware would report, and raises TWINT again.
//!
//! The attached device exposes 64 byte-wide registers behind an
//! auto-incrementing register pointer, matching the DS1307 memory map. Every
//! bus phase is recorded as a [`BusEvent`], so tests can assert the exact
//! sequence of a transaction.
//!
//! [`SimulatedBus`]: struct.SimulatedBus.html
//! [`TwiRegisters`]: ../trait.TwiRegisters.html
//! [`Twi`]: ../struct.Twi.html
//! [`BusEvent`]: enum.BusEvent.html

use super::registers::{Register, Twcr, TwiRegisters, REGISTER_COUNT};
use super::Status;

/// Size of the simulated device's register file.
pub const DEVICE_MEMORY_SIZE: usize = 64;

/// Default 7-bit address of the simulated device.
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// A bus phase observed by the simulated controller.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum BusEvent {
    /// START condition.
    Start,
    /// Repeated START condition.
    RepeatedStart,
    /// STOP condition.
    Stop,
    /// Byte transmitted by the master.
    Write(u8),
    /// Byte received by the master, and whether it was acknowledged.
    Read { value: u8, ack: bool },
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
enum State {
    Idle,
    Started,
    Transmitting { pointer_set: bool },
    Receiving,
    Ignored,
}

/// Simulated TWI controller and slave device.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    regs: [u8; REGISTER_COUNT],
    state: State,
    address: u8,
    memory: [u8; DEVICE_MEMORY_SIZE],
    pointer: u8,
    nack_data: bool,
    stuck: bool,
    events: Vec<BusEvent>,
}

impl Default for SimulatedBus {
    fn default() -> SimulatedBus {
        SimulatedBus::new()
    }
}

impl SimulatedBus {
    /// Constructs a new `SimulatedBus` with a device at the default address.
    ///
    /// The device powers up with its oscillator halted (bit 7 of register
    /// 0x00 set) and all other registers cleared.
    pub fn new() -> SimulatedBus {
        SimulatedBus::with_address(DEFAULT_ADDRESS)
    }

    /// Constructs a new `SimulatedBus` with a device at the specified 7-bit address.
    pub fn with_address(address: u8) -> SimulatedBus {
        let mut memory = [0u8; DEVICE_MEMORY_SIZE];
        memory[0] = 0x80;

        SimulatedBus {
            regs: [0u8; REGISTER_COUNT],
            state: State::Idle,
            address,
            memory,
            pointer: 0,
            nack_data: false,
            stuck: false,
            events: Vec::new(),
        }
    }

    /// Overwrites the device registers starting at `register`.
    ///
    /// Like the device's register pointer, writes past 0x3F wrap around to 0x00.
    pub fn load(&mut self, register: u8, data: &[u8]) {
        for (index, &byte) in data.iter().enumerate() {
            self.memory[(register as usize + index) % DEVICE_MEMORY_SIZE] = byte;
        }
    }

    /// Returns the device register file.
    pub fn memory(&self) -> &[u8; DEVICE_MEMORY_SIZE] {
        &self.memory
    }

    /// Returns the device's current register pointer.
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Makes the device NACK every data byte that follows the register pointer.
    ///
    /// The address byte and the register pointer itself are still acknowledged.
    pub fn set_nack_data(&mut self, nack_data: bool) {
        self.nack_data = nack_data;
    }

    /// Makes the controller stop completing bus phases.
    ///
    /// TWINT is never raised and TWSTO is never cleared, which simulates a
    /// hung bus.
    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    /// Returns the bus phases observed so far.
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Clears the list of observed bus phases.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn set_status(&mut self, status: u8) {
        let prescaler = self.regs[Register::Twsr.offset()] & 0x03;
        self.regs[Register::Twsr.offset()] = status | prescaler;
    }

    fn control(&mut self, value: u8) {
        // Writing a one to TWINT clears the flag and starts the next phase.
        self.regs[Register::Twcr.offset()] = value & !Twcr::TWINT;

        if value & Twcr::TWINT == 0 || value & Twcr::TWEN == 0 || self.stuck {
            return;
        }

        if value & Twcr::TWSTA != 0 {
            self.start();
        } else if value & Twcr::TWSTO != 0 {
            self.stop();
            self.regs[Register::Twcr.offset()] &= !Twcr::TWSTO;
            return;
        } else {
            self.transfer(value & Twcr::TWEA != 0);
        }

        self.regs[Register::Twcr.offset()] |= Twcr::TWINT;
    }

    fn start(&mut self) {
        if self.state == State::Idle {
            self.events.push(BusEvent::Start);
            self.set_status(Status::START);
        } else {
            self.events.push(BusEvent::RepeatedStart);
            self.set_status(Status::REPEATED_START);
        }

        self.state = State::Started;
    }

    fn stop(&mut self) {
        self.events.push(BusEvent::Stop);
        self.set_status(Status::NO_INFO);
        self.state = State::Idle;
    }

    fn transfer(&mut self, ack: bool) {
        let byte = self.regs[Register::Twdr.offset()];

        match self.state {
            State::Started => {
                self.events.push(BusEvent::Write(byte));

                let read = byte & 0x01 != 0;
                let addressed = byte >> 1 == self.address;
                let (status, state) = match (addressed, read) {
                    (true, false) => (
                        Status::SLA_W_ACK,
                        State::Transmitting { pointer_set: false },
                    ),
                    (true, true) => (Status::SLA_R_ACK, State::Receiving),
                    (false, false) => (Status::SLA_W_NACK, State::Ignored),
                    (false, true) => (Status::SLA_R_NACK, State::Ignored),
                };

                self.set_status(status);
                self.state = state;
            }
            State::Transmitting { pointer_set: false } => {
                self.events.push(BusEvent::Write(byte));
                self.pointer = byte % DEVICE_MEMORY_SIZE as u8;
                self.set_status(Status::DATA_TX_ACK);
                self.state = State::Transmitting { pointer_set: true };
            }
            State::Transmitting { pointer_set: true } => {
                self.events.push(BusEvent::Write(byte));

                if self.nack_data {
                    self.set_status(Status::DATA_TX_NACK);
                } else {
                    self.memory[self.pointer as usize] = byte;
                    self.advance_pointer();
                    self.set_status(Status::DATA_TX_ACK);
                }
            }
            State::Receiving => {
                let value = self.memory[self.pointer as usize];
                self.advance_pointer();
                self.regs[Register::Twdr.offset()] = value;
                self.events.push(BusEvent::Read { value, ack });
                self.set_status(if ack {
                    Status::DATA_RX_ACK
                } else {
                    Status::DATA_RX_NACK
                });
            }
            State::Idle | State::Ignored => {
                self.set_status(Status::BUS_ERROR);
            }
        }
    }

    fn advance_pointer(&mut self) {
        self.pointer = (self.pointer + 1) % DEVICE_MEMORY_SIZE as u8;
    }
}

impl TwiRegisters for SimulatedBus {
    fn read(&mut self, register: Register) -> u8 {
        self.regs[register.offset()]
    }

    fn write(&mut self, register: Register, value: u8) {
        match register {
            Register::Twcr => self.control(value),
            // Only the prescaler bits are writable.
            Register::Twsr => {
                let status = self.regs[Register::Twsr.offset()] & !0x03;
                self.regs[Register::Twsr.offset()] = status | (value & 0x03);
            }
            _ => self.regs[register.offset()] = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_up_halted() {
        let bus = SimulatedBus::new();

        assert_eq!(bus.memory()[0], 0x80);
        assert!(bus.memory()[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn control_without_twint_has_no_effect() {
        let mut bus = SimulatedBus::new();

        bus.write(Register::Twcr, Twcr::TWEN | Twcr::TWSTA);

        assert!(bus.events().is_empty());
        assert_eq!(bus.read(Register::Twcr) & Twcr::TWINT, 0);
    }

    #[test]
    fn load_wraps() {
        let mut bus = SimulatedBus::new();

        bus.load(0x3F, &[1, 2]);

        assert_eq!(bus.memory()[0x3F], 1);
        assert_eq!(bus.memory()[0x00], 2);
    }

    #[test]
    fn pointer_wraps() {
        let mut bus = SimulatedBus::new();

        for byte in [0xD0, 0x3F, 0xAA, 0xBB] {
            if byte == 0xD0 {
                bus.write(Register::Twcr, Twcr::TWINT | Twcr::TWSTA | Twcr::TWEN);
            }
            bus.write(Register::Twdr, byte);
            bus.write(Register::Twcr, Twcr::TWINT | Twcr::TWEN);
        }

        assert_eq!(bus.memory()[0x3F], 0xAA);
        assert_eq!(bus.memory()[0x00], 0xBB);
        assert_eq!(bus.pointer(), 1);
    }
}
