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

//! Single-byte register access for a slave device on the TWI bus.

use log::{debug, warn};

use crate::twi::{Error, Phase, Result, Twi, TwiRegisters};

/// Data direction, sent as the R/W bit after the 7-bit slave address.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// Returns the address byte for `address` and `direction` (SLA+R/W).
pub fn address_byte(address: u8, direction: Direction) -> u8 {
    (address << 1) | direction as u8
}

/// Reads and writes individual registers of a single slave device.
///
/// Every call is a complete bus transaction addressing one register. On
/// failure the transaction is abandoned at the failing phase, and by default
/// no STOP condition is sent, which leaves the bus claimed until the next
/// START. [`set_release_on_error`] changes that.
///
/// [`set_release_on_error`]: #method.set_release_on_error
#[derive(Debug)]
pub struct RegisterClient<R> {
    twi: Twi<R>,
    address: u8,
    release_on_error: bool,
}

impl<R: TwiRegisters> RegisterClient<R> {
    /// Constructs a new `RegisterClient` for the slave device at the 7-bit
    /// `address`.
    ///
    /// The specified address shouldn't include the R/W bit.
    pub fn new(twi: Twi<R>, address: u8) -> RegisterClient<R> {
        RegisterClient {
            twi,
            address,
            release_on_error: false,
        }
    }

    /// Returns the 7-bit slave address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Returns `true` if a STOP condition is sent after a failed transaction.
    pub fn release_on_error(&self) -> bool {
        self.release_on_error
    }

    /// Sends a STOP condition after a failed transaction, releasing the bus.
    ///
    /// By default, `release_on_error` is set to `false`.
    pub fn set_release_on_error(&mut self, release_on_error: bool) {
        self.release_on_error = release_on_error;
    }

    /// Returns a reference to the underlying `Twi`.
    pub fn twi(&self) -> &Twi<R> {
        &self.twi
    }

    /// Returns a mutable reference to the underlying `Twi`.
    pub fn twi_mut(&mut self) -> &mut Twi<R> {
        &mut self.twi
    }

    /// Consumes the `RegisterClient`, returning the underlying `Twi`.
    pub fn into_inner(self) -> Twi<R> {
        self.twi
    }

    /// Reads the value of `register`.
    ///
    /// A dummy write sets the device's register pointer, followed by a
    /// repeated START to switch to reading, so the device stays selected
    /// throughout.
    ///
    /// Sequence: START → Address + Write Bit → Register → Repeated START →
    /// Address + Read Bit → Incoming Byte (NACK) → STOP
    pub fn read_register(&mut self, register: u8) -> Result<u8> {
        let result = self.read_sequence(register);
        if let Ok(value) = &result {
            debug!("Read 0x{:02X} from register 0x{:02X}", value, register);
        }

        self.finish(result)
    }

    /// Writes `value` to `register`.
    ///
    /// Sequence: START → Address + Write Bit → Register → Outgoing Byte → STOP
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        let result = self.write_sequence(register, value);
        if result.is_ok() {
            debug!("Wrote 0x{:02X} to register 0x{:02X}", value, register);
        }

        self.finish(result)
    }

    fn read_sequence(&mut self, register: u8) -> Result<u8> {
        self.twi.start()?;
        self.twi.write_byte(address_byte(self.address, Direction::Write))?;
        self.twi.write_byte(register)?;
        self.twi.start()?;
        self.twi.write_byte(address_byte(self.address, Direction::Read))?;
        let value = self.twi.read_byte(false)?;
        self.twi.stop()?;

        Ok(value)
    }

    fn write_sequence(&mut self, register: u8, value: u8) -> Result<()> {
        self.twi.start()?;
        self.twi.write_byte(address_byte(self.address, Direction::Write))?;
        self.twi.write_byte(register)?;
        self.twi.write_byte(value)?;
        self.twi.stop()?;

        Ok(())
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref err) = result {
            warn!("Transaction with device 0x{:02X} failed: {}", self.address, err);

            // A STOP that timed out won't fare better the second time.
            if self.release_on_error && !matches!(err, Error::Timeout(Phase::Stop)) {
                if let Err(stop_err) = self.twi.stop() {
                    warn!(
                        "Releasing bus after failed transaction with device 0x{:02X}: {}",
                        self.address, stop_err
                    );
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twi::sim::{BusEvent, SimulatedBus};
    use crate::twi::{Status, Timeout};

    fn client() -> RegisterClient<SimulatedBus> {
        RegisterClient::new(Twi::new(SimulatedBus::new()), 0x68)
    }

    #[test]
    fn address_bytes() {
        assert_eq!(address_byte(0x68, Direction::Write), 0xD0);
        assert_eq!(address_byte(0x68, Direction::Read), 0xD1);
    }

    #[test]
    fn read_sequence() {
        let mut client = client();
        client.twi_mut().registers_mut().load(0x05, &[0x12]);

        assert_eq!(client.read_register(0x05).unwrap(), 0x12);
        assert_eq!(
            client.twi().registers().events(),
            &[
                BusEvent::Start,
                BusEvent::Write(0xD0),
                BusEvent::Write(0x05),
                BusEvent::RepeatedStart,
                BusEvent::Write(0xD1),
                BusEvent::Read {
                    value: 0x12,
                    ack: false
                },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn write_sequence() {
        let mut client = client();

        client.write_register(0x07, 0x10).unwrap();

        assert_eq!(client.twi().registers().memory()[0x07], 0x10);
        assert_eq!(
            client.twi().registers().events(),
            &[
                BusEvent::Start,
                BusEvent::Write(0xD0),
                BusEvent::Write(0x07),
                BusEvent::Write(0x10),
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn data_nack_aborts_without_stop() {
        let mut client = client();
        client.twi_mut().registers_mut().set_nack_data(true);

        match client.write_register(0x01, 0x59) {
            Err(Error::Status { status, .. }) => assert_eq!(status, Status::DATA_TX_NACK),
            other => panic!("unexpected result: {:?}", other),
        }

        let events = client.twi().registers().events();
        assert_eq!(events.last(), Some(&BusEvent::Write(0x59)));
        assert!(!events.contains(&BusEvent::Stop));
        assert_eq!(client.twi().registers().memory()[0x01], 0x00);
    }

    #[test]
    fn data_nack_releases_bus_when_enabled() {
        let mut client = client();
        client.set_release_on_error(true);
        client.twi_mut().registers_mut().set_nack_data(true);

        assert!(client.write_register(0x01, 0x59).is_err());
        assert_eq!(
            client.twi().registers().events().last(),
            Some(&BusEvent::Stop)
        );
    }

    #[test]
    fn failed_release_keeps_original_error() {
        let mut bus = SimulatedBus::new();
        bus.set_stuck(true);

        let mut twi = Twi::new(bus);
        twi.set_timeout(Timeout::Polls(10));

        let mut client = RegisterClient::new(twi, 0x68);
        client.set_release_on_error(true);

        // The STOP sent to release the bus times out as well.
        assert!(matches!(
            client.write_register(0x01, 0x59),
            Err(Error::Timeout(Phase::Start))
        ));
        assert!(client.twi().registers().events().is_empty());
    }

    #[test]
    fn missing_device_fails_at_address() {
        let mut client = RegisterClient::new(Twi::new(SimulatedBus::new()), 0x50);

        match client.read_register(0x00) {
            Err(Error::Status { phase, status }) => {
                assert_eq!(phase, Phase::Write);
                assert_eq!(status, Status::SLA_W_NACK);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert_eq!(
            client.twi().registers().events(),
            &[BusEvent::Start, BusEvent::Write(0xA0)]
        );
    }

    #[test]
    fn repeated_reads_are_idempotent() {
        let mut client = client();
        client.twi_mut().registers_mut().load(0x02, &[0x47]);

        let first = client.read_register(0x02).unwrap();
        let second = client.read_register(0x02).unwrap();

        assert_eq!(first, 0x47);
        assert_eq!(first, second);
    }
}
