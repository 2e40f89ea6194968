//! nixie-rtc drives the timekeeping side of a nixie-tube clock: a DS1307
//! real-time clock connected to a microcontroller's two-wire (TWI/I2C)
//! controller.
//!
//! The crate is layered leaf first:
//!
//! * [`twi`] issues the raw bus phases (START, STOP, byte in/out) and checks
//!   the controller's status code after each one. Registers are accessed
//!   through the [`TwiRegisters`] trait, so the same code runs against a
//!   memory-mapped controller or the software model in [`twi::sim`].
//! * [`device`] builds single-register read and write transactions for one
//!   slave address.
//! * [`rtc`] speaks the DS1307 register protocol, and converts its packed
//!   BCD registers to and from [`ClockValue`]s.
//! * [`adjust`] contains the button handling shared with interrupt handlers,
//!   and the clock's main loop.
//!
//! The library logs through the `log` facade, and doesn't install a logger
//! itself.
//!
//! [`twi`]: twi/index.html
//! [`TwiRegisters`]: twi/trait.TwiRegisters.html
//! [`twi::sim`]: twi/sim/index.html
//! [`device`]: device/index.html
//! [`rtc`]: rtc/index.html
//! [`ClockValue`]: datetime/struct.ClockValue.html
//! [`adjust`]: adjust/index.html

// Used by rustdoc to link other crates to nixie-rtc's docs
#![doc(html_root_url = "https://docs.rs/nixie-rtc/0.1.0")]

pub mod adjust;
pub mod datetime;
pub mod device;
pub mod rtc;
pub mod twi;
