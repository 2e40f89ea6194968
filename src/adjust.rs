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

//! Button-driven time adjustment and the clock's main loop.
//!
//! Three buttons step the hour, minute and second. Their pin-change
//! interrupt handler calls [`AdjustFlags::on_pin_change`] with a snapshot of
//! the input port, which records the snapshot and raises a pending flag.
//! The main loop picks the flag up in [`Clock::tick`], reads the time from
//! the RTC, bumps the fields whose buttons are held down, writes the result
//! back, and then hands control to the power manager until the next
//! interrupt.
//!
//! Interrupt handlers only ever touch [`AdjustFlags`]. Bus transactions
//! busy-wait on the TWI controller and are started exclusively from the
//! main loop.
//!
//! [`AdjustFlags`]: struct.AdjustFlags.html
//! [`AdjustFlags::on_pin_change`]: struct.AdjustFlags.html#method.on_pin_change
//! [`Clock::tick`]: struct.Clock.html#method.tick

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embedded_hal::digital::InputPin;
use log::{debug, info};

use crate::datetime::{ClockValue, Field};
use crate::rtc::{Ds1307, SqwPinMode};
use crate::twi::{Result, TwiRegisters};

/// Port bit of the hour button.
pub const HOUR_PIN: u8 = 5;
/// Port bit of the minute button.
pub const MINUTE_PIN: u8 = 6;
/// Port bit of the second button.
pub const SECOND_PIN: u8 = 7;

/// Port bits of all three buttons.
pub const BUTTON_MASK: u8 = (1 << HOUR_PIN) | (1 << MINUTE_PIN) | (1 << SECOND_PIN);

/// State shared between the pin-change interrupt and the main loop.
///
/// Each flag has a single writer. The interrupt handler stores the pin
/// snapshot and raises `pending`. The main loop only reads the snapshot, and
/// clears `pending` with an atomic swap so a press arriving in between isn't
/// lost.
#[derive(Debug, Default)]
pub struct AdjustFlags {
    pending: AtomicBool,
    pins: AtomicU8,
}

impl AdjustFlags {
    /// Constructs a new `AdjustFlags`, suitable for a `static`.
    pub const fn new() -> AdjustFlags {
        AdjustFlags {
            pending: AtomicBool::new(false),
            pins: AtomicU8::new(0),
        }
    }

    /// Records a pin-change interrupt. Call from the interrupt handler.
    ///
    /// `pins` is a snapshot of the input port. If any pin changed and at
    /// least one button is held down, a time change is flagged as pending.
    ///
    /// Returns `true` if a time change is pending, in which case the handler
    /// should cancel any pending sleep.
    pub fn on_pin_change(&self, pins: u8) -> bool {
        let previous = self.pins.swap(pins, Ordering::SeqCst);
        let changed = previous ^ pins;

        if changed != 0 && pins & BUTTON_MASK != 0 {
            self.pending.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Returns the last recorded pin snapshot.
    pub fn pins(&self) -> u8 {
        self.pins.load(Ordering::SeqCst)
    }

    /// Returns `true` if a time change is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Clears the pending flag, returning whether it was set.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

/// Advances every field whose button is held down in `pins`.
pub fn apply_buttons(value: &ClockValue, pins: u8) -> ClockValue {
    let mut value = *value;

    for (pin, field) in [
        (HOUR_PIN, Field::Hour),
        (MINUTE_PIN, Field::Minute),
        (SECOND_PIN, Field::Second),
    ] {
        if pins & (1 << pin) != 0 {
            value = value.incremented(field);
        }
    }

    value
}

/// The three adjustment buttons, active high.
#[derive(Debug)]
pub struct Buttons<H, M, S> {
    hour: H,
    minute: M,
    second: S,
}

impl<H, M, S> Buttons<H, M, S>
where
    H: InputPin,
    M: InputPin<Error = H::Error>,
    S: InputPin<Error = H::Error>,
{
    /// Constructs a new `Buttons`.
    pub fn new(hour: H, minute: M, second: S) -> Buttons<H, M, S> {
        Buttons {
            hour,
            minute,
            second,
        }
    }

    /// Returns the button states as a port snapshot, with each pressed button
    /// setting its port bit.
    pub fn snapshot(&mut self) -> std::result::Result<u8, H::Error> {
        let mut pins = 0;

        if self.hour.is_high()? {
            pins |= 1 << HOUR_PIN;
        }
        if self.minute.is_high()? {
            pins |= 1 << MINUTE_PIN;
        }
        if self.second.is_high()? {
            pins |= 1 << SECOND_PIN;
        }

        Ok(pins)
    }
}

/// Puts the microcontroller to sleep between main loop iterations.
pub trait PowerControl {
    /// Enters a low-power state until the next interrupt.
    fn sleep(&mut self);
}

/// The clock's main loop.
#[derive(Debug)]
pub struct Clock<'a, R, P> {
    rtc: Ds1307<R>,
    power: P,
    flags: &'a AdjustFlags,
}

impl<'a, R: TwiRegisters, P: PowerControl> Clock<'a, R, P> {
    /// Constructs a new `Clock`.
    pub fn new(rtc: Ds1307<R>, power: P, flags: &'a AdjustFlags) -> Clock<'a, R, P> {
        Clock { rtc, power, flags }
    }

    /// Returns a mutable reference to the RTC.
    pub fn rtc_mut(&mut self) -> &mut Ds1307<R> {
        &mut self.rtc
    }

    /// Returns a reference to the power manager.
    pub fn power(&self) -> &P {
        &self.power
    }

    /// Starts the RTC oscillator and enables the 1 Hz tick on SQW/OUT.
    ///
    /// If `seed` is provided, the RTC is set to it first.
    pub fn setup(&mut self, seed: Option<&ClockValue>) -> Result<()> {
        self.rtc.init()?;

        if let Some(value) = seed {
            self.rtc.adjust(value)?;
        }

        self.rtc.set_square_wave(SqwPinMode::SquareWave1Hz)?;
        info!("Clock ready");

        Ok(())
    }

    /// Runs one main loop iteration, and returns the time that was read.
    ///
    /// If a time change is pending, the adjusted time is written to the RTC
    /// and returned instead. The power manager is invoked whether or not the
    /// bus transactions succeeded.
    pub fn tick(&mut self) -> Result<ClockValue> {
        let result = self.update();
        self.power.sleep();

        result
    }

    fn update(&mut self) -> Result<ClockValue> {
        let now = self.rtc.now()?;

        if !self.flags.take_pending() {
            return Ok(now);
        }

        let adjusted = apply_buttons(&now, self.flags.pins());
        debug!("Adjusting {} to {}", now, adjusted);
        self.rtc.adjust(&adjusted)?;

        Ok(adjusted)
    }
}
