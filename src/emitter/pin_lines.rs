//! Portable [`LineControl`] over an array of `embedded-hal` output pins.
//!
//! Pins are toggled one at a time, so lane edges skew by a few cycles per lane. Use a
//! register-level backend (see `rp::SioLines` on RP2040/RP2350) when lanes must switch
//! together.

use embedded_hal::digital::OutputPin;

use super::{CycleCounter, LineControl};
use crate::transpose::BIT_PLANE_MAX_LANES;
use crate::{Error, Result};

/// `N` output pins plus a cycle counter. Pin `L` is lane `L`.
///
/// Pin errors cannot be reported mid-frame, so the first one is latched and returned
/// by [`take_fault`](Self::take_fault).
pub struct PinLines<P, C, const N: usize> {
    pins: [P; N],
    counter: C,
    faulted: bool,
}

impl<P: OutputPin, C: CycleCounter, const N: usize> PinLines<P, C, N> {
    /// Wrap `pins` and `counter`.
    #[must_use]
    pub const fn new(pins: [P; N], counter: C) -> Self {
        Self {
            pins,
            counter,
            faulted: false,
        }
    }

    /// Report (and reset) any pin error seen since the last call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pin`] if any pin write failed.
    pub fn take_fault(&mut self) -> Result<()> {
        if core::mem::take(&mut self.faulted) {
            return Err(Error::Pin);
        }
        Ok(())
    }

    /// Give the pins and counter back.
    #[must_use]
    pub fn into_parts(self) -> ([P; N], C) {
        (self.pins, self.counter)
    }
}

impl<P: OutputPin, C: CycleCounter, const N: usize> LineControl for PinLines<P, C, N> {
    fn assert(&mut self, mask: u32) {
        for (lane, pin) in self.pins.iter_mut().take(BIT_PLANE_MAX_LANES).enumerate() {
            if (mask >> lane) & 1 == 1 && pin.set_high().is_err() {
                self.faulted = true;
            }
        }
    }

    fn clear(&mut self, mask: u32) {
        for (lane, pin) in self.pins.iter_mut().take(BIT_PLANE_MAX_LANES).enumerate() {
            if (mask >> lane) & 1 == 1 && pin.set_low().is_err() {
                self.faulted = true;
            }
        }
    }

    fn read_cycle_counter(&mut self) -> u64 {
        self.counter.now()
    }
}
