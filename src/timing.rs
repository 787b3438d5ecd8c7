//! Chipset pulse timing in nanoseconds and its conversion to CPU-cycle budgets.
//!
//! A clockless bit period has three phases:
//!
//! ```text
//!          |<- t1 ->|<- t2 ->|<- t3 ->|
//!  bit 1:  ‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_________
//!  bit 0:  ‾‾‾‾‾‾‾‾‾‾|__________________
//! ```
//!
//! A `0` bit drops after `t1`; a `1` bit drops after `t1 + t2`; every bit period is
//! `t1 + t2 + t3` long.

use crate::{Error, Result};

/// A chipset's phase durations in nanoseconds plus its latch (reset) time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipsetTiming {
    /// Mark: every line high.
    pub t1_ns: u32,
    /// Data: `1` lines stay high, `0` lines are low.
    pub t2_ns: u32,
    /// Space: every line low.
    pub t3_ns: u32,
    /// Low time after the last bit before the strip latches.
    pub latch_us: u32,
}

impl ChipsetTiming {
    /// WS2812/WS2812B (800 kHz). Newer WS2812B parts need the long 280 µs latch.
    pub const WS2812: Self = Self::new(250, 625, 375, 280);
    /// WS2811 in 800 kHz mode.
    pub const WS2811: Self = Self::new(320, 320, 640, 50);
    /// WS2813.
    pub const WS2813: Self = Self::new(320, 320, 640, 300);
    /// SK6812 (RGB and RGBW).
    pub const SK6812: Self = Self::new(300, 600, 300, 80);
    /// TM1814.
    pub const TM1814: Self = Self::new(360, 600, 340, 200);
    /// TM1809/TM1804.
    pub const TM1809: Self = Self::new(350, 550, 450, 50);
    /// UCS1903 (400 kHz).
    pub const UCS1903: Self = Self::new(500, 1500, 500, 50);
    /// APA106.
    pub const APA106: Self = Self::new(400, 800, 400, 50);

    /// Describe a chipset's timing.
    #[must_use]
    pub const fn new(t1_ns: u32, t2_ns: u32, t3_ns: u32, latch_us: u32) -> Self {
        Self {
            t1_ns,
            t2_ns,
            t3_ns,
            latch_us,
        }
    }

    /// One bit period in nanoseconds.
    #[must_use]
    pub const fn period_ns(&self) -> u32 {
        self.t1_ns + self.t2_ns + self.t3_ns
    }
}

/// Phase durations in CPU cycles for one chipset at one clock speed.
///
/// Derived once at initialization and immutable afterwards.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingBudget {
    t1: u32,
    t2: u32,
    t3: u32,
    latch: u32,
}

impl TimingBudget {
    /// Convert `timing` to cycles of a `cpu_hz` clock, rounding each phase up.
    ///
    /// ```rust
    /// use led_lanes::timing::{ChipsetTiming, TimingBudget};
    ///
    /// let budget = TimingBudget::from_clock(125_000_000, ChipsetTiming::WS2812)?;
    /// assert_eq!((budget.t1(), budget.t2(), budget.t3()), (32, 79, 47));
    /// # Ok::<(), led_lanes::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockTooSlow`] when the clock is below 1 MHz or any phase
    /// would round to zero cycles.
    pub const fn from_clock(cpu_hz: u32, timing: ChipsetTiming) -> Result<Self> {
        let cpu_mhz = cpu_hz / 1_000_000;
        let t1 = ns_to_cycles(timing.t1_ns, cpu_mhz);
        let t2 = ns_to_cycles(timing.t2_ns, cpu_mhz);
        let t3 = ns_to_cycles(timing.t3_ns, cpu_mhz);
        if t1 == 0 || t2 == 0 || t3 == 0 {
            return Err(Error::ClockTooSlow { cpu_hz });
        }
        let latch = timing.latch_us.saturating_mul(cpu_mhz);
        Ok(Self { t1, t2, t3, latch })
    }

    /// Build a budget directly from cycle counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockTooSlow`] if any phase is zero cycles.
    pub const fn from_cycles(t1: u32, t2: u32, t3: u32, latch: u32) -> Result<Self> {
        if t1 == 0 || t2 == 0 || t3 == 0 {
            return Err(Error::ClockTooSlow { cpu_hz: 0 });
        }
        Ok(Self { t1, t2, t3, latch })
    }

    /// Mark phase in cycles.
    #[must_use]
    pub const fn t1(&self) -> u32 {
        self.t1
    }

    /// Data phase in cycles.
    #[must_use]
    pub const fn t2(&self) -> u32 {
        self.t2
    }

    /// Space phase in cycles.
    #[must_use]
    pub const fn t3(&self) -> u32 {
        self.t3
    }

    /// Latch hold in cycles.
    #[must_use]
    pub const fn latch(&self) -> u32 {
        self.latch
    }

    /// One bit period (`t1 + t2 + t3`) in cycles.
    #[must_use]
    pub const fn period(&self) -> u64 {
        self.t1 as u64 + self.t2 as u64 + self.t3 as u64
    }
}

const fn ns_to_cycles(ns: u32, cpu_mhz: u32) -> u32 {
    let cycles = (ns as u64 * cpu_mhz as u64 + 999) / 1000;
    if cycles > u32::MAX as u64 {
        u32::MAX
    } else {
        cycles as u32
    }
}
