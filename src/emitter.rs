//! Cycle-timed bit-banging of a bit-plane [`TransposeBuffer`] onto parallel lines.
//!
//! Every bit period walks the same state machine against one monotonic deadline:
//!
//! ```text
//!  WAIT_MARK → ASSERT_ALL → WAIT_DATA_EDGE → CLEAR_ZERO_BITS → WAIT_SPACE_EDGE → CLEAR_ALL
//!      ↑                                                                          │
//!      └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The emitter only needs the three [`LineControl`] capabilities, so any backend that
//! can set and clear a line mask and read a cycle counter can host it. See
//! [`PinLines`](pin_lines::PinLines) for a portable `embedded-hal` backend.
//!
//! # Preemption
//!
//! With [`Preemption::Disabled`] the whole frame runs in one critical section. With
//! [`Preemption::Allowed`] each lane byte (8 bit periods) runs in its own critical
//! section so interrupts are serviced between bytes. If an interrupt holds the CPU so
//! long that the next mark is later than `period - overrun_margin_cycles`, the rest of
//! the frame is dropped rather than emitting an out-of-tolerance pulse. The strips
//! latch whatever they received; the next frame starts over. A mark that is late but
//! within tolerance restarts the bit timeline, so its high pulse keeps full length.
//!
//! # Example
//!
//! ```rust,no_run
//! use led_lanes::emitter::{CycleTimedEmitter, EmitConfig, LineControl, Preemption};
//! use led_lanes::lane::{Lane, LaneSet};
//! use led_lanes::padding::Protocol;
//! use led_lanes::timing::{ChipsetTiming, TimingBudget};
//! use led_lanes::transpose::{Granularity, TransposeBuffer, transpose};
//!
//! fn show(lines: impl LineControl, porch: &[u8], eaves: &[u8]) -> led_lanes::Result<()> {
//!     let budget = TimingBudget::from_clock(125_000_000, ChipsetTiming::WS2812)?;
//!     let lane_set = LaneSet::<2>::new()
//!         .with_lane(0, Lane::new(porch, Protocol::Ws2812))?
//!         .with_lane(1, Lane::new(eaves, Protocol::Ws2812))?;
//!     let buffer: TransposeBuffer<4096> = transpose(&lane_set, Granularity::BitPlane)?;
//!
//!     let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::new(Preemption::Allowed));
//!     let report = emitter.emit_gpio(&buffer, &budget)?;
//!     if !report.is_complete() {
//!         // Overrun: this frame was cut short. Send the next one as usual.
//!     }
//!     Ok(())
//! }
//! ```

use crate::timing::TimingBudget;
use crate::transpose::{Granularity, TransposeBuffer};
use crate::{Error, Result};

pub mod pin_lines;

/// Minimal line-control capability the emitter runs on.
///
/// Bit `L` of a mask is lane `L`.
pub trait LineControl {
    /// Drive every line in `mask` high.
    fn assert(&mut self, mask: u32);

    /// Drive every line in `mask` low.
    fn clear(&mut self, mask: u32);

    /// Read a monotonically increasing CPU cycle count.
    fn read_cycle_counter(&mut self) -> u64;
}

/// A monotonically increasing CPU cycle count.
pub trait CycleCounter {
    /// Current cycle count.
    fn now(&mut self) -> u64;
}

/// Whether interrupts may run while a frame is emitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Preemption {
    /// Interrupts are masked for the whole frame; the frame always completes.
    Disabled,
    /// Interrupts may run between lane bytes; a late mark aborts the frame.
    Allowed,
}

/// Default preemption mode for [`EmitConfig`] (`Preemption::Disabled`).
pub const PREEMPTION_DEFAULT: Preemption = Preemption::Disabled;

/// Default overrun margin for [`EmitConfig`] (`0`): abort once a mark is a whole bit
/// period late.
///
/// The right margin depends on the chipset and the CPU; tune it per target.
pub const OVERRUN_MARGIN_CYCLES_DEFAULT: u32 = 0;

/// Caller-chosen emission settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmitConfig {
    /// Whether interrupts may run during a frame.
    pub preemption: Preemption,
    /// Cycles subtracted from the bit period to get the largest tolerated lateness.
    pub overrun_margin_cycles: u32,
}

impl EmitConfig {
    /// Settings with the given preemption mode and the default margin.
    #[must_use]
    pub const fn new(preemption: Preemption) -> Self {
        Self {
            preemption,
            overrun_margin_cycles: OVERRUN_MARGIN_CYCLES_DEFAULT,
        }
    }

    /// Replace the overrun margin.
    #[must_use]
    pub const fn with_overrun_margin(self, overrun_margin_cycles: u32) -> Self {
        Self {
            preemption: self.preemption,
            overrun_margin_cycles,
        }
    }
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self::new(PREEMPTION_DEFAULT)
    }
}

/// Outcome of one [`CycleTimedEmitter::emit_gpio`] call.
///
/// An overrun is a normal outcome: check [`is_complete`](Self::is_complete).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmitReport {
    bits_emitted: usize,
    bits_expected: usize,
    period: u64,
    stopped_at: u64,
}

impl EmitReport {
    /// Bit periods fully emitted.
    #[must_use]
    pub const fn bits_emitted(&self) -> usize {
        self.bits_emitted
    }

    /// Bit periods in the frame.
    #[must_use]
    pub const fn bits_expected(&self) -> usize {
        self.bits_expected
    }

    /// Protocol cycles emitted (`bits_emitted * period`).
    #[must_use]
    pub const fn cycles_completed(&self) -> u64 {
        self.bits_emitted as u64 * self.period
    }

    /// Protocol cycles in the full frame.
    #[must_use]
    pub const fn expected_cycles(&self) -> u64 {
        self.bits_expected as u64 * self.period
    }

    /// Cycle counter value when emission stopped.
    #[must_use]
    pub const fn stopped_at(&self) -> u64 {
        self.stopped_at
    }

    /// Whether every bit period was emitted.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.bits_emitted == self.bits_expected
    }
}

/// Real-time driver for the GPIO bit-banging path.
///
/// Owns its [`LineControl`] for as long as it lives, so only one frame can be in
/// flight on those lines.
pub struct CycleTimedEmitter<L> {
    lines: L,
    config: EmitConfig,
    latch_ready_at: Option<u64>,
}

impl<L: LineControl> CycleTimedEmitter<L> {
    /// Create an emitter over `lines`.
    #[must_use]
    pub const fn new(lines: L, config: EmitConfig) -> Self {
        Self {
            lines,
            config,
            latch_ready_at: None,
        }
    }

    /// Current settings.
    #[must_use]
    pub const fn config(&self) -> EmitConfig {
        self.config
    }

    /// Replace the settings for later frames.
    pub const fn set_config(&mut self, config: EmitConfig) {
        self.config = config;
    }

    /// The line backend.
    #[must_use]
    pub const fn lines(&self) -> &L {
        &self.lines
    }

    /// Give the line backend back.
    #[must_use]
    pub fn into_lines(self) -> L {
        self.lines
    }

    /// Emit every bit-plane word of `buffer`, blocking until the frame completes or
    /// is aborted by an overrun.
    ///
    /// Before the first mark, waits until the previous frame's latch time has elapsed.
    /// An empty buffer is a no-op that reports a complete zero-length frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GranularityMismatch`] unless `buffer` holds bit planes. Errors
    /// are reported before any line is touched.
    pub fn emit_gpio<const CAP: usize>(
        &mut self,
        buffer: &TransposeBuffer<CAP>,
        budget: &TimingBudget,
    ) -> Result<EmitReport> {
        if buffer.granularity() != Granularity::BitPlane {
            return Err(Error::GranularityMismatch {
                expected: Granularity::BitPlane,
                actual: buffer.granularity(),
            });
        }
        let words = buffer.word_count();
        if words == 0 {
            return Ok(EmitReport {
                bits_emitted: 0,
                bits_expected: 0,
                period: budget.period(),
                stopped_at: self.lines.read_cycle_counter(),
            });
        }

        if let Some(ready_at) = self.latch_ready_at {
            spin_until(&mut self.lines, ready_at);
        }

        let frame = Frame {
            buffer,
            mask: buffer.lane_mask(),
            budget,
            overrun_limit: budget
                .period()
                .saturating_sub(u64::from(self.config.overrun_margin_cycles)),
        };
        let mut cursor = Cursor {
            deadline: self.lines.read_cycle_counter(),
            emitted: 0,
            stopped_at: 0,
        };

        let lines = &mut self.lines;
        match self.config.preemption {
            Preemption::Disabled => {
                critical_section::with(|_| frame.run(lines, 0..words, &mut cursor, false));
            }
            Preemption::Allowed => {
                for start in (0..words).step_by(8) {
                    let end = (start + 8).min(words);
                    let outcome =
                        critical_section::with(|_| frame.run(lines, start..end, &mut cursor, true));
                    if outcome == Outcome::Aborted {
                        break;
                    }
                }
            }
        }

        #[cfg(feature = "defmt")]
        if cursor.emitted < words {
            defmt::warn!(
                "emit_gpio: overrun {} cycles late, dropped frame after {} of {} bits",
                cursor.stopped_at - cursor.deadline,
                cursor.emitted,
                words
            );
        } else {
            defmt::trace!("emit_gpio: {} bits emitted", words);
        }

        self.latch_ready_at = Some(cursor.stopped_at + u64::from(budget.latch()));
        Ok(EmitReport {
            bits_emitted: cursor.emitted,
            bits_expected: words,
            period: budget.period(),
            stopped_at: cursor.stopped_at,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Outcome {
    Completed,
    Aborted,
}

struct Cursor {
    deadline: u64,
    emitted: usize,
    stopped_at: u64,
}

struct Frame<'b, const CAP: usize> {
    buffer: &'b TransposeBuffer<CAP>,
    mask: u32,
    budget: &'b TimingBudget,
    overrun_limit: u64,
}

impl<const CAP: usize> Frame<'_, CAP> {
    fn run<L: LineControl>(
        &self,
        lines: &mut L,
        words: core::ops::Range<usize>,
        cursor: &mut Cursor,
        check_overrun: bool,
    ) -> Outcome {
        let period = self.budget.period();
        let data_and_space = u64::from(self.budget.t2()) + u64::from(self.budget.t3());
        let space = u64::from(self.budget.t3());

        let mut word = self.buffer.word(words.start);
        for index in words {
            // WAIT_MARK
            let now = spin_until(lines, cursor.deadline);
            if check_overrun && now - cursor.deadline > self.overrun_limit {
                cursor.stopped_at = now;
                return Outcome::Aborted;
            }

            // ASSERT_ALL. A tolerated late mark restarts the bit timeline at `now`, so
            // lateness only lengthens the low time before it.
            cursor.deadline = now + period;
            lines.assert(self.mask);
            let next = self.buffer.word(index + 1);

            // WAIT_DATA_EDGE, then CLEAR_ZERO_BITS
            spin_until(lines, cursor.deadline - data_and_space);
            lines.clear(!word & self.mask);

            // WAIT_SPACE_EDGE, then CLEAR_ALL
            cursor.stopped_at = spin_until(lines, cursor.deadline - space);
            lines.clear(word & self.mask);

            cursor.emitted += 1;
            word = next;
        }
        Outcome::Completed
    }
}

// Returns the first counter reading at or past `deadline`.
fn spin_until<L: LineControl>(lines: &mut L, deadline: u64) -> u64 {
    loop {
        let now = lines.read_cycle_counter();
        if now >= deadline {
            return now;
        }
    }
}
