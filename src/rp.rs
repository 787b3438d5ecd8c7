//! RP2040/RP2350 backends: single-cycle SIO line control and a SysTick cycle counter.
//!
//! ```rust,ignore
//! let p = embassy_rp::init(Default::default());
//! let counter = SysTickCounter::new(cortex_m::Peripherals::take().unwrap().SYST);
//! let lines = SioLines::new([p.PIN_2.into(), p.PIN_3.into(), p.PIN_4.into()], counter)?;
//! let budget = timing_budget(ChipsetTiming::WS2812)?;
//! let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::default());
//! ```

use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;
use embassy_rp::Peri;
use embassy_rp::gpio::{AnyPin, Level, Output, Pin};

use crate::emitter::{CycleCounter, LineControl};
use crate::timing::{ChipsetTiming, TimingBudget};
use crate::{Error, Result};

/// SysTick's 24-bit reload value.
const SYSTICK_RELOAD: u32 = 0x00FF_FFFF;

/// CPU cycle counter built on the 24-bit down-counting SysTick.
///
/// Each read folds the cycles since the previous read into a `u64`. Reads must be
/// less than 2^24 cycles apart to stay exact; a longer gap undercounts, which only
/// lengthens the next latch wait.
pub struct SysTickCounter {
    _syst: SYST,
    last: u32,
    elapsed: u64,
}

impl SysTickCounter {
    /// Take over SysTick, clocked from the core clock.
    #[must_use]
    pub fn new(mut syst: SYST) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(SYSTICK_RELOAD);
        syst.clear_current();
        syst.enable_counter();
        Self {
            _syst: syst,
            last: SYST::get_current(),
            elapsed: 0,
        }
    }
}

impl CycleCounter for SysTickCounter {
    fn now(&mut self) -> u64 {
        let current = SYST::get_current();
        let delta = self.last.wrapping_sub(current) & SYSTICK_RELOAD;
        self.last = current;
        self.elapsed += u64::from(delta);
        self.elapsed
    }
}

/// Line control through the SIO set/clear registers, so every lane switches on the
/// same cycle.
///
/// Lanes must be consecutive bank-0 GPIOs; lane `L` is GPIO `base + L`.
pub struct SioLines<'d, C, const N: usize> {
    _outputs: [Output<'d>; N],
    lane_mask: u32,
    shift: u32,
    counter: C,
}

impl<'d, C: CycleCounter, const N: usize> SioLines<'d, C, N> {
    /// Configure `pins` as low outputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoLanes`] for an empty pin array and
    /// [`Error::NonContiguousPins`] unless the pins are consecutive GPIOs below 30.
    pub fn new(pins: [Peri<'d, AnyPin>; N], counter: C) -> Result<Self> {
        let Some(base) = pins.first().map(|pin| pin.pin()) else {
            return Err(Error::NoLanes);
        };
        let contiguous = pins
            .iter()
            .enumerate()
            .all(|(lane, pin)| usize::from(pin.pin()) == usize::from(base) + lane);
        if !contiguous || usize::from(base) + N > 30 {
            return Err(Error::NonContiguousPins);
        }

        defmt::info!("SioLines: {} lanes on GPIO{}..GPIO{}", N, base, usize::from(base) + N - 1);
        Ok(Self {
            _outputs: pins.map(|pin| Output::new(pin, Level::Low)),
            lane_mask: (1u32 << N) - 1,
            shift: u32::from(base),
            counter,
        })
    }
}

impl<C: CycleCounter, const N: usize> LineControl for SioLines<'_, C, N> {
    fn assert(&mut self, mask: u32) {
        embassy_rp::pac::SIO
            .gpio_out(0)
            .value_set()
            .write_value((mask & self.lane_mask) << self.shift);
    }

    fn clear(&mut self, mask: u32) {
        embassy_rp::pac::SIO
            .gpio_out(0)
            .value_clr()
            .write_value((mask & self.lane_mask) << self.shift);
    }

    fn read_cycle_counter(&mut self) -> u64 {
        self.counter.now()
    }
}

/// Cycle budget for `timing` at the current system clock.
///
/// # Errors
///
/// Returns [`Error::ClockTooSlow`] if the system clock cannot resolve the timing.
pub fn timing_budget(timing: ChipsetTiming) -> Result<TimingBudget> {
    TimingBudget::from_clock(embassy_rp::clocks::clk_sys_freq(), timing)
}
