#![allow(missing_docs)]
#![no_std]
#![no_main]

use core::{convert::Infallible, panic};

use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_time::{Duration, Timer};
use led_lanes::{
    Result,
    emitter::{CycleTimedEmitter, EmitConfig, Preemption, pin_lines::PinLines},
    lane::{Lane, LaneSet},
    padding::Protocol,
    pixel::{ColorOrder, encode_pixels},
    rp::{SysTickCounter, timing_budget},
    timing::ChipsetTiming,
    transpose::{Granularity, PlaneTransposer, TransposeBuffer},
};
use smart_leds::RGB8;
use {defmt_rtt as _, panic_probe as _};

const SHORT: usize = 8;
const MEDIUM: usize = 30;
const LONG: usize = 60;
const FRAME_CAP: usize = LONG * 3 * 8;

const DOT: RGB8 = RGB8::new(0, 16, 48);

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let err = inner_main().await.unwrap_err();
    panic!("{err}");
}

async fn inner_main() -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());
    let Some(cortex) = cortex_m::Peripherals::take() else {
        panic!("core peripherals already taken");
    };

    // Three strips of different lengths on arbitrary pins. The dots reach the far
    // end of every strip on the same frame because short strips are front-padded.
    let pins = [
        Output::new(p.PIN_6, Level::Low),
        Output::new(p.PIN_9, Level::Low),
        Output::new(p.PIN_14, Level::Low),
    ];
    let lines = PinLines::new(pins, SysTickCounter::new(cortex.SYST));
    let budget = timing_budget(ChipsetTiming::WS2812)?;
    let config = EmitConfig::new(Preemption::Allowed).with_overrun_margin(16);
    let mut emitter = CycleTimedEmitter::new(lines, config);
    let transposer = PlaneTransposer::new(Granularity::BitPlane);
    let mut frame = TransposeBuffer::<FRAME_CAP>::new();

    let mut short = [0u8; SHORT * 3];
    let mut medium = [0u8; MEDIUM * 3];
    let mut long = [0u8; LONG * 3];
    let mut dropped = 0u32;

    let mut step = 0usize;
    loop {
        chase(&mut short, step)?;
        chase(&mut medium, step)?;
        chase(&mut long, step)?;

        let lane_set = LaneSet::<3>::from_lanes([
            Some(Lane::new(&short, Protocol::Ws2812)),
            Some(Lane::new(&medium, Protocol::Ws2812)),
            Some(Lane::new(&long, Protocol::Ws2812)),
        ]);
        transposer.transpose_into(&lane_set, &mut frame)?;
        let report = emitter.emit_gpio(&frame, &budget)?;
        if !report.is_complete() {
            dropped += 1;
            defmt::warn!(
                "frame {} dropped after {} of {} bits ({} so far)",
                step,
                report.bits_emitted(),
                report.bits_expected(),
                dropped
            );
        }

        step = step.wrapping_add(1);
        Timer::after(Duration::from_millis(40)).await;
    }
}

// One lit pixel per strip, counted back from the strip's last pixel.
fn chase(payload: &mut [u8], step: usize) -> Result<usize> {
    let mut pixels = [RGB8::default(); LONG];
    let len = payload.len() / 3;
    if let Some(pixel) = pixels.get_mut(len - 1 - step % len) {
        *pixel = DOT;
    }
    encode_pixels(&pixels[..len], ColorOrder::Grb, payload)
}
