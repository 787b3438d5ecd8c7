#![allow(missing_docs)]
#![no_std]
#![no_main]

use core::{convert::Infallible, panic};

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use led_lanes::{
    Result,
    emitter::{CycleTimedEmitter, EmitConfig, Preemption},
    lane::{Lane, LaneSet},
    padding::Protocol,
    pixel::{ColorOrder, encode_pixels},
    rp::{SioLines, SysTickCounter, timing_budget},
    timing::ChipsetTiming,
    transpose::{Granularity, PlaneTransposer, TransposeBuffer},
};
use smart_leds::RGB8;
use {defmt_rtt as _, panic_probe as _};

const LANES: usize = 4;
const LEN: usize = 8;
const FRAME_CAP: usize = LEN * 3 * 8;

const COLORS: [RGB8; LANES] = [
    RGB8::new(32, 0, 0),
    RGB8::new(0, 32, 0),
    RGB8::new(0, 0, 32),
    RGB8::new(24, 24, 24),
];

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

    // Four WS2812 strips on GPIO 2..=5, switched together through SIO.
    let lines = SioLines::new(
        [p.PIN_2.into(), p.PIN_3.into(), p.PIN_4.into(), p.PIN_5.into()],
        SysTickCounter::new(cortex.SYST),
    )?;
    let budget = timing_budget(ChipsetTiming::WS2812)?;
    let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::new(Preemption::Disabled));
    let transposer = PlaneTransposer::new(Granularity::BitPlane);
    let mut frame = TransposeBuffer::<FRAME_CAP>::new();
    let mut payloads = [[0u8; LEN * 3]; LANES];

    let mut step = 0usize;
    loop {
        for (lane, payload) in payloads.iter_mut().enumerate() {
            let pixels: [RGB8; LEN] = core::array::from_fn(|index| {
                if index == (step + lane) % LEN {
                    COLORS[lane]
                } else {
                    RGB8::default()
                }
            });
            encode_pixels(&pixels, ColorOrder::Grb, payload)?;
        }

        let mut lane_set = LaneSet::<LANES>::new();
        for (lane, payload) in payloads.iter().enumerate() {
            lane_set.set(lane, Lane::new(payload, Protocol::Ws2812))?;
        }
        transposer.transpose_into(&lane_set, &mut frame)?;
        emitter.emit_gpio(&frame, &budget)?;

        step = step.wrapping_add(1);
        Timer::after(Duration::from_millis(100)).await;
    }
}
