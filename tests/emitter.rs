#![allow(missing_docs)]
//! Host-level tests for the cycle-timed GPIO emitter, driven by a simulated cycle
//! counter.

mod support;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use led_lanes::Error;
use led_lanes::emitter::pin_lines::PinLines;
use led_lanes::emitter::{CycleTimedEmitter, EmitConfig, Preemption};
use led_lanes::lane::{Lane, LaneSet};
use led_lanes::timing::TimingBudget;
use led_lanes::transpose::{Granularity, TransposeBuffer, transpose};
use support::{LineEvent, RecordingLines, StepCounter};

const ZERO: &[u8] = &[0x00];
const T1: u32 = 4;
const T2: u32 = 8;
const T3: u32 = 6;
const PERIOD: u64 = 18;
const LATCH: u32 = 100;

fn budget() -> TimingBudget {
    TimingBudget::from_cycles(T1, T2, T3, LATCH).expect("non-zero phases")
}

fn two_lane_frame() -> TransposeBuffer<64> {
    let lane0 = [0xA5];
    let lane1 = [0x3C, 0x81];
    let lane_set = LaneSet::<2>::new()
        .with_lane(0, Lane::with_padding(&lane0, ZERO))
        .and_then(|set| set.with_lane(1, Lane::with_padding(&lane1, ZERO)))
        .expect("lanes fit");
    transpose(&lane_set, Granularity::BitPlane).expect("fits")
}

#[test]
fn complete_frame_emits_every_word() {
    let buffer = two_lane_frame();
    let mut emitter = CycleTimedEmitter::new(RecordingLines::new(), EmitConfig::default());

    let report = emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    assert!(report.is_complete());
    assert_eq!(report.bits_emitted(), 16);
    assert_eq!(report.cycles_completed(), 16 * PERIOD);
    assert_eq!(report.cycles_completed(), report.expected_cycles());

    let lines = emitter.lines();
    let expected: Vec<u32> = (0..16).map(|index| buffer.word(index)).collect();
    assert_eq!(lines.decoded_words(), expected);
    assert!(lines.asserts().all(|(mask, _)| mask == 0b11));
    assert!(matches!(lines.events().last(), Some(LineEvent::Clear { .. })));
}

#[test]
fn pulses_follow_the_cycle_budget() {
    let buffer = two_lane_frame();
    let mut emitter =
        CycleTimedEmitter::new(RecordingLines::new(), EmitConfig::new(Preemption::Allowed));
    emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");

    let events = emitter.lines().events();
    assert_eq!(events.len(), 16 * 3);
    let mut previous_mark = None;
    for bit in events.chunks_exact(3).skip(1) {
        let [
            LineEvent::Assert { at: mark, .. },
            LineEvent::Clear { at: data_edge, .. },
            LineEvent::Clear { at: space_edge, .. },
        ] = bit
        else {
            panic!("unexpected event order: {bit:?}");
        };
        assert_eq!(data_edge - mark, u64::from(T1));
        assert_eq!(space_edge - mark, u64::from(T1 + T2));
        if let Some(previous) = previous_mark {
            assert_eq!(mark - previous, PERIOD);
        }
        previous_mark = Some(mark);
    }
}

#[test]
fn late_mark_aborts_when_preemption_is_allowed() {
    let buffer = two_lane_frame();
    let lines = RecordingLines::new().with_jump_after_assert(5, 10 * PERIOD);
    let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::new(Preemption::Allowed));

    let report = emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    assert!(!report.is_complete());
    assert_eq!(report.bits_emitted(), 5);
    assert_eq!(report.bits_expected(), 16);
    assert!(report.cycles_completed() < report.expected_cycles());

    // Nothing touches the lines after the abort, and they are left low.
    let lines = emitter.lines();
    assert_eq!(lines.asserts().count(), 5);
    assert_eq!(lines.events().len(), 5 * 3);
    assert!(matches!(lines.events().last(), Some(LineEvent::Clear { .. })));
}

#[test]
fn late_mark_is_ridden_out_when_preemption_is_disabled() {
    let buffer = two_lane_frame();
    let lines = RecordingLines::new().with_jump_after_assert(5, 10 * PERIOD);
    let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::new(Preemption::Disabled));

    let report = emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    assert!(report.is_complete());
    assert_eq!(emitter.lines().asserts().count(), 16);
}

#[test]
fn overrun_margin_tightens_the_tolerance() {
    let buffer = two_lane_frame();
    // Stalls between the third and fourth bit, leaving the fourth mark 12 cycles late.
    let stall = 17;

    let lines = RecordingLines::new().with_jump_after_clear(6, stall);
    let mut lenient = CycleTimedEmitter::new(lines, EmitConfig::new(Preemption::Allowed));
    let report = lenient.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    assert!(report.is_complete());

    let lines = RecordingLines::new().with_jump_after_clear(6, stall);
    let config = EmitConfig::new(Preemption::Allowed).with_overrun_margin(10);
    let mut strict = CycleTimedEmitter::new(lines, config);
    let report = strict.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    assert_eq!(report.bits_emitted(), 3);
}

#[test]
fn tolerated_late_mark_keeps_full_pulse_widths() {
    let buffer = two_lane_frame();
    for preemption in [Preemption::Allowed, Preemption::Disabled] {
        let lines = RecordingLines::new().with_jump_after_clear(6, 17);
        let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::new(preemption));
        let report = emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
        assert!(report.is_complete(), "{preemption:?}");

        let lines = emitter.lines();
        let high_times = lines.high_times();
        assert_eq!(high_times.len(), 16);
        for (bit, high) in high_times.into_iter().enumerate() {
            assert_eq!(
                high,
                (u64::from(T1), u64::from(T1 + T2)),
                "{preemption:?} bit {bit}"
            );
        }

        let marks: Vec<u64> = lines.asserts().map(|(_, at)| at).collect();
        assert_eq!(marks[3] - marks[2], PERIOD + 12, "{preemption:?}");
        assert_eq!(marks[4] - marks[3], PERIOD, "{preemption:?}");
    }
}

#[test]
fn next_frame_waits_for_the_latch() {
    let buffer = two_lane_frame();
    let mut emitter = CycleTimedEmitter::new(RecordingLines::new(), EmitConfig::default());

    let first = emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    let Some(&LineEvent::Clear { at: last_edge, .. }) = emitter.lines().events().last() else {
        panic!("frame must end with a clear");
    };
    assert_eq!(first.stopped_at(), last_edge);

    let events_before = emitter.lines().events().len();
    emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    let Some(&LineEvent::Assert { at: next_mark, .. }) =
        emitter.lines().events().get(events_before)
    else {
        panic!("second frame must start with a mark");
    };
    assert!(next_mark - last_edge >= u64::from(LATCH));
}

#[test]
fn latch_also_follows_an_aborted_frame() {
    let buffer = two_lane_frame();
    let lines = RecordingLines::new().with_jump_after_assert(2, 10 * PERIOD);
    let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::new(Preemption::Allowed));

    let aborted = emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    assert!(!aborted.is_complete());

    let events_before = emitter.lines().events().len();
    let report = emitter.emit_gpio(&buffer, &budget()).expect("bit-plane buffer");
    assert!(report.is_complete());
    let Some(&LineEvent::Assert { at: next_mark, .. }) =
        emitter.lines().events().get(events_before)
    else {
        panic!("second frame must start with a mark");
    };
    assert!(next_mark - aborted.stopped_at() >= u64::from(LATCH));
}

#[test]
fn non_bit_plane_buffer_is_rejected_before_touching_lines() {
    let payload = [0xFF];
    let lane_set = LaneSet::<2>::new()
        .with_lane(0, Lane::with_padding(&payload, ZERO))
        .expect("lane fits");
    let quad: TransposeBuffer<16> = transpose(&lane_set, Granularity::Quad).expect("fits");
    let mut emitter = CycleTimedEmitter::new(RecordingLines::new(), EmitConfig::default());

    assert_eq!(
        emitter.emit_gpio(&quad, &budget()),
        Err(Error::GranularityMismatch {
            expected: Granularity::BitPlane,
            actual: Granularity::Quad,
        })
    );
    assert!(emitter.lines().events().is_empty());
}

#[test]
fn empty_frame_is_a_no_op() {
    let empty = TransposeBuffer::<16>::new();
    let mut emitter = CycleTimedEmitter::new(RecordingLines::new(), EmitConfig::default());

    let report = emitter.emit_gpio(&empty, &budget()).expect("bit-plane buffer");
    assert!(report.is_complete());
    assert_eq!(report.bits_expected(), 0);
    assert!(emitter.lines().events().is_empty());
}

#[derive(Debug)]
struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Default)]
struct MockPin {
    high: bool,
    rises: usize,
    falls: usize,
    broken: bool,
}

impl ErrorType for MockPin {
    type Error = PinFault;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        if self.broken {
            return Err(PinFault);
        }
        self.high = false;
        self.falls += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        if self.broken {
            return Err(PinFault);
        }
        self.high = true;
        self.rises += 1;
        Ok(())
    }
}

fn three_lane_frame() -> TransposeBuffer<64> {
    let lane_set = LaneSet::<3>::from_lanes([
        Some(Lane::with_padding(&[0x01], ZERO)),
        Some(Lane::with_padding(&[0xFE], ZERO)),
        Some(Lane::with_padding(&[0x5A], ZERO)),
    ]);
    transpose(&lane_set, Granularity::BitPlane).expect("fits")
}

#[test]
fn pin_lines_pulse_every_pin_once_per_bit() {
    let lines = PinLines::new(
        [MockPin::default(), MockPin::default(), MockPin::default()],
        StepCounter::new(1),
    );
    let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::default());
    let report = emitter
        .emit_gpio(&three_lane_frame(), &budget())
        .expect("bit-plane buffer");
    assert!(report.is_complete());

    let mut lines = emitter.into_lines();
    assert_eq!(lines.take_fault(), Ok(()));
    let (pins, _counter) = lines.into_parts();
    for pin in pins {
        assert_eq!((pin.rises, pin.falls, pin.high), (8, 8, false));
    }
}

#[test]
fn pin_errors_are_latched_for_later() {
    let broken = MockPin {
        broken: true,
        ..MockPin::default()
    };
    let lines = PinLines::new(
        [MockPin::default(), broken, MockPin::default()],
        StepCounter::new(1),
    );
    let mut emitter = CycleTimedEmitter::new(lines, EmitConfig::default());
    let report = emitter
        .emit_gpio(&three_lane_frame(), &budget())
        .expect("bit-plane buffer");
    assert!(report.is_complete());

    let mut lines = emitter.into_lines();
    assert_eq!(lines.take_fault(), Err(Error::Pin));
    assert_eq!(lines.take_fault(), Ok(()));
}
