//! Host test doubles shared by the integration tests.
#![allow(dead_code, reason = "each test binary uses a subset of the doubles")]

use std::cell::Cell;

use embassy_time::Duration;
use led_lanes::dma::DmaQueue;
use led_lanes::emitter::{CycleCounter, LineControl};
use led_lanes::{Error, Result};

/// One line-control call as seen by [`RecordingLines`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineEvent {
    Assert { mask: u32, at: u64 },
    Clear { mask: u32, at: u64 },
}

/// Counter that advances by `step` on every read.
#[derive(Clone, Debug)]
pub struct StepCounter {
    now: u64,
    step: u64,
}

impl StepCounter {
    pub const fn new(step: u64) -> Self {
        Self { now: 0, step }
    }
}

impl CycleCounter for StepCounter {
    fn now(&mut self) -> u64 {
        self.now += self.step;
        self.now
    }
}

/// `LineControl` that records every call and simulates a CPU whose cycle counter
/// advances a fixed step per read. A one-off jump can be armed to simulate an
/// interrupt stealing the CPU right after a given mark.
#[derive(Debug)]
pub struct RecordingLines {
    counter: StepCounter,
    events: Vec<LineEvent>,
    asserts: usize,
    clears: usize,
    jump: Option<(usize, u64)>,
    stall: Option<(usize, u64)>,
    pending_jump: u64,
}

impl RecordingLines {
    pub const fn new() -> Self {
        Self {
            counter: StepCounter::new(1),
            events: Vec::new(),
            asserts: 0,
            clears: 0,
            jump: None,
            stall: None,
            pending_jump: 0,
        }
    }

    /// After the `nth` assert (1-based), the next counter read jumps `cycles` ahead.
    pub fn with_jump_after_assert(mut self, nth: usize, cycles: u64) -> Self {
        self.jump = Some((nth, cycles));
        self
    }

    /// After the `nth` clear (1-based), the next counter read jumps `cycles` ahead.
    /// Bit `k` ends with clear `2 * k`, so this stalls the CPU between two bits.
    pub fn with_jump_after_clear(mut self, nth: usize, cycles: u64) -> Self {
        self.stall = Some((nth, cycles));
        self
    }

    pub fn events(&self) -> &[LineEvent] {
        &self.events
    }

    pub fn asserts(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.events.iter().filter_map(|event| match *event {
            LineEvent::Assert { mask, at } => Some((mask, at)),
            LineEvent::Clear { .. } => None,
        })
    }

    /// Recover each emitted bit-plane word: the lanes still high after the first clear
    /// of a bit period carried a `1`.
    pub fn decoded_words(&self) -> Vec<u32> {
        let mut words = Vec::new();
        let mut asserted = None;
        for event in &self.events {
            match *event {
                LineEvent::Assert { mask, .. } => asserted = Some(mask),
                LineEvent::Clear { mask, .. } => {
                    if let Some(high) = asserted.take() {
                        words.push(high & !mask);
                    }
                }
            }
        }
        words
    }

    /// Per bit, how long the zero lanes and the one lanes were held high.
    pub fn high_times(&self) -> Vec<(u64, u64)> {
        self.events
            .chunks_exact(3)
            .filter_map(|bit| match *bit {
                [
                    LineEvent::Assert { at: mark, .. },
                    LineEvent::Clear { at: zero_edge, .. },
                    LineEvent::Clear { at: one_edge, .. },
                ] => Some((zero_edge - mark, one_edge - mark)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.events.clear();
    }
}

impl LineControl for RecordingLines {
    fn assert(&mut self, mask: u32) {
        self.asserts += 1;
        if let Some((nth, cycles)) = self.jump {
            if nth == self.asserts {
                self.pending_jump = cycles;
                self.jump = None;
            }
        }
        self.events.push(LineEvent::Assert {
            mask,
            at: self.counter.now,
        });
    }

    fn clear(&mut self, mask: u32) {
        self.clears += 1;
        if let Some((nth, cycles)) = self.stall {
            if nth == self.clears {
                self.pending_jump = cycles;
                self.stall = None;
            }
        }
        self.events.push(LineEvent::Clear {
            mask,
            at: self.counter.now,
        });
    }

    fn read_cycle_counter(&mut self) -> u64 {
        self.counter.now += std::mem::take(&mut self.pending_jump);
        self.counter.now()
    }
}

/// How [`ScriptedQueue::wait`] answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    Complete,
    Timeout,
    Fail,
}

/// `DmaQueue` double that captures submitted bytes and answers `wait` from a script.
///
/// After each submission `is_busy` answers `true` for `busy_polls` calls, unless
/// `wait` completes or fails the transfer first.
#[derive(Debug)]
pub struct ScriptedQueue {
    pub submissions: Vec<Vec<u8>>,
    pub wait_outcome: WaitOutcome,
    pub reject_submit: bool,
    busy_polls: usize,
    remaining: Cell<usize>,
}

impl ScriptedQueue {
    pub const fn new(wait_outcome: WaitOutcome, busy_polls: usize) -> Self {
        Self {
            submissions: Vec::new(),
            wait_outcome,
            reject_submit: false,
            busy_polls,
            remaining: Cell::new(0),
        }
    }

    pub fn rejecting() -> Self {
        let mut queue = Self::new(WaitOutcome::Complete, 0);
        queue.reject_submit = true;
        queue
    }
}

impl DmaQueue for ScriptedQueue {
    type Handle = usize;

    fn submit(&mut self, bytes: &[u8]) -> Result<usize> {
        if self.reject_submit {
            return Err(Error::Submit);
        }
        self.submissions.push(bytes.to_vec());
        self.remaining.set(self.busy_polls);
        Ok(self.submissions.len())
    }

    async fn wait(&mut self, _handle: usize, _timeout: Duration) -> Result<bool> {
        match self.wait_outcome {
            WaitOutcome::Complete => {
                self.remaining.set(0);
                Ok(true)
            }
            WaitOutcome::Timeout => Ok(false),
            WaitOutcome::Fail => {
                self.remaining.set(0);
                Err(Error::Transport)
            }
        }
    }

    fn is_busy(&self, handle: usize) -> bool {
        if handle != self.submissions.len() {
            return false;
        }
        let remaining = self.remaining.get();
        if remaining == 0 {
            return false;
        }
        self.remaining.set(remaining - 1);
        true
    }
}
