//! Drive many addressable LED strips in parallel from one microcontroller.
//!
//! Each strip is a *lane*. Lanes of different lengths are front-padded with
//! off-pixel bytes so that every strip receives its last real byte at the same
//! instant and all strips latch together. The padded lanes are then *transposed*
//! into one interleaved buffer that is either bit-banged with cycle-accurate timing
//! ([`emitter`]) or streamed by a hardware queue ([`dma`]).
//!
//! ```text
//!  LaneSet ──► LaneLatchSynchronizer ──► PlaneTransposer ──┬──► CycleTimedEmitter (GPIO)
//!  (payload + padding per lane)          (TransposeBuffer) └──► ByteLaneTransmitter (DMA)
//! ```
//!
//! Everything up to the transpose buffer is pure and runs on the host; see the
//! tests.
//!
//! # Glossary
//!
//! - **Lane:** one physical output channel driving one strip.
//! - **Padding:** bytes prepended to a short lane; they render as black pixels.
//! - **Bit plane:** one word holding the same bit position of every lane, one lane per
//!   bit.
//! - **Mark / data / space:** the three phases (`t1`, `t2`, `t3`) of one clockless bit
//!   period.
//! - **Latch:** the low time after the last bit that makes strips display their data.
//! - **Overrun:** a bit period that starts too late to be within tolerance; the frame
//!   is dropped.
#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded")]

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[cfg(all(target_os = "none", not(any(feature = "pico1", feature = "pico2"))))]
compile_error!("Bare-metal builds must enable a board feature: 'pico1' or 'pico2'");

pub mod dma;
pub mod emitter;
mod error;
pub mod lane;
pub mod latch;
pub mod padding;
pub mod pixel;
#[cfg(all(
    target_os = "none",
    feature = "arm",
    any(feature = "pico1", feature = "pico2")
))]
pub mod rp;
pub mod timing;
pub mod transpose;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
