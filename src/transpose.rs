//! Plane transposition: interleave per-lane bytes so each output unit carries one
//! slice from every lane.
//!
//! Three packings are supported (see [`Granularity`]):
//!
//! - **Bit plane** (GPIO path). For every byte index and every bit position, MSB
//!   first, one word whose bit `L` is that bit of lane `L`. Words are stored
//!   little-endian in `ceil(N / 8)` bytes, so up to 8 lanes use one byte per word.
//! - **Quad** (quad-SPI). Four lanes, two bits each per output byte; four output
//!   bytes per byte index. See [`interleave_quad`].
//! - **Octal** (octal-SPI). Eight lane slots, one bit each per output byte; eight
//!   output bytes per byte index. See [`interleave_octal`].
//!
//! Transposition is a pure function of the lane set and the fill byte, so it can be
//! tested without hardware and the hardware-queue path reproduces the GPIO path's
//! bytes exactly.
//!
//! ```rust
//! use led_lanes::lane::{Lane, LaneSet};
//! use led_lanes::transpose::{Granularity, TransposeBuffer, transpose};
//!
//! let short = [0x80_u8];
//! let long = [0xFF_u8, 0x01];
//! let lane_set = LaneSet::<2>::new()
//!     .with_lane(0, Lane::with_padding(&short, &[0x00]))?
//!     .with_lane(1, Lane::with_padding(&long, &[0x00]))?;
//!
//! let buffer: TransposeBuffer<64> = transpose(&lane_set, Granularity::BitPlane)?;
//! assert_eq!(buffer.word_count(), 16);
//! assert_eq!(buffer.word(0), 0b10); // index 0, bit 7: lane 0 is padding, lane 1 is 0xFF
//! assert_eq!(buffer.word(8), 0b01); // index 1, bit 7: lane 0 is 0x80, lane 1 is 0x01
//! assert_eq!(buffer.word(15), 0b10); // index 1, bit 0
//! # Ok::<(), led_lanes::Error>(())
//! ```

use heapless::Vec;

use crate::lane::LaneSet;
use crate::latch::{LaneLatchSynchronizer, LatchPlan};
use crate::{Error, Result};

/// Most lanes a bit-plane word can carry (one bit of a `u32` line mask each).
pub const BIT_PLANE_MAX_LANES: usize = 32;

/// How lanes are interleaved into the output buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Granularity {
    /// One bit per lane per word, one word per bit position (GPIO bit-banging).
    BitPlane,
    /// Two bits per lane, four lanes per output byte (quad-SPI).
    Quad,
    /// One bit per lane, eight lane slots per output byte (octal-SPI).
    Octal,
}

impl Granularity {
    /// Most lanes this packing can carry.
    #[must_use]
    pub const fn max_lanes(self) -> usize {
        match self {
            Self::BitPlane => BIT_PLANE_MAX_LANES,
            Self::Quad => 4,
            Self::Octal => 8,
        }
    }

    /// Lane slots packed per byte index for a lane set of `lanes` slots.
    ///
    /// Quad and octal always pack their full slot count; unused slots take the fill byte.
    #[must_use]
    pub const fn slots(self, lanes: usize) -> usize {
        match self {
            Self::BitPlane => lanes,
            Self::Quad => 4,
            Self::Octal => 8,
        }
    }

    /// Output bytes produced per lane byte index.
    #[must_use]
    pub const fn bytes_per_index(self, lanes: usize) -> usize {
        match self {
            Self::BitPlane => 8 * word_bytes(lanes),
            Self::Quad => 4,
            Self::Octal => 8,
        }
    }
}

/// Bytes per bit-plane word for `lanes` lanes.
#[must_use]
pub const fn word_bytes(lanes: usize) -> usize {
    if lanes <= 8 { 1 } else { lanes.div_ceil(8) }
}

/// Merge one byte from each of four lanes into four quad-SPI bytes.
///
/// Output byte `k` holds, from bit 7 downward in pairs, bits `(7 - 2k, 6 - 2k)` of
/// lanes 0, 1, 2, 3.
///
/// ```rust
/// use led_lanes::transpose::{deinterleave_quad, interleave_quad};
///
/// let packed = interleave_quad([0xCD, 0x34, 0x00, 0x78]);
/// assert_eq!(deinterleave_quad(packed), [0xCD, 0x34, 0x00, 0x78]);
/// ```
#[must_use]
pub const fn interleave_quad(lanes: [u8; 4]) -> [u8; 4] {
    let mut out = [0u8; 4];
    let mut k = 0;
    while k < 4 {
        let shift = 6 - 2 * k;
        let mut byte = 0u8;
        let mut lane = 0;
        while lane < 4 {
            let pair = (lanes[lane] >> shift) & 0b11;
            byte |= pair << (6 - 2 * lane);
            lane += 1;
        }
        out[k] = byte;
        k += 1;
    }
    out
}

/// Inverse of [`interleave_quad`].
#[must_use]
pub const fn deinterleave_quad(packed: [u8; 4]) -> [u8; 4] {
    let mut lanes = [0u8; 4];
    let mut lane = 0;
    while lane < 4 {
        let mut byte = 0u8;
        let mut k = 0;
        while k < 4 {
            let pair = (packed[k] >> (6 - 2 * lane)) & 0b11;
            byte |= pair << (6 - 2 * k);
            k += 1;
        }
        lanes[lane] = byte;
        lane += 1;
    }
    lanes
}

/// Merge one byte from each of eight lanes into eight octal-SPI bytes.
///
/// Output byte `k` carries bit `7 - k` of every lane, lane `L` in bit `L`.
#[must_use]
pub const fn interleave_octal(lanes: [u8; 8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    let mut k = 0;
    while k < 8 {
        let bit = 7 - k;
        let mut byte = 0u8;
        let mut lane = 0;
        while lane < 8 {
            byte |= ((lanes[lane] >> bit) & 1) << lane;
            lane += 1;
        }
        out[k] = byte;
        k += 1;
    }
    out
}

/// Inverse of [`interleave_octal`].
#[must_use]
pub const fn deinterleave_octal(packed: [u8; 8]) -> [u8; 8] {
    let mut lanes = [0u8; 8];
    let mut lane = 0;
    while lane < 8 {
        let mut byte = 0u8;
        let mut k = 0;
        while k < 8 {
            byte |= ((packed[k] >> lane) & 1) << (7 - k);
            k += 1;
        }
        lanes[lane] = byte;
        lane += 1;
    }
    lanes
}

/// Interleaved output of a [`PlaneTransposer`], reused across frames.
///
/// `CAP` is the byte capacity. Size it once for the largest frame:
/// `max_length * granularity.bytes_per_index(lanes)`.
#[derive(Clone, Debug)]
pub struct TransposeBuffer<const CAP: usize> {
    bytes: Vec<u8, CAP>,
    granularity: Granularity,
    lanes: usize,
    max_length: usize,
}

impl<const CAP: usize> TransposeBuffer<CAP> {
    /// Create an empty bit-plane buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            granularity: Granularity::BitPlane,
            lanes: 0,
            max_length: 0,
        }
    }

    /// The interleaved bytes, ready for a hardware queue.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Packing of the current contents.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Lane slots in the lane set that produced the contents.
    #[must_use]
    pub const fn lane_count(&self) -> usize {
        self.lanes
    }

    /// Lane byte positions in the contents.
    #[must_use]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    /// Interleaved length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte capacity (`CAP`).
    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Drop the contents, keeping the storage.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.max_length = 0;
    }

    /// Line mask covering every participating lane slot.
    #[must_use]
    pub const fn lane_mask(&self) -> u32 {
        let slots = self.granularity.slots(self.lanes);
        if slots >= BIT_PLANE_MAX_LANES {
            u32::MAX
        } else {
            (1u32 << slots) - 1
        }
    }

    /// Number of per-bit words (plane packings) or bytes (quad) in the contents.
    #[must_use]
    pub fn word_count(&self) -> usize {
        match self.granularity {
            Granularity::BitPlane | Granularity::Octal => self.max_length * 8,
            Granularity::Quad => self.bytes.len(),
        }
    }

    /// Word `index` of a plane packing, one bit per lane. Out-of-range reads return 0.
    #[must_use]
    pub fn word(&self, index: usize) -> u32 {
        let width = match self.granularity {
            Granularity::BitPlane => word_bytes(self.lanes),
            Granularity::Octal | Granularity::Quad => 1,
        };
        index
            .checked_mul(width)
            .and_then(|start| self.bytes.get(start..start.checked_add(width)?))
            .map_or(0, |chunk| {
                chunk
                    .iter()
                    .rev()
                    .fold(0u32, |word, &byte| (word << 8) | u32::from(byte))
            })
    }

    /// Recover lane `lane`'s byte at position `index` from the interleaved contents.
    #[must_use]
    pub fn lane_byte(&self, lane: usize, index: usize) -> u8 {
        if lane >= self.granularity.slots(self.lanes) || index >= self.max_length {
            return 0;
        }
        match self.granularity {
            Granularity::BitPlane | Granularity::Octal => {
                (0..8).fold(0u8, |byte, bit_index| {
                    let bit = u8::from((self.word(index * 8 + bit_index) >> lane) & 1 == 1);
                    byte | (bit << (7 - bit_index))
                })
            }
            Granularity::Quad => {
                let start = index * 4;
                let mut packed = [0u8; 4];
                if let Some(chunk) = self.bytes.get(start..start + 4) {
                    packed.copy_from_slice(chunk);
                }
                deinterleave_quad(packed).get(lane).copied().unwrap_or(0)
            }
        }
    }

    /// All bytes of lane `lane`, de-interleaved, in output order.
    pub fn extract_lane(&self, lane: usize) -> impl Iterator<Item = u8> + '_ {
        (0..self.max_length).map(move |index| self.lane_byte(lane, index))
    }
}

impl<const CAP: usize> Default for TransposeBuffer<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateless interleaver for a chosen [`Granularity`] and fill byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlaneTransposer {
    granularity: Granularity,
    fill: Option<u8>,
}

impl PlaneTransposer {
    /// Create a transposer whose unused quad/octal slots take the first present
    /// lane's padding byte.
    #[must_use]
    pub const fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            fill: None,
        }
    }

    /// Use `fill` for unused quad/octal lane slots.
    #[must_use]
    pub const fn with_fill(self, fill: u8) -> Self {
        Self {
            granularity: self.granularity,
            fill: Some(fill),
        }
    }

    /// Packing this transposer produces.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Bytes needed to transpose `lanes`.
    #[must_use]
    pub fn required_len<const N: usize>(&self, lanes: &LaneSet<'_, N>) -> usize {
        lanes.max_length() * self.granularity.bytes_per_index(N)
    }

    /// Transpose `lanes` into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`transpose_plan_into`](Self::transpose_plan_into).
    pub fn transpose<const N: usize, const CAP: usize>(
        &self,
        lanes: &LaneSet<'_, N>,
    ) -> Result<TransposeBuffer<CAP>> {
        let mut buffer = TransposeBuffer::new();
        self.transpose_into(lanes, &mut buffer)?;
        Ok(buffer)
    }

    /// Transpose `lanes` into `buffer`, replacing its contents.
    ///
    /// # Errors
    ///
    /// See [`transpose_plan_into`](Self::transpose_plan_into).
    pub fn transpose_into<const N: usize, const CAP: usize>(
        &self,
        lanes: &LaneSet<'_, N>,
        buffer: &mut TransposeBuffer<CAP>,
    ) -> Result<()> {
        let plan = LaneLatchSynchronizer::compute(lanes);
        self.transpose_plan_into(&plan, buffer)
    }

    /// Transpose an already computed latch plan into `buffer`, replacing its contents.
    ///
    /// An all-empty lane set leaves `buffer` empty and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoLanes`] for a zero-slot lane set, [`Error::TooManyLanes`]
    /// when the packing cannot carry `N` lanes, and [`Error::BufferTooSmall`] when
    /// the frame does not fit in `CAP` bytes. `buffer` is left empty on error.
    pub fn transpose_plan_into<const N: usize, const CAP: usize>(
        &self,
        plan: &LatchPlan<'_, '_, N>,
        buffer: &mut TransposeBuffer<CAP>,
    ) -> Result<()> {
        buffer.clear();
        if N == 0 {
            return Err(Error::NoLanes);
        }
        let max = self.granularity.max_lanes();
        if N > max {
            return Err(Error::TooManyLanes {
                granularity: self.granularity,
                lanes: N,
                max,
            });
        }
        let needed = plan.max_length() * self.granularity.bytes_per_index(N);
        if needed > CAP {
            return Err(Error::BufferTooSmall {
                needed,
                capacity: CAP,
            });
        }

        buffer.granularity = self.granularity;
        buffer.lanes = N;
        let fill = self.fill.unwrap_or_else(|| plan.lanes().default_fill());
        let pushed = match self.granularity {
            Granularity::BitPlane => push_bit_planes(plan, &mut buffer.bytes),
            Granularity::Quad => push_quad(plan, fill, &mut buffer.bytes),
            Granularity::Octal => push_octal(plan, fill, &mut buffer.bytes),
        };
        if pushed.is_err() {
            buffer.clear();
            return Err(Error::BufferTooSmall {
                needed,
                capacity: CAP,
            });
        }
        buffer.max_length = plan.max_length();
        Ok(())
    }
}

/// Transpose `lanes` at `granularity` with the default fill byte.
///
/// # Errors
///
/// See [`PlaneTransposer::transpose_plan_into`].
pub fn transpose<const N: usize, const CAP: usize>(
    lanes: &LaneSet<'_, N>,
    granularity: Granularity,
) -> Result<TransposeBuffer<CAP>> {
    PlaneTransposer::new(granularity).transpose(lanes)
}

fn push_bit_planes<const N: usize, const CAP: usize>(
    plan: &LatchPlan<'_, '_, N>,
    bytes: &mut Vec<u8, CAP>,
) -> core::result::Result<(), ()> {
    let width = word_bytes(N);
    let mut lane_bytes = [0u8; BIT_PLANE_MAX_LANES];
    for index in 0..plan.max_length() {
        for (lane, slot) in lane_bytes.iter_mut().take(N).enumerate() {
            *slot = plan.byte_at(lane, index);
        }
        for bit in (0..8u32).rev() {
            let word = lane_bytes
                .iter()
                .take(N)
                .enumerate()
                .fold(0u32, |word, (lane, byte)| {
                    word | (u32::from((byte >> bit) & 1) << lane)
                });
            let le = word.to_le_bytes();
            bytes.extend_from_slice(le.get(..width).unwrap_or(&le))?;
        }
    }
    Ok(())
}

// Absent lanes, whether past `N` or empty slots inside it, carry the fill byte.
fn slot_byte<const N: usize>(
    plan: &LatchPlan<'_, '_, N>,
    fill: u8,
    lane: usize,
    index: usize,
) -> u8 {
    if plan.lanes().lane(lane).is_some() {
        plan.byte_at(lane, index)
    } else {
        fill
    }
}

fn push_quad<const N: usize, const CAP: usize>(
    plan: &LatchPlan<'_, '_, N>,
    fill: u8,
    bytes: &mut Vec<u8, CAP>,
) -> core::result::Result<(), ()> {
    for index in 0..plan.max_length() {
        let lanes: [u8; 4] =
            core::array::from_fn(|lane| slot_byte(plan, fill, lane, index));
        bytes.extend_from_slice(&interleave_quad(lanes))?;
    }
    Ok(())
}

fn push_octal<const N: usize, const CAP: usize>(
    plan: &LatchPlan<'_, '_, N>,
    fill: u8,
    bytes: &mut Vec<u8, CAP>,
) -> core::result::Result<(), ()> {
    for index in 0..plan.max_length() {
        let lanes: [u8; 8] =
            core::array::from_fn(|lane| slot_byte(plan, fill, lane, index));
        bytes.extend_from_slice(&interleave_octal(lanes))?;
    }
    Ok(())
}
