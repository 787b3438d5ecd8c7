//! Latch synchronization: a shared output length and per-lane byte resolution so
//! every strip receives its last real byte at the same output index.
//!
//! Each lane of length `len` is front-padded by `max_length - len` bytes. The padding
//! pattern is aligned to the *end* of the padding run, so the pattern's last byte is
//! always the one emitted just before the lane's first real byte.
//!
//! ```text
//!   index:     0     1     2     3     4     5
//!   lane 0:   P0    P1    P2   [a0]  [a1]  [a2]     pattern P0 P1 P2, payload a0..a2
//!   lane 1:  [b0]  [b1]  [b2]  [b3]  [b4]  [b5]
//!   lane 2:   P1    P2    P0    P1    P2   [c0]
//! ```

use crate::lane::{Lane, LaneSet};

/// Computes [`LatchPlan`]s for lane sets.
pub struct LaneLatchSynchronizer;

impl LaneLatchSynchronizer {
    /// Determine the shared output length for `lanes` and return a resolver for it.
    ///
    /// An all-empty lane set yields a plan with `max_length == 0`.
    #[must_use]
    pub fn compute<'s, 'a, const N: usize>(lanes: &'s LaneSet<'a, N>) -> LatchPlan<'s, 'a, N> {
        LatchPlan {
            lanes,
            max_length: lanes.max_length(),
        }
    }
}

/// Shared output length plus per-lane byte resolution for one transmission.
#[derive(Clone, Copy, Debug)]
pub struct LatchPlan<'s, 'a, const N: usize> {
    lanes: &'s LaneSet<'a, N>,
    max_length: usize,
}

impl<'a, const N: usize> LatchPlan<'_, 'a, N> {
    /// Number of output byte positions every lane is stretched to.
    #[must_use]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    /// Whether there is nothing to send.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max_length == 0
    }

    /// Number of lane slots.
    #[must_use]
    pub const fn lane_count(&self) -> usize {
        N
    }

    /// The lane set this plan resolves.
    #[must_use]
    pub const fn lanes(&self) -> &LaneSet<'a, N> {
        self.lanes
    }

    /// Padding bytes prepended to lane `lane` (`max_length` for an empty slot).
    #[must_use]
    pub fn padding_len(&self, lane: usize) -> usize {
        self.max_length - self.lanes.lane(lane).map_or(0, Lane::len)
    }

    /// Byte that lane `lane` carries at output position `index`.
    ///
    /// Empty slots, slots past `N`, and positions past `max_length` resolve to zero.
    #[must_use]
    pub fn byte_at(&self, lane: usize, index: usize) -> u8 {
        if index >= self.max_length {
            return 0;
        }
        let Some(lane) = self.lanes.lane(lane) else {
            return 0;
        };
        let offset = self.max_length - lane.len();
        if index >= offset {
            return lane.payload().get(index - offset).copied().unwrap_or(0);
        }
        padding_byte(lane.padding(), offset - index)
    }

    /// All `max_length` resolved bytes of lane `lane`, in output order.
    pub fn lane_bytes(&self, lane: usize) -> impl Iterator<Item = u8> + '_ {
        (0..self.max_length).map(move |index| self.byte_at(lane, index))
    }
}

// `distance` counts back from the first payload byte: 1 is the byte just before it.
fn padding_byte(padding: &[u8], distance: usize) -> u8 {
    if padding.is_empty() {
        return 0;
    }
    let back = distance % padding.len();
    let position = (padding.len() - back) % padding.len();
    padding.get(position).copied().unwrap_or(0)
}
