//! Lanes (one per physical strip) and the fixed-size [`LaneSet`] registry.

use crate::padding::Protocol;
use crate::{Error, Result};

/// One physical output channel's payload plus its padding pattern.
///
/// The payload is already color-scaled and in wire order; the engine only reads it
/// for the duration of one transmission.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lane<'a> {
    payload: &'a [u8],
    padding: &'a [u8],
}

impl<'a> Lane<'a> {
    /// Create a lane whose padding comes from the protocol's catalog entry.
    #[must_use]
    pub const fn new(payload: &'a [u8], protocol: Protocol) -> Self {
        Self {
            payload,
            padding: protocol.padding(),
        }
    }

    /// Create a lane with an explicit padding pattern.
    ///
    /// An empty pattern pads with zero bytes.
    #[must_use]
    pub const fn with_padding(payload: &'a [u8], padding: &'a [u8]) -> Self {
        Self { payload, padding }
    }

    /// Pixel bytes for this lane.
    #[must_use]
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Repeating off-pixel pattern for this lane.
    #[must_use]
    pub const fn padding(&self) -> &'a [u8] {
        self.padding
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Registry of up to `N` lanes for one transmission.
///
/// Slot `L` drives output line `L`. An empty slot is valid and behaves as a
/// zero-length lane padded with zeros.
///
/// ```rust
/// use led_lanes::lane::{Lane, LaneSet};
/// use led_lanes::padding::Protocol;
///
/// let porch = [0x10_u8; 9];
/// let eaves = [0x20_u8; 30];
/// let lane_set = LaneSet::<4>::new()
///     .with_lane(0, Lane::new(&porch, Protocol::Ws2812))?
///     .with_lane(2, Lane::new(&eaves, Protocol::Ws2812))?;
///
/// assert_eq!(lane_set.max_length(), 30);
/// assert_eq!(lane_set.present_count(), 2);
/// # Ok::<(), led_lanes::Error>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LaneSet<'a, const N: usize> {
    lanes: [Option<Lane<'a>>; N],
}

impl<'a, const N: usize> LaneSet<'a, N> {
    /// Number of lane slots.
    pub const LANES: usize = N;

    /// Create a lane set with every slot empty.
    #[must_use]
    pub const fn new() -> Self {
        Self { lanes: [None; N] }
    }

    /// Create a lane set from a full slot array.
    #[must_use]
    pub const fn from_lanes(lanes: [Option<Lane<'a>>; N]) -> Self {
        Self { lanes }
    }

    /// Place `lane` in slot `index`, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LaneIndexOutOfRange`] if `index >= N`.
    pub fn set(&mut self, index: usize, lane: Lane<'a>) -> Result<()> {
        let slot = self
            .lanes
            .get_mut(index)
            .ok_or(Error::LaneIndexOutOfRange { index, lanes: N })?;
        *slot = Some(lane);
        Ok(())
    }

    /// Builder form of [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LaneIndexOutOfRange`] if `index >= N`.
    pub fn with_lane(mut self, index: usize, lane: Lane<'a>) -> Result<Self> {
        self.set(index, lane)?;
        Ok(self)
    }

    /// Empty slot `index`, returning the lane that was there.
    pub fn clear(&mut self, index: usize) -> Option<Lane<'a>> {
        self.lanes.get_mut(index).and_then(Option::take)
    }

    /// The lane in slot `index`, if present.
    #[must_use]
    pub fn lane(&self, index: usize) -> Option<&Lane<'a>> {
        self.lanes.get(index).and_then(Option::as_ref)
    }

    /// Number of lane slots (`N`).
    #[must_use]
    pub const fn lane_count(&self) -> usize {
        N
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.lanes.iter().flatten().count()
    }

    /// Longest payload across all present lanes; `0` when every slot is empty.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.lanes.iter().flatten().map(Lane::len).max().unwrap_or(0)
    }

    /// Iterate over every slot in line order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Lane<'a>>> + '_ {
        self.lanes.iter().map(Option::as_ref)
    }

    /// First byte of the first present lane's padding, or `0`.
    #[must_use]
    pub fn default_fill(&self) -> u8 {
        self.lanes
            .iter()
            .flatten()
            .find_map(|lane| lane.padding().first().copied())
            .unwrap_or(0)
    }
}

impl<const N: usize> Default for LaneSet<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
