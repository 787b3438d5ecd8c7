//! Off-pixel byte patterns used to pad short lanes, keyed by LED protocol.
//!
//! A short lane is front-filled with its protocol's padding pattern so every lane
//! reaches its last real byte at the same output index. See
//! [`LaneLatchSynchronizer`](crate::latch::LaneLatchSynchronizer).

use crate::timing::ChipsetTiming;

/// LED chipset family, used to look up padding and timing.
///
/// Clockless chipsets encode bits as pulse widths on a single data line and are
/// driven by the [`CycleTimedEmitter`](crate::emitter::CycleTimedEmitter) or a
/// hardware queue. Clocked chipsets (data + clock) only contribute their padding
/// pattern here.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// WS2812/WS2812B, 3 bytes per pixel (GRB).
    Ws2812,
    /// WS2811 at 800 kHz, 3 bytes per pixel.
    Ws2811,
    /// WS2813, 3 bytes per pixel, longer reset.
    Ws2813,
    /// SK6812 RGBW, 4 bytes per pixel.
    Sk6812Rgbw,
    /// TM1814 RGBW, 4 bytes per pixel.
    Tm1814,
    /// TM1809, 3 bytes per pixel.
    Tm1809,
    /// UCS1903 at 400 kHz, 3 bytes per pixel.
    Ucs1903,
    /// APA106, 3 bytes per pixel.
    Apa106,
    /// APA102 (clocked), 4-byte LED frames with a brightness header.
    Apa102,
    /// SK9822 (clocked), APA102-compatible framing.
    Sk9822,
    /// LPD8806 (clocked), 7-bit color with the high bit always set.
    Lpd8806,
    /// WS2801 (clocked), plain 3-byte pixels.
    Ws2801,
    /// P9813 (clocked), flag byte followed by BGR.
    P9813,
}

impl Protocol {
    /// Off-pixel padding pattern for this protocol.
    #[must_use]
    pub const fn padding(self) -> &'static [u8] {
        PaddingCatalog::padding(self)
    }

    /// Bytes one pixel occupies on the wire.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Ws2812
            | Self::Ws2811
            | Self::Ws2813
            | Self::Tm1809
            | Self::Ucs1903
            | Self::Apa106
            | Self::Lpd8806
            | Self::Ws2801 => 3,
            Self::Sk6812Rgbw | Self::Tm1814 | Self::Apa102 | Self::Sk9822 | Self::P9813 => 4,
        }
    }

    /// Pulse-width timing, or `None` for clocked protocols.
    #[must_use]
    pub const fn timing(self) -> Option<ChipsetTiming> {
        match self {
            Self::Ws2812 => Some(ChipsetTiming::WS2812),
            Self::Ws2811 => Some(ChipsetTiming::WS2811),
            Self::Ws2813 => Some(ChipsetTiming::WS2813),
            Self::Sk6812Rgbw => Some(ChipsetTiming::SK6812),
            Self::Tm1814 => Some(ChipsetTiming::TM1814),
            Self::Tm1809 => Some(ChipsetTiming::TM1809),
            Self::Ucs1903 => Some(ChipsetTiming::UCS1903),
            Self::Apa106 => Some(ChipsetTiming::APA106),
            Self::Apa102 | Self::Sk9822 | Self::Lpd8806 | Self::Ws2801 | Self::P9813 => None,
        }
    }

    /// Whether the protocol is pulse-width encoded on a single data line.
    #[must_use]
    pub const fn is_clockless(self) -> bool {
        self.timing().is_some()
    }
}

const BLACK_RGB: [u8; 3] = [0x00, 0x00, 0x00];
const BLACK_RGBW: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
// Brightness header 0b111_00000: global brightness zero.
const BLACK_APA102: [u8; 4] = [0xE0, 0x00, 0x00, 0x00];
const BLACK_LPD8806: [u8; 3] = [0x80, 0x80, 0x80];
// Flag byte 0b11 followed by the inverted (all-ones) checksums of zero color.
const BLACK_P9813: [u8; 4] = [0xFF, 0x00, 0x00, 0x00];

/// Table of off-pixel byte patterns per protocol family.
///
/// ```rust
/// use led_lanes::padding::{PaddingCatalog, Protocol};
///
/// assert_eq!(PaddingCatalog::padding(Protocol::Ws2812), &[0, 0, 0]);
/// assert_eq!(PaddingCatalog::padding(Protocol::Apa102), &[0xE0, 0, 0, 0]);
/// ```
pub struct PaddingCatalog;

impl PaddingCatalog {
    /// Return the repeating pattern that shows a black pixel on `protocol`.
    #[must_use]
    pub const fn padding(protocol: Protocol) -> &'static [u8] {
        match protocol {
            Protocol::Ws2812
            | Protocol::Ws2811
            | Protocol::Ws2813
            | Protocol::Tm1809
            | Protocol::Ucs1903
            | Protocol::Apa106
            | Protocol::Ws2801 => &BLACK_RGB,
            Protocol::Sk6812Rgbw | Protocol::Tm1814 => &BLACK_RGBW,
            Protocol::Apa102 | Protocol::Sk9822 => &BLACK_APA102,
            Protocol::Lpd8806 => &BLACK_LPD8806,
            Protocol::P9813 => &BLACK_P9813,
        }
    }

    /// First byte of the protocol's padding, used as the default fill for unused
    /// packing slots.
    #[must_use]
    pub const fn fill_byte(protocol: Protocol) -> u8 {
        match Self::padding(protocol) {
            [first, ..] => *first,
            [] => 0,
        }
    }
}
