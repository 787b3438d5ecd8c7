//! Turn `RGB8` pixels into wire-order lane payloads.

use smart_leds::RGB8;

use crate::{Error, Result};

/// Order in which a chipset expects the three color bytes.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorOrder {
    /// Red, green, blue.
    Rgb,
    /// Red, blue, green.
    Rbg,
    /// Green, red, blue (WS2812 and most clones).
    #[default]
    Grb,
    /// Green, blue, red.
    Gbr,
    /// Blue, red, green.
    Brg,
    /// Blue, green, red.
    Bgr,
}

impl ColorOrder {
    /// `pixel`'s bytes in wire order.
    ///
    /// ```rust
    /// use led_lanes::pixel::ColorOrder;
    /// use smart_leds::RGB8;
    ///
    /// assert_eq!(ColorOrder::Grb.arrange(RGB8::new(1, 2, 3)), [2, 1, 3]);
    /// ```
    #[must_use]
    pub const fn arrange(self, pixel: RGB8) -> [u8; 3] {
        let RGB8 { r, g, b } = pixel;
        match self {
            Self::Rgb => [r, g, b],
            Self::Rbg => [r, b, g],
            Self::Grb => [g, r, b],
            Self::Gbr => [g, b, r],
            Self::Brg => [b, r, g],
            Self::Bgr => [b, g, r],
        }
    }
}

/// Write `pixels` into `payload` in `order`, three bytes each, and return the number
/// of bytes written.
///
/// # Errors
///
/// Returns [`Error::PayloadTooSmall`] if `payload` is shorter than `3 * pixels.len()`.
/// Nothing is written in that case.
pub fn encode_pixels(pixels: &[RGB8], order: ColorOrder, payload: &mut [u8]) -> Result<usize> {
    let needed = pixels.len() * 3;
    let capacity = payload.len();
    let Some(out) = payload.get_mut(..needed) else {
        return Err(Error::PayloadTooSmall { needed, capacity });
    };
    for (chunk, &pixel) in out.chunks_exact_mut(3).zip(pixels) {
        chunk.copy_from_slice(&order.arrange(pixel));
    }
    Ok(needed)
}
