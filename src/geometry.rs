//! Angular geometry and packing capacities.
//!
//! A revolution is divided into a power-of-two number of segments so that
//! wraparound of a segment index is a single bitwise AND. Pixel rows are
//! bit-packed into 32-bit words, `32 / color_bits` pixels per word.

/// Largest LED strip the fixed buffers are sized for.
pub const MAX_LEDS: usize = 48;

/// Largest supported segment count (`2^9`).
pub const MAX_SEGMENTS: usize = 1 << 9;

/// Widest supported palette index.
pub const MAX_COLOR_BITS: u8 = 6;

/// Palette capacity (`2^MAX_COLOR_BITS` entries).
pub const MAX_PALETTE: usize = 1 << MAX_COLOR_BITS;

/// Packed words per segment row, sized for the densest packing
/// (48 LEDs at 6 bits each, 5 pixels per word).
pub const MAX_ROW_WORDS: usize = MAX_LEDS.div_ceil(32 / MAX_COLOR_BITS as usize);

/// Angular budget for one text arc: each glyph occupies 7 segments and
/// text runs on half the circle.
pub const MAX_TEXT_CHARS: usize = MAX_SEGMENTS / (2 * 7);

/// Number of segments a revolution is divided into.
///
/// Only powers of two in `[2, 512]` are representable, so a segment
/// index is always wrapped with [`SegmentCount::mask`] instead of a
/// division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCount(u8);

impl SegmentCount {
    pub const S2: Self = Self(1);
    pub const S4: Self = Self(2);
    pub const S8: Self = Self(3);
    pub const S16: Self = Self(4);
    pub const S32: Self = Self(5);
    pub const S64: Self = Self(6);
    pub const S128: Self = Self(7);
    pub const S256: Self = Self(8);
    pub const S512: Self = Self(9);

    /// Build from a base-2 logarithm in `[1, 9]`.
    pub const fn from_log2(log2: u8) -> Option<Self> {
        if matches!(log2, 1..=9) {
            Some(Self(log2))
        } else {
            None
        }
    }

    pub const fn log2(self) -> u8 {
        self.0
    }

    pub const fn count(self) -> u16 {
        1 << self.0
    }

    /// Wraparound mask for segment indices.
    pub const fn mask(self) -> u16 {
        self.count() - 1
    }
}

/// Bits of palette index stored per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorDepth {
    Bits1 = 1,
    Bits2 = 2,
    Bits3 = 3,
    Bits4 = 4,
    Bits5 = 5,
    Bits6 = 6,
}

impl ColorDepth {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            1 => Self::Bits1,
            2 => Self::Bits2,
            3 => Self::Bits3,
            4 => Self::Bits4,
            5 => Self::Bits5,
            6 => Self::Bits6,
            _ => return None,
        })
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Number of palette entries addressable at this depth.
    pub const fn palette_size(self) -> usize {
        1 << self.bits()
    }

    /// Whole pixels that fit in one 32-bit word. Odd depths leave the
    /// top bits of each word unused.
    pub const fn pixels_per_word(self) -> u16 {
        32 / self.bits() as u16
    }

    /// Mask selecting one packed palette index.
    pub const fn field_mask(self) -> u32 {
        (1 << self.bits()) - 1
    }
}
