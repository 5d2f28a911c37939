//! Index-to-RGB lookup table.

use crate::Rgb;
use crate::geometry::{ColorDepth, MAX_PALETTE};

const BLACK: Rgb = Rgb::new(0, 0, 0);

/// Fixed-capacity palette indexed by packed pixel values.
///
/// A render must never run against a partially loaded palette:
/// [`Palette::load`] replaces the first `2^color_bits` entries in full,
/// never incrementally.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: [Rgb; MAX_PALETTE],
}

impl Palette {
    pub const fn new() -> Self {
        Self {
            colors: [BLACK; MAX_PALETTE],
        }
    }

    /// Replace the palette for the given depth.
    ///
    /// Copies `2^color_bits` entries from `entries`; if the slice is
    /// shorter the remainder is filled with black so every addressable
    /// index stays defined.
    pub fn load(&mut self, entries: &[Rgb], depth: ColorDepth) {
        for (index, slot) in self.colors.iter_mut().take(depth.palette_size()).enumerate() {
            *slot = entries.get(index).copied().unwrap_or(BLACK);
        }
    }

    /// Look up a packed pixel value.
    pub fn color(&self, index: usize) -> Rgb {
        self.colors[index & (MAX_PALETTE - 1)]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
