//! Angularly indexed, bit-packed pixel rows.
//!
//! One row per segment, each row a sequence of packed palette indices:
//! pixel `p` lives in word `p / pixels_per_word` at bit offset
//! `(p % pixels_per_word) * color_bits`. The backing array is sized for
//! the worst case (512 segments, 48 LEDs at 6 bits) and only the first
//! `num_segments` rows of the current configuration are meaningful.
//!
//! Foreground writes and interrupt-context decodes of the same row are
//! deliberately unsynchronized: fields are always written as whole
//! palette indices, so a concurrent decode can show a torn frame but
//! never a malformed index. Geometry changes are the exception and must
//! go through [`SegmentBuffer::reconfigure`] with playback disarmed.

use crate::Rgb;
use crate::geometry::{ColorDepth, MAX_LEDS, MAX_ROW_WORDS, MAX_SEGMENTS, SegmentCount};
use crate::palette::Palette;

/// Ring of bit-packed pixel rows addressed by segment index.
pub struct SegmentBuffer {
    words: [[u32; MAX_ROW_WORDS]; MAX_SEGMENTS],
    segments: SegmentCount,
    depth: ColorDepth,
}

impl SegmentBuffer {
    pub const fn new() -> Self {
        Self {
            words: [[0; MAX_ROW_WORDS]; MAX_SEGMENTS],
            segments: SegmentCount::S2,
            depth: ColorDepth::Bits1,
        }
    }

    /// Swap in a new packing geometry.
    ///
    /// Zeroes the entire backing array, not just the newly active rows,
    /// so no stale data from a previous larger or denser configuration
    /// can ever be decoded.
    pub fn reconfigure(&mut self, segments: SegmentCount, depth: ColorDepth) {
        self.words = [[0; MAX_ROW_WORDS]; MAX_SEGMENTS];
        self.segments = segments;
        self.depth = depth;
    }

    pub const fn segments(&self) -> SegmentCount {
        self.segments
    }

    pub const fn depth(&self) -> ColorDepth {
        self.depth
    }

    pub const fn num_segments(&self) -> u16 {
        self.segments.count()
    }

    pub const fn segment_mask(&self) -> u16 {
        self.segments.mask()
    }

    /// Write one packed palette index.
    ///
    /// The segment index wraps; the value is masked to the active depth
    /// so neighboring fields are never disturbed. LEDs beyond the buffer
    /// capacity are ignored.
    pub fn set_pixel(&mut self, segment: u16, led: u16, value: u32) {
        if usize::from(led) >= MAX_LEDS {
            return;
        }
        let segment = segment & self.segments.mask();
        let word = usize::from(led / self.depth.pixels_per_word());
        let shift = (led % self.depth.pixels_per_word()) * u16::from(self.depth.bits());
        let field_mask = self.depth.field_mask() << shift;

        let row = &mut self.words[usize::from(segment)];
        row[word] = (row[word] & !field_mask) | ((value << shift) & field_mask);
    }

    /// Read one packed palette index back.
    pub fn pixel(&self, segment: u16, led: u16) -> u32 {
        if usize::from(led) >= MAX_LEDS {
            return 0;
        }
        let segment = segment & self.segments.mask();
        let word = usize::from(led / self.depth.pixels_per_word());
        let shift = (led % self.depth.pixels_per_word()) * u16::from(self.depth.bits());
        (self.words[usize::from(segment)][word] >> shift) & self.depth.field_mask()
    }

    /// Bulk-copy pre-packed rows, starting at segment 0.
    ///
    /// `rows` is a flat row-major array of `columns` words per row, in
    /// the active packing encoding. Rows beyond the active segment count
    /// and columns beyond the row capacity are ignored.
    pub fn load_rows(&mut self, rows: &[u32], columns: usize) {
        if columns == 0 {
            return;
        }
        let row_count = (rows.len() / columns).min(self.num_segments() as usize);
        let copy_columns = columns.min(MAX_ROW_WORDS);
        for row in 0..row_count {
            let source = &rows[row * columns..];
            self.words[row][..copy_columns].copy_from_slice(&source[..copy_columns]);
        }
    }

    /// Decode one row through the palette into an RGB frame.
    ///
    /// Unpacks one fixed-width field per LED, walking successive words
    /// of the row. Runs in interrupt context on every segment deadline,
    /// so it is a single pass with no bounds arithmetic per pixel beyond
    /// the word rollover.
    pub fn decode_row(&self, segment: u16, palette: &Palette, frame: &mut [Rgb]) {
        let row = &self.words[usize::from(segment & self.segments.mask())];
        let bits = u32::from(self.depth.bits());
        let pixels_per_word = self.depth.pixels_per_word();
        let field_mask = self.depth.field_mask();

        let mut word_index = 0;
        let mut current = row[0];
        let mut unpacked_in_word = 0;
        for led in frame.iter_mut() {
            *led = palette.color((current & field_mask) as usize);
            current >>= bits;
            unpacked_in_word += 1;
            if unpacked_in_word == pixels_per_word {
                word_index += 1;
                current = row.get(word_index).copied().unwrap_or(0);
                unpacked_in_word = 0;
            }
        }
    }
}

impl Default for SegmentBuffer {
    fn default() -> Self {
        Self::new()
    }
}
