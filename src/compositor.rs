//! Pixel, bitmap and text compositing into the segment buffer.
//!
//! All drawing here runs in foreground code. Loads are always aligned to
//! segment 0; rotating the displayed image is done purely through the
//! TDC display slot, never by shifting the stored rows.

use heapless::Vec;

use crate::Rgb;
use crate::buffer::SegmentBuffer;
use crate::font::{self, GLYPH_ROWS, Glyph};
use crate::geometry::{ColorDepth, MAX_TEXT_CHARS, SegmentCount};

/// Segments occupied by one character: leading blank, five glyph
/// columns, trailing blank.
const SEGMENTS_PER_CHAR: i32 = 7;

/// Which arc of the circle a string is drawn on, assuming segment 0 is
/// "up" and segment indices increase clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPosition {
    Top,
    Bottom,
}

/// One text draw request.
#[derive(Debug, Clone, Copy)]
pub struct TextSpec<'a> {
    pub text: &'a str,
    pub position: TextPosition,
    /// Outermost LED row of the glyph band; the glyph occupies rows
    /// `top_row - 6 ..= top_row`.
    pub top_row: u8,
    /// Palette index for lit glyph pixels.
    pub color: u8,
    /// Palette index for the background of the band.
    pub background: u8,
    /// Draw the string 180-degrees rotated so bottom-arc text reads
    /// correctly when that arc is visually upside-down.
    pub invert: bool,
}

/// A pre-packed bitmap image plus the geometry and palette it was
/// packed for.
#[derive(Debug, Clone, Copy)]
pub struct BitmapSource<'a> {
    /// Row-major packed words, `columns` per row, in the encoding of
    /// the segment buffer at `depth`.
    pub rows: &'a [u32],
    pub columns: usize,
    pub segments: SegmentCount,
    pub depth: ColorDepth,
    /// Segment shown when the blade passes Top Dead Center.
    pub tdc_slot: u16,
    /// Palette the packed indices refer to, `2^color_bits` entries.
    pub palette: &'a [Rgb],
}

/// Copy bitmap rows into the buffer, starting at segment 0.
///
/// Rows beyond the active segment count are ignored; rows a previous
/// larger configuration wrote are not visible because reconfiguration
/// clears the whole buffer.
pub fn draw_bitmap(buffer: &mut SegmentBuffer, bitmap: &BitmapSource) {
    buffer.load_rows(bitmap.rows, bitmap.columns);
}

/// Render a string onto one arc of the circle.
///
/// The string is truncated to the angular budget (`num_segments / 14`
/// characters) and horizontally centered on its arc. Out-of-range
/// anchor rows make the whole draw a no-op; a partial glyph band is
/// never written.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn draw_text(buffer: &mut SegmentBuffer, num_leds: u16, spec: &TextSpec) {
    let top_row = u16::from(spec.top_row);
    if top_row >= num_leds || top_row < (GLYPH_ROWS as u16 - 1) {
        return;
    }

    let n = i32::from(buffer.num_segments());
    let budget = (n / (2 * SEGMENTS_PER_CHAR)) as usize;
    let mut chars: Vec<u8, MAX_TEXT_CHARS> = Vec::new();
    for byte in spec.text.bytes().take(budget) {
        if chars.push(byte).is_err() {
            break;
        }
    }

    let len = chars.len() as i32;
    let mut virtual_segment = match spec.position {
        TextPosition::Top => 3 * n / 4 + 1,
        TextPosition::Bottom => n / 4 + 1,
    };
    virtual_segment += (n / 2 - len * SEGMENTS_PER_CHAR) / 2;

    // Bottom-arc inverted text is laid out right-to-left with each
    // glyph rotated, so it reads left-to-right for the viewer.
    let rotated = spec.invert && spec.position == TextPosition::Bottom;
    if rotated {
        chars.reverse();
    }

    for &byte in &chars {
        let glyph = if rotated {
            font::mirrored(font::glyph(byte))
        } else {
            font::glyph(byte)
        };
        virtual_segment = draw_char(buffer, virtual_segment, top_row, &glyph, spec);
    }
}

fn draw_char(
    buffer: &mut SegmentBuffer,
    mut virtual_segment: i32,
    top_row: u16,
    glyph: &Glyph,
    spec: &TextSpec,
) -> i32 {
    blank_column(buffer, virtual_segment, top_row, spec.background);
    virtual_segment += 1;

    for &column in glyph {
        let segment = wrap(buffer, virtual_segment);
        for row in 0..GLYPH_ROWS as u16 {
            let lit = column & (1 << row) != 0;
            let index = if lit { spec.color } else { spec.background };
            buffer.set_pixel(segment, top_row - row, u32::from(index));
        }
        virtual_segment += 1;
    }

    blank_column(buffer, virtual_segment, top_row, spec.background);
    virtual_segment + 1
}

fn blank_column(buffer: &mut SegmentBuffer, virtual_segment: i32, top_row: u16, background: u8) {
    let segment = wrap(buffer, virtual_segment);
    for row in 0..GLYPH_ROWS as u16 {
        buffer.set_pixel(segment, top_row - row, u32::from(background));
    }
}

/// Virtual-to-physical segment mapping: a single mask, which is why
/// segment counts must be powers of two.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wrap(buffer: &SegmentBuffer, virtual_segment: i32) -> u16 {
    (virtual_segment & i32::from(buffer.segment_mask())) as u16
}
