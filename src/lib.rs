#![no_std]

pub mod buffer;
pub mod cell;
pub mod compositor;
pub mod engine;
pub mod font;
pub mod geometry;
pub mod palette;
pub mod profile;
pub mod rotation;

pub use buffer::SegmentBuffer;
pub use cell::EngineCell;
pub use compositor::{BitmapSource, TextPosition, TextSpec};
pub use engine::{ConfigError, Diagnostics, Engine, EngineConfig};
pub use geometry::{ColorDepth, MAX_LEDS, MAX_SEGMENTS, SegmentCount};
pub use palette::Palette;
pub use profile::{DisplayProfile, ProfileCallback, ProfileId};
pub use rotation::SyncState;

pub use embassy_time::{Duration, Instant};
use smart_leds::RGB8;

/// RGB color of a single LED.
pub type Rgb = RGB8;

/// Abstract LED strip driver trait
///
/// Implement this trait to support different hardware platforms.
/// The engine is generic over this trait. A call latches the given
/// colors and transmits them immediately; it must complete well within
/// the LED-on window so the next segment deadline is not missed.
pub trait StripDriver {
    /// Write colors to the LED strip
    fn write(&mut self, colors: &[Rgb]);
}

/// One logical channel of a down-counting hardware timer.
///
/// The engine uses three channels: the RPM watchdog, the segment-interval
/// timer and the short LED-off one-shot. Enabling a channel clears any
/// pending interrupt flag and restarts the count from the reload value.
pub trait TimerChannel {
    /// Set the value the counter restarts from.
    fn set_reload(&mut self, ticks: u32);

    /// Clear any pending interrupt flag and restart counting from the
    /// reload value.
    fn enable(&mut self);

    /// Stop the counter and suppress its interrupt.
    fn disable(&mut self);

    /// Read the current down-count.
    fn count(&self) -> u32;
}

/// Rotation sensor input.
///
/// Only the instantaneous logic level is needed, and only to pick the
/// fault indicator color when the watchdog trips. The per-revolution
/// pulse itself arrives through [`Engine::on_tdc_pulse`].
pub trait TdcSensor {
    /// Current logic level of the sensor pin.
    fn level(&self) -> bool;
}
