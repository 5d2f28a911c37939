//! The real-time rendering engine.
//!
//! Owns the segment buffer, palette and rotation state, and exposes the
//! four interrupt entry points the hardware glue dispatches to. There is
//! exactly one engine instance per program; interrupt handlers reach it
//! through an [`crate::EngineCell`] while foreground code uses the same
//! handle.
//!
//! No mutual exclusion is used inside the engine. Safety rests on the
//! documented protocol: [`Engine::reconfigure`] disarms the segment and
//! watchdog timers before touching packing geometry, foreground pixel
//! writes tolerate benign tearing against a concurrent decode, and
//! rotation updates go through a pending slot committed only at the TDC
//! boundary.

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::buffer::SegmentBuffer;
use crate::compositor::{self, BitmapSource, TextSpec};
use crate::geometry::{ColorDepth, MAX_LEDS, SegmentCount};
use crate::palette::Palette;
use crate::profile::ProfileId;
use crate::rotation::{LockState, RotationSync, SyncState};
use crate::{Rgb, StripDriver, TdcSensor, TimerChannel};

/// Longest tolerated revolution, in microseconds. Slower than this
/// (600 RPM) and the blade is treated as stopped.
pub const WATCHDOG_WINDOW_US: u32 = 100_000;

/// How long LEDs stay lit after each segment render, bounding the duty
/// cycle independent of revolution speed.
pub const LED_ON_WINDOW_US: u32 = 20;

const BLACK: Rgb = Rgb::new(0, 0, 0);
const FAULT_LOW: Rgb = Rgb::new(255, 0, 0);
const FAULT_HIGH: Rgb = Rgb::new(0, 0, 255);

/// Static configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// LEDs physically present on the blade.
    pub num_leds: u16,
    /// Hardware timer ticks per microsecond (bus clock / 1 MHz).
    pub ticks_per_us: u32,
}

/// Setup rejection. No engine state is committed when construction
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    TooManyLeds { requested: u16, max: u16 },
}

/// Development telemetry counters. Cheap enough to keep in release
/// builds; printing is gated behind the `esp32-log` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    /// Times the RPM watchdog expired.
    pub watchdog_trips: u32,
    /// Revolutions that ended before playback reached the TDC slot.
    pub missed_segments: u32,
    /// Most recent segment timer reload value.
    pub last_segment_reload: u32,
    /// Most recent slot rendered by the segment timer.
    pub last_slot: u16,
}

/// POV rendering engine - the main orchestrator.
pub struct Engine<S, T, D> {
    // External collaborators
    strip: S,
    watchdog: T,
    segment_timer: T,
    led_off_timer: T,
    sensor: D,

    // Configuration
    num_leds: usize,
    watchdog_reload: u32,

    // Internal state
    buffer: SegmentBuffer,
    palette: Palette,
    rotation: RotationSync,
    frame: [Rgb; MAX_LEDS],
    active_profile: Option<ProfileId>,
    diagnostics: Diagnostics,
}

impl<S, T, D> Engine<S, T, D>
where
    S: StripDriver,
    T: TimerChannel,
    D: TdcSensor,
{
    /// Build the engine and apply the initial configuration
    /// (2 segments, 1 color bit, TDC slot 0), arming the watchdog.
    ///
    /// Fails without touching any collaborator if the LED count exceeds
    /// the fixed buffer capacity.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(
        strip: S,
        watchdog: T,
        segment_timer: T,
        led_off_timer: T,
        sensor: D,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        if usize::from(config.num_leds) > MAX_LEDS {
            return Err(ConfigError::TooManyLeds {
                requested: config.num_leds,
                max: MAX_LEDS as u16,
            });
        }

        let mut engine = Self {
            strip,
            watchdog,
            segment_timer,
            led_off_timer,
            sensor,
            num_leds: usize::from(config.num_leds),
            watchdog_reload: config.ticks_per_us * WATCHDOG_WINDOW_US - 1,
            buffer: SegmentBuffer::new(),
            palette: Palette::new(),
            rotation: RotationSync::new(),
            frame: [BLACK; MAX_LEDS],
            active_profile: None,
            diagnostics: Diagnostics::default(),
        };
        engine
            .led_off_timer
            .set_reload(config.ticks_per_us * LED_ON_WINDOW_US - 1);
        engine.all_leds_off();
        engine.reconfigure(SegmentCount::S2, ColorDepth::Bits1, 0);
        Ok(engine)
    }

    /// Swap in a new display geometry.
    ///
    /// Must not race the playback decode loop: both the segment timer
    /// and the watchdog are disarmed before the packing geometry and
    /// rotation state change, and the watchdog is re-armed only once the
    /// buffer is fully consistent. The blade then has to re-stabilize
    /// before anything is displayed.
    pub fn reconfigure(&mut self, segments: SegmentCount, depth: ColorDepth, tdc_slot: u16) {
        self.segment_timer.disable();
        self.watchdog.disable();
        self.all_leds_off();

        self.buffer.reconfigure(segments, depth);
        self.rotation.reset(tdc_slot & segments.mask());

        self.watchdog.set_reload(self.watchdog_reload);
        self.watchdog.enable();
    }

    /// Replace the active palette for the current color depth.
    pub fn load_palette(&mut self, entries: &[Rgb]) {
        self.palette.load(entries, self.buffer.depth());
    }

    /// Copy a packed bitmap into the segment buffer.
    pub fn draw_bitmap(&mut self, bitmap: &BitmapSource) {
        compositor::draw_bitmap(&mut self.buffer, bitmap);
    }

    /// Render a string onto one arc of the display.
    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_text(&mut self, spec: &TextSpec) {
        compositor::draw_text(&mut self.buffer, self.num_leds as u16, spec);
    }

    /// Set a single LED, `value` being an index into the current
    /// palette. Segment 0 is Top Dead Center, LED 0 innermost.
    pub fn set_pixel(&mut self, segment: u16, led: u16, value: u32) {
        self.buffer.set_pixel(segment, led, value);
    }

    /// Stage a TDC display slot shifted by a signed amount. Takes effect
    /// at the next TDC pulse, never mid-revolution.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn shift_tdc_slot(&mut self, delta: i16) {
        let mask = i32::from(self.buffer.segment_mask());
        let next = (i32::from(self.rotation.tdc_slot) + i32::from(delta)) & mask;
        self.rotation.tdc_slot_pending = next as u16;
    }

    /// TDC pulse interrupt entry point, fired once per revolution.
    pub fn on_tdc_pulse(&mut self) {
        match self.rotation.lock {
            LockState::AcquiringLock => {
                // Pulse arrived before the watchdog expired, so this
                // revolution was inside the RPM bounds.
                self.watchdog.disable();
                self.watchdog.enable();
                self.rotation.note_good_revolution();
            }
            LockState::Locked => self.on_locked_pulse(),
        }
    }

    fn on_locked_pulse(&mut self) {
        let remaining = self.watchdog.count();
        self.watchdog.disable();
        self.watchdog.enable();
        self.rotation.last_period_ticks = self.watchdog_reload - remaining;

        // The segment timer disarms itself once playback wraps to the
        // TDC slot; still being short of it means timer rounding lost a
        // segment this revolution.
        if self.rotation.current_slot != self.rotation.tdc_slot {
            self.diagnostics.missed_segments += 1;
        }

        self.segment_timer.disable();
        let interval = self.rotation.last_period_ticks >> self.buffer.segments().log2();
        self.segment_timer.set_reload(interval);
        self.segment_timer.enable();
        self.diagnostics.last_segment_reload = interval;

        // The TDC-aligned slot is rendered here, synchronized to the
        // sensor itself rather than to accumulated timer drift. The
        // timer handles the remaining N-1 slots.
        self.rotation.commit_tdc();
        self.render_current_slot();
        self.rotation.advance_slot(self.buffer.segment_mask());
    }

    /// Segment-interval timer interrupt entry point, fired up to N-1
    /// times per revolution.
    pub fn on_segment_timer(&mut self) {
        self.diagnostics.last_slot = self.rotation.current_slot;
        self.render_current_slot();
        self.rotation.advance_slot(self.buffer.segment_mask());
        if self.rotation.current_slot == self.rotation.tdc_slot {
            // That slot belongs to the TDC pulse; wait to be re-armed.
            self.segment_timer.disable();
        }
    }

    /// RPM watchdog interrupt entry point: no TDC pulse arrived within
    /// the window, the blade is stopped or too slow. Recovers
    /// automatically once pulses resume.
    pub fn on_watchdog_timeout(&mut self) {
        self.segment_timer.disable();
        self.rotation.drop_lock();
        self.diagnostics.watchdog_trips += 1;

        #[cfg(feature = "esp32-log")]
        println!("rpm watchdog tripped ({} total)", self.diagnostics.watchdog_trips);

        // Blank the blade, with the outermost LED showing where the
        // sensor is stuck.
        self.frame[..self.num_leds].fill(BLACK);
        if let Some(outermost) = self.frame[..self.num_leds].last_mut() {
            *outermost = if self.sensor.level() { FAULT_HIGH } else { FAULT_LOW };
        }
        self.strip.write(&self.frame[..self.num_leds]);
    }

    /// LED-off one-shot interrupt entry point.
    pub fn on_led_off_timer(&mut self) {
        self.led_off_timer.disable();
        self.all_leds_off();
    }

    /// Whether the engine is locked to the rotation and displaying.
    pub fn is_synchronized(&self) -> bool {
        self.rotation.lock == LockState::Locked
    }

    pub fn sync_state(&self) -> SyncState {
        self.rotation.sync_state()
    }

    /// Duration of the last full revolution in hardware-timer ticks,
    /// for RPM computation by the caller.
    pub fn last_revolution_ticks(&self) -> u32 {
        self.rotation.last_period_ticks
    }

    pub fn num_segments(&self) -> u16 {
        self.buffer.num_segments()
    }

    pub fn num_leds(&self) -> usize {
        self.num_leds
    }

    /// Segment displayed at the TDC pulse.
    pub fn tdc_slot(&self) -> u16 {
        self.rotation.tdc_slot
    }

    /// Staged TDC slot, applied at the next pulse.
    pub fn pending_tdc_slot(&self) -> u16 {
        self.rotation.tdc_slot_pending
    }

    /// Read access to the composed rows, mainly for host-side preview
    /// and tests.
    pub fn segment_buffer(&self) -> &SegmentBuffer {
        &self.buffer
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Profile currently owning the buffer and palette, by ID.
    pub fn active_profile(&self) -> Option<ProfileId> {
        self.active_profile
    }

    pub(crate) fn set_active_profile(&mut self, id: ProfileId) {
        self.active_profile = Some(id);
    }

    fn render_current_slot(&mut self) {
        let slot = self.rotation.current_slot;
        self.buffer
            .decode_row(slot, &self.palette, &mut self.frame[..self.num_leds]);
        self.strip.write(&self.frame[..self.num_leds]);
        self.led_off_timer.enable();
    }

    fn all_leds_off(&mut self) {
        self.frame[..self.num_leds].fill(BLACK);
        self.strip.write(&self.frame[..self.num_leds]);
    }
}
