//! Display profiles: one named "screen" of content.
//!
//! A profile bundles geometry, palette, bitmap and text content with a
//! lifecycle timing block. At most one profile is active at a time
//! program-wide; ownership is tracked by ID rather than by pointer so
//! expiry checks stay robust when profiles are reordered or rebuilt.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time::{Duration, Instant};

use crate::Rgb;
use crate::compositor::{BitmapSource, TextSpec};
use crate::engine::Engine;
use crate::geometry::{ColorDepth, SegmentCount};
use crate::{StripDriver, TdcSensor, TimerChannel};

/// Unique ascending profile identity, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileId(u16);

impl ProfileId {
    pub const fn raw(self) -> u16 {
        self.0
    }
}

fn next_profile_id() -> ProfileId {
    static NEXT: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));
    critical_section::with(|cs| {
        let counter = NEXT.borrow(cs);
        let id = counter.get().wrapping_add(1);
        counter.set(id);
        ProfileId(id)
    })
}

/// Lifecycle hook, invoked with the ID of the profile it fired for.
pub type ProfileCallback = fn(ProfileId);

/// An application-level display: content plus geometry plus timing.
///
/// Content is borrowed, matching how image and font data live in static
/// tables on the target.
pub struct DisplayProfile<'a> {
    id: ProfileId,

    // Geometry and content
    segments: SegmentCount,
    depth: ColorDepth,
    tdc_slot: u16,
    palette: &'a [Rgb],
    bitmap: Option<&'a BitmapSource<'a>>,
    texts: &'a [TextSpec<'a>],

    // Lifecycle timing
    display_duration: Option<Duration>,
    rotation_period: Option<Duration>,
    rotation_increment: i16,
    duration_start: Instant,
    rotation_start: Instant,
    expired: bool,

    on_activate: Option<ProfileCallback>,
    on_update: Option<ProfileCallback>,
    on_expire: Option<ProfileCallback>,
}

impl<'a> DisplayProfile<'a> {
    /// A profile showing a packed bitmap; geometry and palette come
    /// from the bitmap itself.
    pub fn with_bitmap(bitmap: &'a BitmapSource<'a>) -> Self {
        let mut profile = Self::empty();
        profile.segments = bitmap.segments;
        profile.depth = bitmap.depth;
        profile.tdc_slot = bitmap.tdc_slot;
        profile.palette = bitmap.palette;
        profile.bitmap = Some(bitmap);
        profile
    }

    /// A bitmap with text drawn over it.
    pub fn with_bitmap_and_text(bitmap: &'a BitmapSource<'a>, texts: &'a [TextSpec<'a>]) -> Self {
        let mut profile = Self::with_bitmap(bitmap);
        profile.texts = texts;
        profile
    }

    /// Text only; call [`DisplayProfile::set_display`] before
    /// activating to pick geometry and palette.
    pub fn with_text(texts: &'a [TextSpec<'a>]) -> Self {
        let mut profile = Self::empty();
        profile.texts = texts;
        profile
    }

    /// No content; pixels are set directly through
    /// [`Engine::set_pixel`] after activation.
    pub fn empty() -> Self {
        Self {
            id: next_profile_id(),
            segments: SegmentCount::S2,
            depth: ColorDepth::Bits1,
            tdc_slot: 0,
            palette: &[],
            bitmap: None,
            texts: &[],
            display_duration: None,
            rotation_period: None,
            rotation_increment: 0,
            duration_start: Instant::from_millis(0),
            rotation_start: Instant::from_millis(0),
            expired: false,
            on_activate: None,
            on_update: None,
            on_expire: None,
        }
    }

    /// Geometry and palette for profiles that do not carry a bitmap.
    pub fn set_display(
        &mut self,
        segments: SegmentCount,
        depth: ColorDepth,
        tdc_slot: u16,
        palette: &'a [Rgb],
    ) {
        self.segments = segments;
        self.depth = depth;
        self.tdc_slot = tdc_slot;
        self.palette = palette;
    }

    /// Lifecycle timing. `duration` of `None` means the profile never
    /// expires; `rotation` of `None` means the image does not spin.
    /// Every `rotation` period the TDC display slot is shifted by
    /// `increment` segments (negative for clockwise).
    pub fn set_timing(
        &mut self,
        duration: Option<Duration>,
        rotation: Option<Duration>,
        increment: i16,
    ) {
        self.display_duration = duration;
        self.rotation_period = rotation;
        self.rotation_increment = increment;
    }

    pub fn set_activation_callback(&mut self, callback: ProfileCallback) {
        self.on_activate = Some(callback);
    }

    pub fn set_update_callback(&mut self, callback: ProfileCallback) {
        self.on_update = Some(callback);
    }

    pub fn set_expire_callback(&mut self, callback: ProfileCallback) {
        self.on_expire = Some(callback);
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    /// Make this profile the active display.
    ///
    /// Reconfigures the engine if another profile was active, always
    /// reloads palette and content, and restarts the duration and
    /// rotation clocks. Also fires the activation callback; a refresh
    /// does neither of the last two.
    pub fn activate<S, T, D>(&mut self, engine: &mut Engine<S, T, D>, now: Instant)
    where
        S: StripDriver,
        T: TimerChannel,
        D: TdcSensor,
    {
        self.render(engine);
        self.expired = false;
        self.duration_start = now;
        self.rotation_start = now;
        if let Some(callback) = self.on_activate {
            callback(self.id);
        }
    }

    /// Re-render content after the caller changed text, bitmap or
    /// palette data. A no-op unless this profile is the active one, so
    /// a stale profile can never scribble over another display.
    pub fn refresh<S, T, D>(&self, engine: &mut Engine<S, T, D>)
    where
        S: StripDriver,
        T: TimerChannel,
        D: TdcSensor,
    {
        if engine.active_profile() != Some(self.id) {
            return;
        }
        self.render(engine);
    }

    /// Poll lifecycle timing from the foreground loop.
    ///
    /// Returns `true` once the profile is no longer current: displaced,
    /// already expired, or its duration just elapsed (firing the expiry
    /// callback on that transition). Otherwise applies due rotation by
    /// staging a shifted TDC slot - committed by the engine at the next
    /// TDC pulse - and fires the update callback.
    pub fn update<S, T, D>(&mut self, engine: &mut Engine<S, T, D>, now: Instant) -> bool
    where
        S: StripDriver,
        T: TimerChannel,
        D: TdcSensor,
    {
        if engine.active_profile() != Some(self.id) {
            return true;
        }
        if self.expired {
            return true;
        }

        if let Some(period) = self.rotation_period {
            if now.as_millis() >= self.rotation_start.as_millis() + period.as_millis() {
                self.rotation_start += period;
                engine.shift_tdc_slot(self.rotation_increment);
            }
        }

        if let Some(duration) = self.display_duration {
            if now.as_millis() >= self.duration_start.as_millis() + duration.as_millis() {
                self.expired = true;
                if let Some(callback) = self.on_expire {
                    callback(self.id);
                }
                return true;
            }
        }

        if let Some(callback) = self.on_update {
            callback(self.id);
        }
        false
    }

    fn render<S, T, D>(&self, engine: &mut Engine<S, T, D>)
    where
        S: StripDriver,
        T: TimerChannel,
        D: TdcSensor,
    {
        if engine.active_profile() != Some(self.id) {
            engine.reconfigure(self.segments, self.depth, self.tdc_slot);
        }
        engine.load_palette(self.palette);
        if let Some(bitmap) = self.bitmap {
            engine.draw_bitmap(bitmap);
        }
        for spec in self.texts {
            engine.draw_text(spec);
        }
        engine.set_active_profile(self.id);
    }
}
