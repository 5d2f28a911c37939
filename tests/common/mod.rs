#![allow(dead_code)]

//! Mock collaborators shared by the integration tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pov_blade_composer::{Engine, EngineConfig, Rgb, StripDriver, TdcSensor, TimerChannel};

pub const TICKS_PER_US: u32 = 48;

pub type TestEngine = Engine<MockStrip, MockTimer, MockSensor>;

/// Records every frame written to the strip.
#[derive(Clone, Default)]
pub struct MockStrip {
    frames: Rc<RefCell<Vec<Vec<Rgb>>>>,
}

impl MockStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn last_frame(&self) -> Vec<Rgb> {
        self.frames.borrow().last().cloned().unwrap_or_default()
    }

    pub fn clear(&self) {
        self.frames.borrow_mut().clear();
    }
}

impl StripDriver for MockStrip {
    fn write(&mut self, colors: &[Rgb]) {
        self.frames.borrow_mut().push(colors.to_vec());
    }
}

#[derive(Default)]
pub struct TimerState {
    pub reload: u32,
    pub count: u32,
    pub enabled: bool,
    pub enable_calls: u32,
}

/// Down-counting timer channel whose state the test can inspect and
/// steer. Enabling restarts the count from the reload value, like the
/// hardware contract requires.
#[derive(Clone, Default)]
pub struct MockTimer {
    state: Rc<RefCell<TimerState>>,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    pub fn reload(&self) -> u32 {
        self.state.borrow().reload
    }

    pub fn enable_calls(&self) -> u32 {
        self.state.borrow().enable_calls
    }

    /// Simulate the down-counter having ticked to `count`.
    pub fn set_count(&self, count: u32) {
        self.state.borrow_mut().count = count;
    }

    pub fn current_count(&self) -> u32 {
        self.state.borrow().count
    }
}

impl TimerChannel for MockTimer {
    fn set_reload(&mut self, ticks: u32) {
        self.state.borrow_mut().reload = ticks;
    }

    fn enable(&mut self) {
        let mut state = self.state.borrow_mut();
        state.enabled = true;
        state.count = state.reload;
        state.enable_calls += 1;
    }

    fn disable(&mut self) {
        self.state.borrow_mut().enabled = false;
    }

    fn count(&self) -> u32 {
        self.state.borrow().count
    }
}

#[derive(Clone, Default)]
pub struct MockSensor {
    level: Rc<Cell<bool>>,
}

impl MockSensor {
    pub fn set_level(&self, level: bool) {
        self.level.set(level);
    }
}

impl TdcSensor for MockSensor {
    fn level(&self) -> bool {
        self.level.get()
    }
}

/// Handles onto the collaborators an engine was built with.
pub struct Rig {
    pub strip: MockStrip,
    pub watchdog: MockTimer,
    pub segment_timer: MockTimer,
    pub led_off_timer: MockTimer,
    pub sensor: MockSensor,
}

pub fn engine(num_leds: u16) -> (TestEngine, Rig) {
    let rig = Rig {
        strip: MockStrip::new(),
        watchdog: MockTimer::new(),
        segment_timer: MockTimer::new(),
        led_off_timer: MockTimer::new(),
        sensor: MockSensor::default(),
    };
    let engine = Engine::new(
        rig.strip.clone(),
        rig.watchdog.clone(),
        rig.segment_timer.clone(),
        rig.led_off_timer.clone(),
        rig.sensor.clone(),
        &EngineConfig {
            num_leds,
            ticks_per_us: TICKS_PER_US,
        },
    )
    .expect("engine setup");
    (engine, rig)
}

/// Deliver a TDC pulse after `elapsed_ticks` of simulated revolution.
pub fn pulse_after(engine: &mut TestEngine, rig: &Rig, elapsed_ticks: u32) {
    let reload = rig.watchdog.reload();
    rig.watchdog.set_count(reload.saturating_sub(elapsed_ticks));
    engine.on_tdc_pulse();
}

/// Two good revolutions: the minimum to reach Synchronized.
pub fn stabilize(engine: &mut TestEngine, rig: &Rig, period_ticks: u32) {
    pulse_after(engine, rig, period_ticks);
    pulse_after(engine, rig, period_ticks);
}

pub const BLACK: Rgb = Rgb::new(0, 0, 0);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);
pub const RED: Rgb = Rgb::new(255, 0, 0);
pub const BLUE: Rgb = Rgb::new(0, 0, 255);
