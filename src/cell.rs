//! Shared access to the single engine instance.
//!
//! Interrupt vectors have fixed signatures and cannot capture state, so
//! the handlers and foreground code both reach the engine through one
//! static cell. Entry is a critical section: handlers in this design
//! never nest, so the borrow inside can never be contended by another
//! core path.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::engine::Engine;
use crate::{StripDriver, TdcSensor, TimerChannel};

/// A `critical-section` protected slot holding the program's one
/// [`Engine`].
///
/// ```ignore
/// static ENGINE: EngineCell<Ws2812, PitChannel, HallPin> = EngineCell::new();
///
/// // in setup
/// ENGINE.install(engine);
///
/// // in the TDC interrupt handler
/// ENGINE.with(|engine| engine.on_tdc_pulse());
/// ```
pub struct EngineCell<S, T, D> {
    inner: Mutex<RefCell<Option<Engine<S, T, D>>>>,
}

impl<S, T, D> EngineCell<S, T, D>
where
    S: StripDriver,
    T: TimerChannel,
    D: TdcSensor,
{
    /// Create an empty cell.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Put the engine into the cell, returning the previous occupant if
    /// there was one.
    pub fn install(&self, engine: Engine<S, T, D>) -> Option<Engine<S, T, D>> {
        critical_section::with(|cs| self.inner.borrow(cs).replace(Some(engine)))
    }

    /// Run a closure against the engine inside a critical section.
    ///
    /// Returns `None` if no engine has been installed yet, which lets
    /// interrupt glue fire harmlessly before setup completes.
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine<S, T, D>) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().as_mut().map(f))
    }
}

impl<S, T, D> Default for EngineCell<S, T, D>
where
    S: StripDriver,
    T: TimerChannel,
    D: TdcSensor,
{
    fn default() -> Self {
        Self::new()
    }
}
