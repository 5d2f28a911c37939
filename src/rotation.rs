//! Rotation synchronization state.
//!
//! Consumes TDC pulses (through the engine's interrupt entry points) and
//! tracks whether the blade is spinning fast and steadily enough to
//! display. The original hardware design swapped interrupt vector
//! function pointers between an acquiring and an active handler; here
//! that is a two-state enum dispatched with an explicit branch.

/// Consecutive in-bounds revolutions required before display starts, so
/// the first frames are never based on a single noisy sample.
pub(crate) const MIN_GOOD_REVOLUTIONS: u32 = 2;

/// Externally visible synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No valid TDC pulse seen since start, reconfiguration or fault.
    Unsynchronized,
    /// Counting consecutive good revolutions; not displaying yet.
    Stabilizing,
    /// Locked to the rotation; segment playback is running.
    Synchronized,
}

/// Which TDC handler branch runs on the next pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockState {
    AcquiringLock,
    Locked,
}

/// Mutable rotation bookkeeping shared between the TDC pulse, segment
/// timer and watchdog interrupt paths.
pub(crate) struct RotationSync {
    pub(crate) lock: LockState,
    pub(crate) good_revolutions: u32,
    /// Hardware-timer ticks of the most recent full revolution.
    pub(crate) last_period_ticks: u32,
    /// Segment currently due for display.
    pub(crate) current_slot: u16,
    /// Segment shown exactly at the TDC pulse.
    pub(crate) tdc_slot: u16,
    /// Staged TDC slot, consumed only at the TDC boundary so rotation
    /// updates are never torn mid-revolution.
    pub(crate) tdc_slot_pending: u16,
}

impl RotationSync {
    pub(crate) const fn new() -> Self {
        Self {
            lock: LockState::AcquiringLock,
            good_revolutions: 0,
            last_period_ticks: 0,
            current_slot: 0,
            tdc_slot: 0,
            tdc_slot_pending: 0,
        }
    }

    /// Restart acquisition around a new TDC display slot. Used by
    /// reconfiguration; a geometry change always re-stabilizes.
    pub(crate) fn reset(&mut self, tdc_slot: u16) {
        self.lock = LockState::AcquiringLock;
        self.good_revolutions = 0;
        self.current_slot = tdc_slot;
        self.tdc_slot = tdc_slot;
        self.tdc_slot_pending = tdc_slot;
    }

    /// Watchdog fired: revolutions are no longer trusted.
    pub(crate) fn drop_lock(&mut self) {
        self.lock = LockState::AcquiringLock;
        self.good_revolutions = 0;
    }

    /// One more in-bounds revolution observed while acquiring.
    pub(crate) fn note_good_revolution(&mut self) {
        self.good_revolutions += 1;
        if self.good_revolutions >= MIN_GOOD_REVOLUTIONS {
            self.lock = LockState::Locked;
        }
    }

    /// Commit the staged TDC slot and rewind playback to it.
    pub(crate) fn commit_tdc(&mut self) {
        self.tdc_slot = self.tdc_slot_pending;
        self.current_slot = self.tdc_slot;
    }

    pub(crate) fn advance_slot(&mut self, mask: u16) {
        self.current_slot = (self.current_slot + 1) & mask;
    }

    pub(crate) fn sync_state(&self) -> SyncState {
        match self.lock {
            LockState::Locked => SyncState::Synchronized,
            LockState::AcquiringLock if self.good_revolutions > 0 => SyncState::Stabilizing,
            LockState::AcquiringLock => SyncState::Unsynchronized,
        }
    }
}
