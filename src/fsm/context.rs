//! Blackboard shared by the commissioning phase handlers.
//!
//! The control loop writes the inputs (`now_ms`, `commissioned`) before
//! each tick and drains [`PhaseActions`] afterwards. Handlers never perform
//! I/O themselves.

/// Side effects requested by the phase handlers during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseActions {
    /// Print manual pairing code and QR URL.
    pub announce_pairing: bool,
    /// Periodic "still waiting" reminder.
    pub remind: bool,
}

pub struct CommissioningContext {
    // -- inputs --
    pub now_ms: u32,
    pub commissioned: bool,

    // -- timing --
    /// `now_ms` at the last phase entry.
    pub entered_at_ms: u32,
    pub last_reminder_ms: u32,
    pub reminder_interval_ms: u32,

    sync_complete: bool,
    actions: PhaseActions,
}

impl CommissioningContext {
    pub fn new(reminder_interval_ms: u32) -> Self {
        Self {
            now_ms: 0,
            commissioned: false,
            entered_at_ms: 0,
            last_reminder_ms: 0,
            reminder_interval_ms,
            sync_complete: false,
            actions: PhaseActions::default(),
        }
    }

    pub fn ms_in_phase(&self) -> u32 {
        self.now_ms.wrapping_sub(self.entered_at_ms)
    }

    pub fn request(&mut self, f: impl FnOnce(&mut PhaseActions)) {
        f(&mut self.actions);
    }

    /// Hand the accumulated actions to the caller and clear them.
    pub fn take_actions(&mut self) -> PhaseActions {
        core::mem::take(&mut self.actions)
    }

    /// The post-commissioning sync for this JustCompleted entry has not
    /// succeeded yet.
    pub fn sync_pending(&self) -> bool {
        !self.sync_complete
    }

    pub fn mark_synced(&mut self) {
        self.sync_complete = true;
    }

    pub(super) fn reset_sync(&mut self) {
        self.sync_complete = false;
    }

    pub(super) fn is_synced(&self) -> bool {
        self.sync_complete
    }
}
