//! Oscillation (rock) reconciliation state machine.
//!
//! Non-cyclic sibling of [`speed`](super::speed): a single fixed-width
//! HIGH pulse toggles the oscillation motor. `request` raises the pin
//! straight away when idle; `advance` drops it after the dwell and records
//! the toggle. If the target flipped again while the pulse was in flight,
//! the next tick pulses once more.

use core::sync::atomic::{AtomicU8, Ordering};
use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{info, warn};
use parking_lot::Mutex;

use super::ObserveOutcome;
use crate::drivers::pulse::{PulseActuator, PulseStep};
use crate::error::{Error, Result};

const NO_PENDING: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillationRequest {
    /// Pin raised for a toggle pulse.
    PulseStarted,
    /// A pulse is in flight; the target is re-checked when it ends.
    InFlight,
    /// Already in the requested state.
    AtTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillationTick {
    Quiet,
    Contended,
    PulseStarted,
    /// Pulse finished; `current` is the new believed state.
    Toggled { current: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscillationSnapshot {
    pub expected: bool,
    pub current: bool,
    pub pulsing: bool,
}

struct OscillationState<P: OutputPin> {
    expected: bool,
    current: bool,
    actuator: PulseActuator<P>,
}

impl<P: OutputPin> OscillationState<P> {
    fn retarget(&mut self, on: bool, now_ms: u32) -> OscillationRequest {
        self.expected = on;
        if self.actuator.is_active() {
            OscillationRequest::InFlight
        } else if self.expected != self.current {
            self.actuator.begin_high(now_ms);
            OscillationRequest::PulseStarted
        } else {
            OscillationRequest::AtTarget
        }
    }
}

pub struct OscillationReconciler<P: OutputPin> {
    state: Mutex<OscillationState<P>>,
    pending: AtomicU8,
    pulse_ms: u32,
    lock_timeout: Duration,
}

impl<P: OutputPin> OscillationReconciler<P> {
    pub fn new(pin: P, pulse_ms: u32, lock_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(OscillationState {
                expected: false,
                current: false,
                actuator: PulseActuator::new(pin, "oscillation"),
            }),
            pending: AtomicU8::new(NO_PENDING),
            pulse_ms,
            lock_timeout,
        }
    }

    /// Matter write path. Bounded wait; a timed-out request is parked.
    pub fn request(&self, on: bool, now_ms: u32) -> Result<OscillationRequest> {
        let Some(mut state) = self.state.try_lock_for(self.lock_timeout) else {
            self.pending.store(u8::from(on), Ordering::Release);
            warn!("oscillation: lock timeout, request {} parked", on_off(on));
            return Err(Error::LockTimeout("oscillation"));
        };
        self.pending.store(NO_PENDING, Ordering::Release);
        let outcome = state.retarget(on, now_ms);
        if outcome == OscillationRequest::PulseStarted {
            info!("oscillation: toggling {}", on_off(on));
        }
        Ok(outcome)
    }

    /// Physical switch reports `on`. Ignored while a pulse is in flight.
    pub fn try_observe(&self, on: bool) -> ObserveOutcome {
        let Some(mut state) = self.state.try_lock() else {
            return ObserveOutcome::Contended;
        };
        if state.actuator.is_active() {
            return ObserveOutcome::Busy;
        }
        if state.current == on && state.expected == on {
            return ObserveOutcome::Unchanged;
        }
        info!("oscillation: physical input reports {}", on_off(on));
        state.current = on;
        state.expected = on;
        ObserveOutcome::Applied
    }

    /// Per-tick pulse engine. Never blocks.
    pub fn advance(&self, now_ms: u32) -> OscillationTick {
        self.step(now_ms, true)
    }

    /// Drop the pin once an in-flight pulse has dwelt long enough, but
    /// never start a new one. A target left unmet waits for `advance`.
    pub fn finish_pulse(&self, now_ms: u32) -> OscillationTick {
        self.step(now_ms, false)
    }

    fn step(&self, now_ms: u32, may_start: bool) -> OscillationTick {
        let Some(mut state) = self.state.try_lock() else {
            return OscillationTick::Contended;
        };

        let parked = self.pending.swap(NO_PENDING, Ordering::AcqRel);
        if parked != NO_PENDING {
            info!("oscillation: applying parked request {}", on_off(parked != 0));
            state.expected = parked != 0;
        }

        if !state.actuator.is_active() {
            if may_start && state.expected != state.current {
                state.actuator.begin_high(now_ms);
                return OscillationTick::PulseStarted;
            }
            return OscillationTick::Quiet;
        }

        match state.actuator.poll(now_ms, self.pulse_ms, 0) {
            PulseStep::CycleComplete => {
                state.current = !state.current;
                info!("oscillation: now {}", on_off(state.current));
                OscillationTick::Toggled {
                    current: state.current,
                }
            }
            PulseStep::Idle | PulseStep::Waiting | PulseStep::Lowered => OscillationTick::Quiet,
        }
    }

    pub fn current(&self) -> bool {
        self.state.lock().current
    }

    pub fn expected(&self) -> bool {
        self.state.lock().expected
    }

    pub fn is_pulsing(&self) -> bool {
        self.state.lock().actuator.is_active()
    }

    /// Non-blocking copy of the state for the tick path.
    pub fn try_snapshot(&self) -> Option<OscillationSnapshot> {
        let state = self.state.try_lock()?;
        Some(OscillationSnapshot {
            expected: state.expected,
            current: state.current,
            pulsing: state.actuator.is_active(),
        })
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}
