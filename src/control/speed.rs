//! Speed reconciliation state machine.
//!
//! Owns the *expected* speed (what Matter asked for) and the *current*
//! speed (where the selector is believed to sit) and pulses the actuator
//! until they agree. The selector is cyclic: one pulse moves it
//! `current → (current + 1) % (speed_max + 1)`, so going down means
//! wrapping around through the higher positions and OFF.
//!
//! ```text
//!  Idle ──[steps > 0]──▶ EmittingHigh ──[high_ms]──▶ EmittingLow
//!   ▲                         ▲                          │
//!   │                         └──────[steps > 0]─────────┤ current += 1
//!   └──────────────────────────[steps == 0]──────────────┘
//! ```
//!
//! ## Locking
//!
//! `{expected, current, session, actuator}` live behind one mutex. The
//! Matter write path waits up to the configured bound; the tick paths
//! only `try_lock` and retry on the next tick. A write that still times
//! out is parked in a single latest-wins slot and applied by the next tick
//! that gets the lock.

use core::sync::atomic::{AtomicU8, Ordering};
use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};
use parking_lot::Mutex;

use super::ObserveOutcome;
use crate::drivers::pulse::{PulseActuator, PulseStep};
use crate::error::{Error, Result};

const NO_PENDING: u8 = u8::MAX;

/// Pulses required to move a cyclic selector from `current` to `expected`.
pub fn pulses_needed(current: u8, expected: u8, speed_max: u8) -> u8 {
    let modulus = u16::from(speed_max) + 1;
    let current = u16::from(current) % modulus;
    let expected = u16::from(expected) % modulus;
    ((expected + modulus - current) % modulus) as u8
}

/// Result of a Matter-side [`SpeedReconciler::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new pulse session was opened.
    SessionStarted,
    /// A session is already running; it will pick up the new target.
    Retargeted,
    /// The selector is already at the requested level.
    AtTarget,
}

/// What one [`SpeedReconciler::advance`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTick {
    /// Nothing to do, or a dwell is still running.
    Quiet,
    /// Lock held by the other thread; retry next tick.
    Contended,
    /// The pin went HIGH to begin a session.
    PulseStarted { remaining: u8 },
    /// One cycle finished and the next pulse began immediately.
    Stepped { current: u8, remaining: u8 },
    /// One cycle finished but no new pulse may start; the session waits.
    Held { current: u8, remaining: u8 },
    /// Current reached expected; the session closed.
    Settled { current: u8 },
}

/// Point-in-time copy of the reconciler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedSnapshot {
    pub expected: u8,
    pub current: u8,
    pub session_active: bool,
}

struct SpeedState<P: OutputPin> {
    expected: u8,
    current: u8,
    session_active: bool,
    actuator: PulseActuator<P>,
}

impl<P: OutputPin> SpeedState<P> {
    fn retarget(&mut self, level: u8) -> RequestOutcome {
        self.expected = level;
        if self.session_active {
            RequestOutcome::Retargeted
        } else if self.expected != self.current {
            self.session_active = true;
            RequestOutcome::SessionStarted
        } else {
            RequestOutcome::AtTarget
        }
    }
}

pub struct SpeedReconciler<P: OutputPin> {
    state: Mutex<SpeedState<P>>,
    pending: AtomicU8,
    speed_max: u8,
    high_ms: u32,
    low_ms: u32,
    lock_timeout: Duration,
}

impl<P: OutputPin> SpeedReconciler<P> {
    pub fn new(pin: P, speed_max: u8, high_ms: u32, low_ms: u32, lock_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(SpeedState {
                expected: 0,
                current: 0,
                session_active: false,
                actuator: PulseActuator::new(pin, "speed"),
            }),
            pending: AtomicU8::new(NO_PENDING),
            speed_max,
            high_ms,
            low_ms,
            lock_timeout,
        }
    }

    pub fn speed_max(&self) -> u8 {
        self.speed_max
    }

    /// Clamp `level` to `speed_max`, logging when it had to.
    pub fn clamp(&self, level: u8) -> u8 {
        if level > self.speed_max {
            warn!("speed: requested {} clamped to {}", level, self.speed_max);
            self.speed_max
        } else {
            level
        }
    }

    /// Set the expected speed from the Matter write path.
    ///
    /// Waits up to the lock bound. On timeout the request is parked and
    /// `Error::LockTimeout` is returned; the next tick applies it.
    pub fn request(&self, level: u8) -> Result<RequestOutcome> {
        let level = self.clamp(level);
        let Some(mut state) = self.state.try_lock_for(self.lock_timeout) else {
            self.pending.store(level, Ordering::Release);
            warn!("speed: lock timeout, request for {} parked", level);
            return Err(Error::LockTimeout("speed"));
        };
        // A newer request supersedes anything parked earlier.
        self.pending.store(NO_PENDING, Ordering::Release);
        let outcome = state.retarget(level);
        if outcome == RequestOutcome::SessionStarted {
            info!(
                "speed: {} -> {} ({} pulses)",
                state.current,
                level,
                pulses_needed(state.current, level, self.speed_max)
            );
        }
        Ok(outcome)
    }

    /// Physical indicator lines report the selector at `level`. Honoured
    /// only while no pulse session is open.
    pub fn try_observe(&self, level: u8) -> ObserveOutcome {
        let level = self.clamp(level);
        let Some(mut state) = self.state.try_lock() else {
            return ObserveOutcome::Contended;
        };
        self.apply_pending(&mut state);
        if state.session_active {
            return ObserveOutcome::Busy;
        }
        if state.current == level && state.expected == level {
            return ObserveOutcome::Unchanged;
        }
        info!("speed: physical input reports level {}", level);
        state.expected = level;
        state.current = level;
        ObserveOutcome::Applied
    }

    /// Per-tick pulse engine. Never blocks.
    pub fn advance(&self, now_ms: u32) -> SpeedTick {
        self.step(now_ms, true)
    }

    /// Carry a pulse already on the wire to the end of its cycle without
    /// starting another one. The session stays open and resumes on the
    /// next [`advance`](Self::advance).
    pub fn finish_pulse(&self, now_ms: u32) -> SpeedTick {
        self.step(now_ms, false)
    }

    /// Step to the next level in the cycle, computed and applied under one
    /// lock acquisition. Bounded wait like [`request`](Self::request), but
    /// a timed-out cycle is dropped rather than parked.
    pub fn cycle(&self) -> Result<u8> {
        let Some(mut state) = self.state.try_lock_for(self.lock_timeout) else {
            warn!("speed: lock timeout, cycle dropped");
            return Err(Error::LockTimeout("speed"));
        };
        self.apply_pending(&mut state);
        let next = (state.expected + 1) % (self.speed_max + 1);
        if state.retarget(next) == RequestOutcome::SessionStarted {
            info!("speed: cycle {} -> {}", state.current, next);
        }
        Ok(next)
    }

    fn step(&self, now_ms: u32, may_start: bool) -> SpeedTick {
        let Some(mut state) = self.state.try_lock() else {
            return SpeedTick::Contended;
        };
        self.apply_pending(&mut state);
        if !state.session_active {
            return SpeedTick::Quiet;
        }

        if !state.actuator.is_active() {
            let remaining = pulses_needed(state.current, state.expected, self.speed_max);
            if remaining == 0 {
                state.session_active = false;
                return SpeedTick::Settled {
                    current: state.current,
                };
            }
            if !may_start {
                return SpeedTick::Quiet;
            }
            state.actuator.begin_high(now_ms);
            return SpeedTick::PulseStarted { remaining };
        }

        match state.actuator.poll(now_ms, self.high_ms, self.low_ms) {
            PulseStep::CycleComplete => {
                state.current = (state.current + 1) % (self.speed_max + 1);
                let current = state.current;
                let remaining = pulses_needed(current, state.expected, self.speed_max);
                if remaining == 0 {
                    state.session_active = false;
                    info!("speed: settled at {}", current);
                    SpeedTick::Settled { current }
                } else if may_start {
                    state.actuator.begin_high(now_ms);
                    debug!("speed: stepped to {}, {} to go", current, remaining);
                    SpeedTick::Stepped { current, remaining }
                } else {
                    debug!("speed: held at {}, {} to go", current, remaining);
                    SpeedTick::Held { current, remaining }
                }
            }
            PulseStep::Idle | PulseStep::Waiting | PulseStep::Lowered => SpeedTick::Quiet,
        }
    }

    pub fn current(&self) -> u8 {
        self.state.lock().current
    }

    pub fn expected(&self) -> u8 {
        self.state.lock().expected
    }

    pub fn is_pulsing(&self) -> bool {
        self.state.lock().session_active
    }

    /// Non-blocking copy of the state for the tick path; `None` while the
    /// write path holds the lock.
    pub fn try_snapshot(&self) -> Option<SpeedSnapshot> {
        let state = self.state.try_lock()?;
        Some(SpeedSnapshot {
            expected: state.expected,
            current: state.current,
            session_active: state.session_active,
        })
    }

    /// Level parked by a timed-out request, if any.
    pub fn pending(&self) -> Option<u8> {
        match self.pending.load(Ordering::Acquire) {
            NO_PENDING => None,
            level => Some(level),
        }
    }

    fn apply_pending(&self, state: &mut SpeedState<P>) {
        let level = self.pending.swap(NO_PENDING, Ordering::AcqRel);
        if level != NO_PENDING {
            info!("speed: applying parked request for {}", level);
            state.retarget(level);
        }
    }
}
