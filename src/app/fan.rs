//! Fan controller: the single owner of both reconcilers.
//!
//! Created once at startup and shared by `Arc` between the control loop
//! and the Matter callback thread. Implements the speed and rock change
//! strategies the [`FanEndpoint`](super::fan_cluster::FanEndpoint) calls,
//! and mirrors settled state back through [`FanAttributes`].

use std::sync::Arc;

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use super::fan_cluster::FanAttributes;
use super::ports::{Clock, RockChangeHandler, SpeedChangeHandler};
use crate::config::FanConfig;
use crate::control::ObserveOutcome;
use crate::control::oscillation::{OscillationReconciler, OscillationRequest, OscillationTick};
use crate::control::speed::{RequestOutcome, SpeedReconciler, SpeedTick};
use crate::drivers::inputs::InputSnapshot;
use crate::error::{Error, Result};

/// Snapshot used for the periodic status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanStatus {
    pub speed: u8,
    pub target_speed: u8,
    pub on: bool,
    pub oscillating: bool,
    pub pulsing: bool,
}

/// What the post-commissioning synchronisation settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub speed: u8,
    pub oscillating: bool,
    /// Physical inputs disagreed with the stored attributes and won.
    pub physical_override: bool,
}

pub struct FanController<S: OutputPin, O: OutputPin> {
    speed: SpeedReconciler<S>,
    oscillation: Option<OscillationReconciler<O>>,
    attrs: FanAttributes,
    clock: Arc<dyn Clock>,
}

impl<S: OutputPin, O: OutputPin> FanController<S, O> {
    /// `oscillation_pin` is ignored when the configuration has no
    /// RockSupport; a missing pin with RockSupport disables rocking.
    pub fn new(
        config: &FanConfig,
        speed_pin: S,
        oscillation_pin: Option<O>,
        attrs: FanAttributes,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lock_timeout = Duration::from_millis(u64::from(config.lock_timeout_ms));
        let speed = SpeedReconciler::new(
            speed_pin,
            config.speed_max,
            config.speed_pulse_high_ms,
            config.speed_pulse_low_ms,
            lock_timeout,
        );
        let oscillation = match (config.oscillation_supported(), oscillation_pin) {
            (true, Some(pin)) => Some(OscillationReconciler::new(
                pin,
                config.oscillation_pulse_ms,
                lock_timeout,
            )),
            (true, None) => {
                error!(
                    "fan: {}, rocking disabled",
                    Error::Init("RockSupport set but no oscillation pin")
                );
                None
            }
            (false, _) => None,
        };
        Self {
            speed,
            oscillation,
            attrs,
            clock,
        }
    }

    pub fn attributes(&self) -> &FanAttributes {
        &self.attrs
    }

    pub fn has_oscillation(&self) -> bool {
        self.oscillation.is_some()
    }

    // ── Speed ─────────────────────────────────────────────────

    pub fn request_speed(&self, level: u8) -> Result<RequestOutcome> {
        self.speed.request(level)
    }

    /// Physical input forced the selector to `level`.
    pub fn observe_physical_speed(&self, level: u8) -> ObserveOutcome {
        let outcome = self.speed.try_observe(level);
        if outcome == ObserveOutcome::Applied {
            self.attrs.publish_speed(self.speed.clamp(level));
        }
        outcome
    }

    pub fn advance_speed(&self, now_ms: u32) -> SpeedTick {
        self.mirror_speed(self.speed.advance(now_ms))
    }

    /// Outside the run phase: complete a speed pulse already in flight
    /// without starting the next.
    pub fn finish_speed_pulse(&self, now_ms: u32) -> SpeedTick {
        self.mirror_speed(self.speed.finish_pulse(now_ms))
    }

    /// Local speed request (console, decommission): the write path plus
    /// the SpeedSetting a Matter write would have stored. A parked request
    /// still counts as accepted.
    pub fn set_speed(&self, level: u8) -> Result<u8> {
        let level = self.speed.clamp(level);
        match self.speed.request(level) {
            Ok(_) | Err(Error::LockTimeout(_)) => {}
            Err(e) => return Err(e),
        }
        self.attrs.publish_speed_setting(level);
        Ok(level)
    }

    pub fn current_speed(&self) -> u8 {
        self.speed.current()
    }

    pub fn expected_speed(&self) -> u8 {
        self.speed.expected()
    }

    pub fn is_speed_pulsing(&self) -> bool {
        self.speed.is_pulsing()
    }

    /// Step to the next speed in the OFF → LOW → … → MAX → OFF cycle and
    /// record it as the new SpeedSetting.
    pub fn cycle_speed(&self) -> Result<u8> {
        let next = self.speed.cycle()?;
        self.attrs.publish_speed_setting(next);
        Ok(next)
    }

    // ── Oscillation ───────────────────────────────────────────

    pub fn request_oscillation(&self, on: bool) -> Result<OscillationRequest> {
        match &self.oscillation {
            Some(osc) => osc.request(on, self.clock.now_ms()),
            None => {
                if on {
                    warn!("fan: oscillation requested but not fitted");
                }
                Ok(OscillationRequest::AtTarget)
            }
        }
    }

    pub fn observe_physical_oscillation(&self, on: bool) -> ObserveOutcome {
        let Some(osc) = &self.oscillation else {
            return ObserveOutcome::Unchanged;
        };
        let outcome = osc.try_observe(on);
        if outcome == ObserveOutcome::Applied {
            self.attrs.publish_rock(on);
        }
        outcome
    }

    pub fn advance_oscillation(&self, now_ms: u32) -> OscillationTick {
        match &self.oscillation {
            Some(osc) => osc.advance(now_ms),
            None => OscillationTick::Quiet,
        }
    }

    /// Outside the run phase: lower the oscillation pin once its pulse has
    /// dwelt, without answering a target flip.
    pub fn finish_oscillation_pulse(&self, now_ms: u32) -> OscillationTick {
        match &self.oscillation {
            Some(osc) => osc.finish_pulse(now_ms),
            None => OscillationTick::Quiet,
        }
    }

    /// Local oscillation request; mirrors RockSetting like a Matter write.
    pub fn set_oscillation(&self, on: bool) -> Result<bool> {
        match self.request_oscillation(on) {
            Ok(_) | Err(Error::LockTimeout(_)) => {}
            Err(e) => return Err(e),
        }
        let on = on && self.has_oscillation();
        self.attrs.publish_rock(on);
        Ok(on)
    }

    pub fn current_oscillation(&self) -> bool {
        self.oscillation.as_ref().is_some_and(OscillationReconciler::current)
    }

    pub fn is_oscillation_pulsing(&self) -> bool {
        self.oscillation
            .as_ref()
            .is_some_and(OscillationReconciler::is_pulsing)
    }

    // ── Commissioning sync ────────────────────────────────────

    /// Seed both reconcilers from the stored attributes, letting physical
    /// inputs win where they disagree.
    ///
    /// Returns `Err(LockTimeout)` when either lock is contended so the
    /// caller can retry on the next tick. A pulse session already in
    /// flight is left alone: it is carrying out a controller request.
    pub fn sync_after_commissioning(&self, inputs: &InputSnapshot) -> Result<SyncReport> {
        let stored_speed = self.speed.clamp(self.attrs.speed_setting().unwrap_or(0));
        let target_speed = inputs.speed_level.unwrap_or(stored_speed);
        let mut physical_override = false;

        match self.speed.try_observe(target_speed) {
            ObserveOutcome::Contended => return Err(Error::LockTimeout("speed")),
            ObserveOutcome::Busy => {
                info!("fan: speed session in flight, keeping its target");
            }
            ObserveOutcome::Applied | ObserveOutcome::Unchanged => {
                if target_speed == stored_speed {
                    self.attrs.publish_speed_current(target_speed);
                } else {
                    info!(
                        "fan: physical speed {} overrides stored {}",
                        target_speed, stored_speed
                    );
                    self.attrs.publish_speed(target_speed);
                    physical_override = true;
                }
            }
        }

        if let Some(osc) = &self.oscillation {
            let stored_on = self.attrs.rock_setting().unwrap_or(0) != 0;
            let target_on = inputs.oscillation_on.unwrap_or(stored_on);
            match osc.try_observe(target_on) {
                ObserveOutcome::Contended => return Err(Error::LockTimeout("oscillation")),
                ObserveOutcome::Busy => {
                    info!("fan: oscillation pulse in flight, keeping its target");
                }
                ObserveOutcome::Applied | ObserveOutcome::Unchanged => {
                    if target_on != stored_on {
                        info!(
                            "fan: physical oscillation {} overrides stored setting",
                            if target_on { "ON" } else { "OFF" }
                        );
                        self.attrs.publish_rock(target_on);
                        physical_override = true;
                    }
                }
            }
        }

        let speed = self
            .speed
            .try_snapshot()
            .ok_or(Error::LockTimeout("speed"))?;
        let oscillating = match &self.oscillation {
            Some(osc) => {
                osc.try_snapshot()
                    .ok_or(Error::LockTimeout("oscillation"))?
                    .current
            }
            None => false,
        };
        Ok(SyncReport {
            speed: speed.current,
            oscillating,
            physical_override,
        })
    }

    /// Periodic status from the tick path. `None` when either lock is held
    /// by the write path; the caller retries next tick.
    pub fn status(&self) -> Option<FanStatus> {
        let speed = self.speed.try_snapshot()?;
        let oscillation = match &self.oscillation {
            Some(osc) => Some(osc.try_snapshot()?),
            None => None,
        };
        Some(FanStatus {
            speed: speed.current,
            target_speed: speed.expected,
            on: speed.current > 0,
            oscillating: oscillation.is_some_and(|o| o.current),
            pulsing: speed.session_active || oscillation.is_some_and(|o| o.pulsing),
        })
    }

    fn mirror_speed(&self, tick: SpeedTick) -> SpeedTick {
        match tick {
            SpeedTick::Stepped { current, .. }
            | SpeedTick::Held { current, .. }
            | SpeedTick::Settled { current } => {
                self.attrs.publish_speed_current(current);
            }
            SpeedTick::Quiet | SpeedTick::Contended | SpeedTick::PulseStarted { .. } => {}
        }
        tick
    }
}

// ── Matter change strategies ──────────────────────────────────

impl<S: OutputPin + Send, O: OutputPin + Send> SpeedChangeHandler for FanController<S, O> {
    fn on_speed_change(&self, level: u8) -> bool {
        match self.request_speed(level) {
            Ok(_) => true,
            // Parked; the next tick applies it.
            Err(Error::LockTimeout(_)) => true,
            Err(e) => {
                warn!("fan: speed change to {} failed: {}", level, e);
                false
            }
        }
    }
}

impl<S: OutputPin + Send, O: OutputPin + Send> RockChangeHandler for FanController<S, O> {
    fn on_rock_change(&self, rock_setting: u8) -> bool {
        match self.request_oscillation(rock_setting != 0) {
            Ok(_) | Err(Error::LockTimeout(_)) => true,
            Err(e) => {
                warn!("fan: rock change to 0x{:02X} failed: {}", rock_setting, e);
                false
            }
        }
    }
}
