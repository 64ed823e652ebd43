//! Single-wire pulse actuator driver.
//!
//! The fan's speed selector and oscillation motor are driven through
//! opto-isolated relays that react to timed HIGH pulses only. They cannot
//! report their position back, so this driver is a dumb timing engine:
//! the reconcilers decide *whether* to pulse, this decides *when* the pin
//! moves.
//!
//! ```text
//!  Idle ──begin_high──▶ High ──[high_ms]──▶ Low ──[low_ms]──▶ Idle
//!                         └────[high_ms, low_ms == 0]────────▶ Idle
//! ```
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal::digital::OutputPin`: on ESP-IDF this is an
//! `esp_idf_hal` `PinDriver`, on host tests a recording mock.

use embedded_hal::digital::OutputPin;
use log::{debug, error};

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePhase {
    Idle,
    High { since_ms: u32 },
    Low { since_ms: u32 },
}

/// Outcome of one [`PulseActuator::poll`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseStep {
    /// No pulse in flight.
    Idle,
    /// Dwell not yet elapsed.
    Waiting,
    /// HIGH dwell elapsed, pin is now LOW.
    Lowered,
    /// The full HIGH/LOW cycle finished; the mechanism moved one step.
    CycleComplete,
}

pub struct PulseActuator<P: OutputPin> {
    pin: P,
    name: &'static str,
    phase: PulsePhase,
    write_failures: u32,
}

impl<P: OutputPin> PulseActuator<P> {
    /// Wrap `pin` and drive it LOW so the relay starts released.
    pub fn new(pin: P, name: &'static str) -> Self {
        let mut actuator = Self {
            pin,
            name,
            phase: PulsePhase::Idle,
            write_failures: 0,
        };
        actuator.drive(false);
        actuator
    }

    /// Raise the pin and start the HIGH dwell.
    pub fn begin_high(&mut self, now_ms: u32) {
        self.drive(true);
        self.phase = PulsePhase::High { since_ms: now_ms };
        debug!("{}: pulse HIGH at {}ms", self.name, now_ms);
    }

    /// Advance the pulse timing. A `low_ms` of zero ends the cycle as soon
    /// as the pin drops.
    pub fn poll(&mut self, now_ms: u32, high_ms: u32, low_ms: u32) -> PulseStep {
        match self.phase {
            PulsePhase::Idle => PulseStep::Idle,

            PulsePhase::High { since_ms } => {
                if now_ms.wrapping_sub(since_ms) < high_ms {
                    return PulseStep::Waiting;
                }
                self.drive(false);
                if low_ms == 0 {
                    self.phase = PulsePhase::Idle;
                    PulseStep::CycleComplete
                } else {
                    self.phase = PulsePhase::Low { since_ms: now_ms };
                    PulseStep::Lowered
                }
            }

            PulsePhase::Low { since_ms } => {
                if now_ms.wrapping_sub(since_ms) < low_ms {
                    return PulseStep::Waiting;
                }
                self.phase = PulsePhase::Idle;
                PulseStep::CycleComplete
            }
        }
    }

    pub fn phase(&self) -> PulsePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, PulsePhase::Idle)
    }

    /// Number of pin writes that failed since boot.
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    fn drive(&mut self, high: bool) {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        // The relay has no feedback line; timing continues regardless.
        if let Err(e) = result {
            self.write_failures = self.write_failures.saturating_add(1);
            error!(
                "{}: {} ({:?}), level={}",
                self.name,
                ActuatorError::GpioWriteFailed,
                e,
                if high { "HIGH" } else { "LOW" }
            );
        }
    }
}
