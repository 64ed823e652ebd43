//! Physical switch and indicator input sampler.
//!
//! ## Hardware
//!
//! Up to three speed indicator lines, one oscillation line and the user
//! button, all active-LOW with pull-ups. The speed lines follow the fan's
//! own panel: line `i` LOW means the selector sits at level `i + 1`.
//!
//! ## Priority
//!
//! When several speed lines read LOW at once the highest level wins.
//! No line LOW means the fan is OFF (level 0).
//!
//! A line that fails to read drops that input from the snapshot for the
//! current tick; the reconcilers treat a missing value as "no observation".

use embedded_hal::digital::InputPin;
use heapless::Vec;
use log::warn;

use crate::config::MAX_SPEED_INPUTS;
use crate::error::ActuatorError;

/// One tick's worth of physical input readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Speed level asserted by the indicator lines, `None` on read failure.
    pub speed_level: Option<u8>,
    /// Oscillation switch state, `None` when not fitted or unreadable.
    pub oscillation_on: Option<bool>,
    /// User button held down.
    pub button_pressed: bool,
}

pub struct PhysicalInputs<I: InputPin> {
    speed: Vec<I, MAX_SPEED_INPUTS>,
    oscillation: Option<I>,
    button: I,
}

impl<I: InputPin> PhysicalInputs<I> {
    /// `speed` must be ordered by ascending level; extra pins past
    /// [`MAX_SPEED_INPUTS`] are ignored.
    pub fn new(speed: impl IntoIterator<Item = I>, oscillation: Option<I>, button: I) -> Self {
        let mut lines = Vec::new();
        for pin in speed {
            if lines.push(pin).is_err() {
                warn!("inputs: more than {} speed lines, extra ignored", MAX_SPEED_INPUTS);
                break;
            }
        }
        Self {
            speed: lines,
            oscillation,
            button,
        }
    }

    pub fn speed_line_count(&self) -> usize {
        self.speed.len()
    }

    /// Read every line once.
    pub fn sample(&mut self) -> InputSnapshot {
        InputSnapshot {
            speed_level: self.read_speed_level(),
            oscillation_on: self.oscillation.as_mut().and_then(read_asserted),
            button_pressed: read_asserted(&mut self.button).unwrap_or(false),
        }
    }

    fn read_speed_level(&mut self) -> Option<u8> {
        for (idx, pin) in self.speed.iter_mut().enumerate().rev() {
            if read_asserted(pin)? {
                return Some(idx as u8 + 1);
            }
        }
        Some(0)
    }
}

/// Active-LOW read: `Some(true)` when the line is pulled down.
fn read_asserted<I: InputPin>(pin: &mut I) -> Option<bool> {
    match pin.is_low() {
        Ok(low) => Some(low),
        Err(e) => {
            warn!("inputs: {} ({:?})", ActuatorError::GpioReadFailed, e);
            None
        }
    }
}
