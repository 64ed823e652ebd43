//! Fan configuration parameters
//!
//! All tunable parameters for the SmartFan accessory. Values are fixed at
//! startup; the firmware binary may override the defaults with a JSON
//! document baked in at build time (`SMARTFAN_CONFIG_JSON`).

use log::error;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest speed level the Matter SpeedMax attribute may advertise here.
pub const SPEED_MAX_LIMIT: u8 = 7;

/// Maximum number of dedicated speed input pins on the board.
pub const MAX_SPEED_INPUTS: usize = 3;

/// Core fan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    // --- Matter ---
    /// Endpoint hosting the Fan Control cluster
    pub fan_endpoint_id: u16,
    /// Number of discrete speed positions above OFF (Matter SpeedMax)
    pub speed_max: u8,
    /// RockSupport bitmap; 0 disables the oscillation actuator entirely
    pub rock_support: u8,

    // --- Physical inputs ---
    /// Number of active-low speed input pins wired (1..=3)
    pub input_pin_count: u8,

    // --- Pulse timing ---
    /// Speed actuator HIGH dwell per step (milliseconds)
    pub speed_pulse_high_ms: u32,
    /// Speed actuator LOW dwell per step (milliseconds)
    pub speed_pulse_low_ms: u32,
    /// Oscillation actuator HIGH dwell per toggle (milliseconds)
    pub oscillation_pulse_ms: u32,

    // --- Concurrency ---
    /// Bounded wait for the Matter write path to acquire reconciler state
    pub lock_timeout_ms: u32,

    // --- Button ---
    /// Minimum hold for a press to count at all
    pub button_debounce_ms: u32,
    /// Hold duration that triggers decommissioning
    pub decommission_hold_ms: u32,
    /// Short press steps the speed OFF → LOW → … → OFF
    pub button_cycles_speed: bool,

    // --- Timing ---
    /// Pairing reminder interval while waiting for commissioning
    pub commissioning_reminder_ms: u32,
    /// Status report interval while commissioned
    pub status_interval_ms: u32,
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            // Matter
            fan_endpoint_id: 1,
            speed_max: 3,        // OFF / LOW / MEDIUM / HIGH
            rock_support: 0x01, // left-right

            // Physical inputs
            input_pin_count: 3,

            // Pulse timing
            speed_pulse_high_ms: 200,
            speed_pulse_low_ms: 100,
            oscillation_pulse_ms: 200,

            // Concurrency
            lock_timeout_ms: 5000,

            // Button
            button_debounce_ms: 250,
            decommission_hold_ms: 5000,
            button_cycles_speed: true,

            // Timing
            commissioning_reminder_ms: 5000,
            status_interval_ms: 10_000,
            control_loop_interval_ms: 10,
        }
    }
}

impl FanConfig {
    /// Parse a JSON override document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the reconcilers cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.speed_max == 0 || self.speed_max > SPEED_MAX_LIMIT {
            return Err(Error::Config("speed_max must be 1..=7"));
        }
        if self.input_pin_count == 0 || self.input_pin_count as usize > MAX_SPEED_INPUTS {
            return Err(Error::Config("input_pin_count must be 1..=3"));
        }
        if self.speed_pulse_high_ms == 0 || self.oscillation_pulse_ms == 0 {
            return Err(Error::Config("pulse width must be non-zero"));
        }
        if self.button_debounce_ms >= self.decommission_hold_ms {
            return Err(Error::Config("debounce must be shorter than decommission hold"));
        }
        if self.control_loop_interval_ms == 0 {
            return Err(Error::Config("control loop interval must be non-zero"));
        }
        Ok(())
    }

    /// Whether an oscillation actuator is fitted.
    pub fn oscillation_supported(&self) -> bool {
        self.rock_support != 0
    }

    /// Cyclic modulus of the speed selector (positions including OFF).
    pub fn speed_modulus(&self) -> u8 {
        self.speed_max + 1
    }

    /// The configuration the board can actually honour. RockSupport is
    /// withdrawn when no oscillation actuator came up, so the cluster never
    /// advertises Rocking without a motor behind it.
    pub fn for_board(&self, oscillation_fitted: bool) -> Self {
        let mut effective = self.clone();
        if self.oscillation_supported() && !oscillation_fitted {
            error!(
                "config: {}, RockSupport withdrawn",
                Error::Init("no oscillation actuator")
            );
            effective.rock_support = 0;
        }
        effective
    }
}
