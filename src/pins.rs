//! GPIO pin assignments for the SmartFan controller board.
//!
//! Single source of truth for every driver; change a pin here and it
//! propagates everywhere.

// ---------------------------------------------------------------------------
// Pulse actuators (opto-isolated, active HIGH)
// ---------------------------------------------------------------------------

/// One 200 ms HIGH + 100 ms LOW pulse advances the speed selector one step.
pub const SPEED_PULSE_GPIO: i32 = 4;
/// One 200 ms HIGH pulse toggles the oscillation motor.
pub const OSCILLATION_PULSE_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Physical switch inputs (active LOW, internal pull-ups)
// ---------------------------------------------------------------------------

/// Speed input pins in ascending level order: index `i` asserts level `i + 1`.
pub const SPEED_INPUT_GPIOS: [i32; 3] = [6, 7, 15];
/// LOW = oscillation switch ON.
pub const OSCILLATION_INPUT_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// User button (active LOW)
// ---------------------------------------------------------------------------

/// BOOT button doubles as the speed-cycle / decommission button.
pub const BUTTON_GPIO: i32 = 0;

/// The first `count` speed input pins (capped at the board's three).
pub fn speed_input_gpios(count: u8) -> &'static [i32] {
    let n = (count as usize).min(SPEED_INPUT_GPIOS.len());
    &SPEED_INPUT_GPIOS[..n]
}
