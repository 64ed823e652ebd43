//! One-shot board bring-up.
//!
//! Claims the pulse outputs and the switch inputs listed in [`pins`] as
//! ESP-IDF `PinDriver`s. Called once from `main()` before the control
//! loop starts. A failure on the oscillation pins only disables rocking;
//! a failure on the speed actuator or the button is fatal.

#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
#[cfg(target_os = "espidf")]
use log::{error, info};

#[cfg(target_os = "espidf")]
use crate::config::FanConfig;
#[cfg(target_os = "espidf")]
use crate::drivers::inputs::PhysicalInputs;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    OutputConfigFailed(i32),
    InputConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutputConfigFailed(gpio) => write!(f, "output GPIO{} config failed", gpio),
            Self::InputConfigFailed(gpio) => write!(f, "input GPIO{} config failed", gpio),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
pub type OutputDriver = PinDriver<'static, AnyOutputPin, Output>;
#[cfg(target_os = "espidf")]
pub type InputDriver = PinDriver<'static, AnyIOPin, Input>;

#[cfg(target_os = "espidf")]
pub struct Board {
    pub speed_pulse: OutputDriver,
    /// `None` when rocking is not configured or its pin failed.
    pub oscillation_pulse: Option<OutputDriver>,
    pub inputs: PhysicalInputs<InputDriver>,
}

#[cfg(target_os = "espidf")]
pub fn init_board(config: &FanConfig) -> Result<Board, HwInitError> {
    let speed_pulse = output(pins::SPEED_PULSE_GPIO)?;

    let (oscillation_pulse, oscillation_input) = if config.oscillation_supported() {
        match (
            output(pins::OSCILLATION_PULSE_GPIO),
            input(pins::OSCILLATION_INPUT_GPIO),
        ) {
            (Ok(pulse), Ok(sense)) => (Some(pulse), Some(sense)),
            (Err(e), _) | (_, Err(e)) => {
                error!("hw_init: {}, oscillation disabled", e);
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    let mut speed_inputs = heapless::Vec::<InputDriver, { crate::config::MAX_SPEED_INPUTS }>::new();
    for &gpio in pins::speed_input_gpios(config.input_pin_count) {
        // capacity matches the pin table
        let _ = speed_inputs.push(input(gpio)?);
    }
    let button = input(pins::BUTTON_GPIO)?;

    info!(
        "hw_init: speed pulse GPIO{}, {} speed inputs, oscillation {}",
        pins::SPEED_PULSE_GPIO,
        speed_inputs.len(),
        if oscillation_pulse.is_some() { "fitted" } else { "absent" }
    );

    Ok(Board {
        speed_pulse,
        oscillation_pulse,
        inputs: PhysicalInputs::new(speed_inputs, oscillation_input, button),
    })
}

#[cfg(target_os = "espidf")]
fn output(gpio: i32) -> Result<OutputDriver, HwInitError> {
    // SAFETY: each GPIO number in `pins` is claimed exactly once, here.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    let mut driver = PinDriver::output(pin).map_err(|_| HwInitError::OutputConfigFailed(gpio))?;
    driver
        .set_low()
        .map_err(|_| HwInitError::OutputConfigFailed(gpio))?;
    Ok(driver)
}

#[cfg(target_os = "espidf")]
fn input(gpio: i32) -> Result<InputDriver, HwInitError> {
    // SAFETY: as above.
    let pin = unsafe { AnyIOPin::new(gpio) };
    let mut driver = PinDriver::input(pin).map_err(|_| HwInitError::InputConfigFailed(gpio))?;
    driver
        .set_pull(Pull::Up)
        .map_err(|_| HwInitError::InputConfigFailed(gpio))?;
    Ok(driver)
}
