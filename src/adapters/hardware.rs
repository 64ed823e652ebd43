//! Hardware adapter: bridges the physical input lines to [`InputPort`].
//!
//! Generic over the pin type so the same adapter drives ESP-IDF
//! `PinDriver`s on the board and scripted pins in host tests.

use embedded_hal::digital::InputPin;

use crate::app::ports::InputPort;
use crate::drivers::inputs::{InputSnapshot, PhysicalInputs};

pub struct HardwareAdapter<I: InputPin> {
    inputs: PhysicalInputs<I>,
}

impl<I: InputPin> HardwareAdapter<I> {
    pub fn new(inputs: PhysicalInputs<I>) -> Self {
        Self { inputs }
    }
}

impl<I: InputPin> InputPort for HardwareAdapter<I> {
    fn read_inputs(&mut self) -> InputSnapshot {
        self.inputs.sample()
    }
}
