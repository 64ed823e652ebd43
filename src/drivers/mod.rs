//! Pulse actuator, input sampler, button gestures and board bring-up.

pub mod button;
pub mod hw_init;
pub mod inputs;
pub mod pulse;

#[cfg(test)]
pub(crate) mod test_pins;
