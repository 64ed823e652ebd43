//! Polled button driver with short-press and long-hold detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch (the BOOT button) with pull-up. The level
//! is sampled once per control tick by [`PhysicalInputs`](super::inputs::PhysicalInputs)
//! and fed to [`ButtonDriver::tick`], which runs the gesture state machine.
//!
//! ## Gesture detection
//!
//! | Gesture     | Condition                                      | Event        |
//! |-------------|------------------------------------------------|--------------|
//! | Short press | Held >= debounce, released before hold limit   | `ShortPress` |
//! | Long hold   | Held continuously > hold limit                 | `LongPress`  |
//!
//! A long hold re-arms its own timer, so keeping the button down fires
//! `LongPress` again only after another full hold period. Releasing after
//! a long hold never produces a short press.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Released,
    Pressed { since_ms: u32, long_fired: bool },
}

pub struct ButtonDriver {
    state: GestureState,
    debounce_ms: u32,
    hold_ms: u32,
}

impl ButtonDriver {
    pub fn new(debounce_ms: u32, hold_ms: u32) -> Self {
        Self {
            state: GestureState::Released,
            debounce_ms,
            hold_ms,
        }
    }

    /// Call from the main loop at each control tick with the sampled level.
    /// Returns a classified gesture event, if any.
    pub fn tick(&mut self, now_ms: u32, pressed: bool) -> Option<ButtonEvent> {
        match self.state {
            GestureState::Released => {
                if pressed {
                    self.state = GestureState::Pressed {
                        since_ms: now_ms,
                        long_fired: false,
                    };
                }
                None
            }

            GestureState::Pressed {
                since_ms,
                long_fired,
            } => {
                let held_ms = now_ms.wrapping_sub(since_ms);

                if !pressed {
                    self.state = GestureState::Released;
                    if !long_fired && held_ms >= self.debounce_ms {
                        return Some(ButtonEvent::ShortPress);
                    }
                    return None;
                }

                if held_ms > self.hold_ms {
                    self.state = GestureState::Pressed {
                        since_ms: now_ms,
                        long_fired: true,
                    };
                    return Some(ButtonEvent::LongPress);
                }

                None
            }
        }
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.state, GestureState::Pressed { .. })
    }
}
