//! Reconciliation state machines for the two pulse actuators.
//!
//! Speed and oscillation are electrically independent and each sits
//! behind its own lock, so one never waits on the other.

pub mod oscillation;
pub mod speed;

/// Result of feeding a physical-input reading to a reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// Expected and current were overwritten with the observed value.
    Applied,
    /// Observation matched the believed state.
    Unchanged,
    /// A pulse owns the actuator; observation ignored.
    Busy,
    /// Lock held by the other thread; retry next tick.
    Contended,
}
