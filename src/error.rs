//! Unified error types for the SmartFan firmware.
//!
//! A single `Error` enum that every subsystem converts into. All variants
//! are `Copy` so they pass through the reconcilers and the control loop
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Reconciler state could not be locked within the bounded wait.
    /// Carries the actuator name.
    LockTimeout(&'static str),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// The Matter attribute store refused a read or update.
    Attribute(AttributeError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// A console line did not name a known command.
    Command(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockTimeout(which) => write!(f, "{which} lock timed out"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Attribute(e) => write!(f, "attribute: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Command(msg) => write!(f, "command: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// GPIO read failed.
    GpioReadFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Attribute-store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeError {
    /// The stack rejected an `update_attribute` call.
    UpdateRejected { cluster: u32, attribute: u32 },
    /// The attribute does not exist on the endpoint.
    NotFound { cluster: u32, attribute: u32 },
    /// The attribute holds a value of an unexpected type.
    TypeMismatch,
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateRejected { cluster, attribute } => {
                write!(f, "update of 0x{cluster:04X}/0x{attribute:04X} rejected")
            }
            Self::NotFound { cluster, attribute } => {
                write!(f, "0x{cluster:04X}/0x{attribute:04X} not found")
            }
            Self::TypeMismatch => write!(f, "value type mismatch"),
        }
    }
}

impl From<AttributeError> for Error {
    fn from(e: AttributeError) -> Self {
        Self::Attribute(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
