//! Application core: pure domain logic, zero I/O.
//!
//! The fan controller, the Fan Control cluster endpoint and the control
//! loop. Everything outside the chip talks to this layer through the
//! **port traits** in [`ports`].

pub mod commands;
pub mod events;
pub mod fan;
pub mod fan_cluster;
pub mod ports;
pub mod service;
