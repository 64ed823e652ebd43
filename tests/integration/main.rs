//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises a subsystem against the mock adapters in
//! `mock_hw`. All tests run on the host with no hardware attached.

mod mock_hw;
mod service_tests;
