//! Host-side GPIO doubles shared by the driver and reconciler unit tests.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use parking_lot::Mutex;

/// Output pin that records every level written. Clones share the log.
#[derive(Clone, Default)]
pub struct RecordingPin {
    history: Arc<Mutex<Vec<bool>>>,
}

impl RecordingPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.lock().clone()
    }

    pub fn is_high(&self) -> bool {
        self.history.lock().last().copied().unwrap_or(false)
    }

    pub fn rising_edges(&self) -> usize {
        let h = self.history.lock();
        let mut prev = false;
        let mut edges = 0;
        for &level in h.iter() {
            if level && !prev {
                edges += 1;
            }
            prev = level;
        }
        edges
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.history.lock().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.history.lock().push(true);
        Ok(())
    }
}

/// Input pin whose electrical level the test controls. Idles HIGH
/// (pull-up, switch open).
#[derive(Clone)]
pub struct ScriptedInput {
    high: Arc<AtomicBool>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            high: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Close the switch (pull the line LOW).
    pub fn assert_low(&self) {
        self.high.store(false, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.high.store(true, Ordering::SeqCst);
    }
}

impl ErrorType for ScriptedInput {
    type Error = Infallible;
}

impl InputPin for ScriptedInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high.load(Ordering::SeqCst))
    }
}

/// Pin whose every access fails.
pub struct FailingPin;

impl ErrorType for FailingPin {
    type Error = ErrorKind;
}

impl OutputPin for FailingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }
}

impl InputPin for FailingPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Err(ErrorKind::Other)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Err(ErrorKind::Other)
    }
}
