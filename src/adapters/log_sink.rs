//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(phase) => {
                info!("START | phase={:?}", phase);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {:?} -> {:?}", from, to);
            }
            AppEvent::PairingInstructions {
                manual_code,
                qr_url,
            } => {
                info!("PAIR  | device not commissioned");
                info!("PAIR  | manual pairing code: {}", manual_code);
                info!("PAIR  | QR code: {}", qr_url);
                info!(
                    "PAIR  | https://project-chip.github.io/connectedhomeip/qrcode.html?data={}",
                    qr_url
                );
            }
            AppEvent::PairingReminder { manual_code } => {
                info!("PAIR  | waiting for commissioning, code {}", manual_code);
            }
            AppEvent::StateSynced(report) => {
                info!(
                    "SYNC  | speed={} oscillating={} physical_override={}",
                    report.speed, report.oscillating, report.physical_override
                );
            }
            AppEvent::PhysicalSpeedObserved(level) => {
                info!("INPUT | speed switch at {}", level);
            }
            AppEvent::PhysicalOscillationObserved(on) => {
                info!("INPUT | oscillation switch {}", on_off(*on));
            }
            AppEvent::SpeedSettled(level) => {
                info!("FAN   | speed settled at {}", level);
            }
            AppEvent::OscillationToggled(on) => {
                info!("FAN   | oscillation {}", on_off(*on));
            }
            AppEvent::SpeedCycled(level) => {
                info!("BTN   | speed cycled to {}", level);
            }
            AppEvent::Decommissioned => {
                warn!("BTN   | decommissioned, restart pairing");
            }
            AppEvent::Status(s) => {
                info!(
                    "STATUS | speed={}/{} {} | oscillation={} | pulsing={}",
                    s.speed,
                    s.target_speed,
                    on_off(s.on),
                    on_off(s.oscillating),
                    s.pulsing,
                );
            }
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}
