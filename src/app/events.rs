//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. The firmware logs them;
//! tests record them.

use super::fan::{FanStatus, SyncReport};
use super::ports::{PairingCode, QrCodeUrl};
use crate::fsm::CommissioningPhase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service started (carries the initial phase).
    Started(CommissioningPhase),

    PhaseChanged {
        from: CommissioningPhase,
        to: CommissioningPhase,
    },

    /// Device is not commissioned; printed once per Waiting entry.
    PairingInstructions {
        manual_code: PairingCode,
        qr_url: QrCodeUrl,
    },

    /// Still waiting for a controller.
    PairingReminder { manual_code: PairingCode },

    /// Post-commissioning sync finished.
    StateSynced(SyncReport),

    PhysicalSpeedObserved(u8),
    PhysicalOscillationObserved(bool),

    /// A pulse session reached its target.
    SpeedSettled(u8),
    OscillationToggled(bool),

    /// Short press stepped the speed; carries the new target.
    SpeedCycled(u8),

    /// Long hold removed all fabrics.
    Decommissioned,

    /// Periodic status while commissioned.
    Status(FanStatus),
}
