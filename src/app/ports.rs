//! Port traits: the hexagonal boundary between the fan core and the outside world.
//!
//! ```text
//!   Matter stack ──▶ AttributeWriteHandler ──▶ FanEndpoint ──▶ Speed/RockChangeHandler
//!   FanController ──▶ AttributeStore ──▶ Matter stack
//!   AppService ◀── InputPort · CommissioningPort · Clock ──▶ EventSink
//! ```
//!
//! The Matter stack calls in on its own thread, so every trait it touches
//! takes `&self` and requires `Send + Sync`. Ports used only by the
//! control loop take `&mut self`.

use heapless::String;

use crate::drivers::inputs::InputSnapshot;

/// Manual pairing code (11 or 21 digits).
pub type PairingCode = String<24>;
/// Onboarding QR code URL.
pub type QrCodeUrl = String<128>;

// ───────────────────────────────────────────────────────────────
// Attribute model
// ───────────────────────────────────────────────────────────────

/// Fully-qualified Matter attribute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub endpoint: u16,
    pub cluster: u32,
    pub attribute: u32,
}

impl AttributePath {
    pub const fn new(endpoint: u16, cluster: u32, attribute: u32) -> Self {
        Self {
            endpoint,
            cluster,
            attribute,
        }
    }
}

/// The attribute value types the Fan Control cluster uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue {
    U8(u8),
    Enum8(u8),
    Bitmap8(u8),
    Bitmap32(u32),
}

impl AttrValue {
    /// Narrow any 8-bit representation to its raw byte.
    pub fn as_u8(self) -> Option<u8> {
        match self {
            Self::U8(v) | Self::Enum8(v) | Self::Bitmap8(v) => Some(v),
            Self::Bitmap32(_) => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Matter stack ports (driven: domain → stack)
// ───────────────────────────────────────────────────────────────

/// Attribute storage owned by the Matter stack.
pub trait AttributeStore: Send + Sync {
    /// Push a new value and report it to subscribers. `false` when the
    /// stack rejects the update.
    fn update_attribute(&self, path: AttributePath, value: AttrValue) -> bool;

    fn read_attribute(&self, path: AttributePath) -> Option<AttrValue>;

    /// Add an attribute to the endpoint during setup.
    fn create_attribute(&self, path: AttributePath, value: AttrValue);
}

/// Commissioning state and pairing credentials.
pub trait CommissioningPort {
    fn is_commissioned(&self) -> bool;

    /// Remove all fabrics. The device must be commissioned again afterwards.
    fn decommission(&self);

    fn manual_pairing_code(&self) -> PairingCode;

    fn qr_code_url(&self) -> QrCodeUrl;
}

// ───────────────────────────────────────────────────────────────
// Matter stack callbacks (driving: stack → domain)
// ───────────────────────────────────────────────────────────────

/// Receives every attribute write before the stack commits it.
///
/// The handler may rewrite `value` in place (clamping, masking); the
/// stack stores whatever it holds on return. Returning `false` rejects
/// the write.
pub trait AttributeWriteHandler: Send + Sync {
    fn on_attribute_write(&self, path: AttributePath, value: &mut AttrValue) -> bool;
}

/// Strategy invoked when a controller changes SpeedSetting.
pub trait SpeedChangeHandler: Send + Sync {
    /// `level` is already clamped to SpeedMax.
    fn on_speed_change(&self, level: u8) -> bool;
}

/// Strategy invoked when a controller changes RockSetting.
pub trait RockChangeHandler: Send + Sync {
    /// `rock_setting` is already masked by RockSupport; non-zero means on.
    fn on_rock_change(&self, rock_setting: u8) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Board ports
// ───────────────────────────────────────────────────────────────

/// Per-tick physical input sampling.
pub trait InputPort {
    fn read_inputs(&mut self) -> InputSnapshot;
}

/// Monotonic millisecond clock. Wraps at `u32::MAX`; consumers compare
/// with `wrapping_sub`.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
