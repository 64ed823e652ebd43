//! Fan Control cluster (0x0202) for a multi-speed, rocking fan.
//!
//! ## Features Supported
//! - MultiSpeed (SPD) - discrete SpeedSetting / SpeedCurrent in `0..=SpeedMax`
//! - Rocking (RCK) - RockSupport / RockSetting, left-right only on this board
//!
//! PercentSetting is accepted, capped at 100 and mirrored into
//! PercentCurrent, but never drives the actuator.
//!
//! [`FanAttributes`] is the outbound half (install, mirror, read back);
//! [`FanEndpoint`] is the inbound half that vets controller writes and
//! hands them to the injected change handlers.

use std::sync::Arc;

use log::{debug, info, warn};

use super::ports::{
    AttrValue, AttributePath, AttributeStore, AttributeWriteHandler, RockChangeHandler,
    SpeedChangeHandler,
};
use crate::config::FanConfig;

/// Matter Cluster ID for Fan Control
pub const CLUSTER_ID: u32 = 0x0202;

/// Attribute IDs for the Fan Control cluster
pub mod attributes {
    pub const FAN_MODE: u32 = 0x0000;
    pub const FAN_MODE_SEQUENCE: u32 = 0x0001;
    pub const PERCENT_SETTING: u32 = 0x0002;
    pub const PERCENT_CURRENT: u32 = 0x0003;
    pub const SPEED_MAX: u32 = 0x0004;
    pub const SPEED_SETTING: u32 = 0x0005;
    pub const SPEED_CURRENT: u32 = 0x0006;
    pub const ROCK_SUPPORT: u32 = 0x0007;
    pub const ROCK_SETTING: u32 = 0x0008;
    pub const FEATURE_MAP: u32 = 0xFFFC;
}

/// Feature flags for Fan Control
pub mod features {
    pub const MULTI_SPEED: u32 = 0x01;
    pub const AUTO: u32 = 0x02;
    pub const ROCKING: u32 = 0x04;
}

/// RockSupport / RockSetting bits
pub mod rock {
    pub const LEFT_RIGHT: u8 = 0x01;
    pub const UP_DOWN: u8 = 0x02;
    pub const ROUND: u8 = 0x04;
}

/// FanModeSequence value: Off / Low / Medium / High.
pub const FAN_MODE_SEQUENCE_OFF_LOW_MED_HIGH: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FanMode {
    Off = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    On = 4,
    Auto = 5,
    Smart = 6,
}

impl FanMode {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Off,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            4 => Self::On,
            5 => Self::Auto,
            6 => Self::Smart,
            _ => return None,
        })
    }

    /// Mode reported for a given speed level.
    pub fn for_speed(level: u8) -> Self {
        if level == 0 { Self::Off } else { Self::On }
    }
}

// ───────────────────────────────────────────────────────────────
// FanAttributes
// ───────────────────────────────────────────────────────────────

/// Typed view over the Fan Control attributes of one endpoint.
#[derive(Clone)]
pub struct FanAttributes {
    store: Arc<dyn AttributeStore>,
    endpoint_id: u16,
    speed_max: u8,
    rock_support: u8,
}

impl FanAttributes {
    pub fn new(store: Arc<dyn AttributeStore>, config: &FanConfig) -> Self {
        Self {
            store,
            endpoint_id: config.fan_endpoint_id,
            speed_max: config.speed_max,
            rock_support: config.rock_support,
        }
    }

    pub fn endpoint_id(&self) -> u16 {
        self.endpoint_id
    }

    pub fn speed_max(&self) -> u8 {
        self.speed_max
    }

    pub fn rock_support(&self) -> u8 {
        self.rock_support
    }

    pub fn path(&self, attribute: u32) -> AttributePath {
        AttributePath::new(self.endpoint_id, CLUSTER_ID, attribute)
    }

    /// Create every attribute with its power-on value.
    pub fn install(&self) {
        let mut feature_map = features::MULTI_SPEED;
        if self.rock_support != 0 {
            feature_map |= features::ROCKING;
        }

        let initial = [
            (attributes::FAN_MODE, AttrValue::Enum8(FanMode::Off as u8)),
            (
                attributes::FAN_MODE_SEQUENCE,
                AttrValue::Enum8(FAN_MODE_SEQUENCE_OFF_LOW_MED_HIGH),
            ),
            (attributes::PERCENT_SETTING, AttrValue::U8(0)),
            (attributes::PERCENT_CURRENT, AttrValue::U8(0)),
            (attributes::SPEED_MAX, AttrValue::U8(self.speed_max)),
            (attributes::SPEED_SETTING, AttrValue::U8(0)),
            (attributes::SPEED_CURRENT, AttrValue::U8(0)),
            (attributes::FEATURE_MAP, AttrValue::Bitmap32(feature_map)),
        ];
        for (attr, value) in initial {
            self.store.create_attribute(self.path(attr), value);
        }
        if self.rock_support != 0 {
            self.store.create_attribute(
                self.path(attributes::ROCK_SUPPORT),
                AttrValue::Bitmap8(self.rock_support),
            );
            self.store
                .create_attribute(self.path(attributes::ROCK_SETTING), AttrValue::Bitmap8(0));
        }

        info!(
            "fan cluster: endpoint {} SpeedMax={} RockSupport=0x{:02X} FeatureMap=0x{:02X}",
            self.endpoint_id, self.speed_max, self.rock_support, feature_map
        );
    }

    /// RockSetting value representing "oscillating".
    pub fn rock_on_value(&self) -> u8 {
        if self.rock_support & rock::LEFT_RIGHT != 0 {
            rock::LEFT_RIGHT
        } else {
            // lowest supported bit
            self.rock_support & self.rock_support.wrapping_neg()
        }
    }

    pub fn speed_setting(&self) -> Option<u8> {
        self.read_u8(attributes::SPEED_SETTING)
    }

    pub fn speed_current(&self) -> Option<u8> {
        self.read_u8(attributes::SPEED_CURRENT)
    }

    pub fn rock_setting(&self) -> Option<u8> {
        self.read_u8(attributes::ROCK_SETTING)
    }

    pub fn fan_mode(&self) -> Option<FanMode> {
        self.read_u8(attributes::FAN_MODE).and_then(FanMode::from_u8)
    }

    /// Physical input moved the fan: SpeedSetting, SpeedCurrent and
    /// FanMode all follow without pulsing.
    pub fn publish_speed(&self, level: u8) -> bool {
        let setting = self.update(attributes::SPEED_SETTING, AttrValue::U8(level));
        let current = self.publish_speed_current(level);
        setting && current
    }

    /// Record a locally originated target (button cycle).
    pub fn publish_speed_setting(&self, level: u8) -> bool {
        self.update(attributes::SPEED_SETTING, AttrValue::U8(level))
    }

    /// A pulse session moved the selector.
    pub fn publish_speed_current(&self, level: u8) -> bool {
        let current = self.update(attributes::SPEED_CURRENT, AttrValue::U8(level));
        let mode = self.update(
            attributes::FAN_MODE,
            AttrValue::Enum8(FanMode::for_speed(level) as u8),
        );
        current && mode
    }

    pub fn publish_rock(&self, on: bool) -> bool {
        if self.rock_support == 0 {
            return true;
        }
        let value = if on { self.rock_on_value() } else { 0 };
        self.update(attributes::ROCK_SETTING, AttrValue::Bitmap8(value))
    }

    fn update(&self, attribute: u32, value: AttrValue) -> bool {
        let ok = self.store.update_attribute(self.path(attribute), value);
        if !ok {
            warn!(
                "fan cluster: update of 0x{:04X} to {:?} rejected",
                attribute, value
            );
        }
        ok
    }

    fn read_u8(&self, attribute: u32) -> Option<u8> {
        self.store
            .read_attribute(self.path(attribute))
            .and_then(AttrValue::as_u8)
    }
}

// ───────────────────────────────────────────────────────────────
// FanEndpoint
// ───────────────────────────────────────────────────────────────

/// Inbound write handler for the fan endpoint.
pub struct FanEndpoint {
    attrs: FanAttributes,
    speed: Arc<dyn SpeedChangeHandler>,
    rock: Arc<dyn RockChangeHandler>,
}

impl FanEndpoint {
    pub fn new(
        attrs: FanAttributes,
        speed: Arc<dyn SpeedChangeHandler>,
        rock: Arc<dyn RockChangeHandler>,
    ) -> Self {
        Self { attrs, speed, rock }
    }

    fn write_speed_setting(&self, value: &mut AttrValue) -> bool {
        let Some(requested) = value.as_u8() else {
            return false;
        };
        let level = if requested > self.attrs.speed_max {
            warn!(
                "fan cluster: SpeedSetting {} above SpeedMax, clamped to {}",
                requested, self.attrs.speed_max
            );
            self.attrs.speed_max
        } else {
            requested
        };
        *value = AttrValue::U8(level);
        info!("fan cluster: SpeedSetting -> {}", level);
        self.speed.on_speed_change(level)
    }

    fn write_fan_mode(&self, value: AttrValue) -> bool {
        let Some(mode) = value.as_u8().and_then(FanMode::from_u8) else {
            warn!("fan cluster: unknown FanMode {:?}", value);
            return false;
        };
        info!("fan cluster: FanMode -> {:?}", mode);
        let current = self.attrs.speed_setting().unwrap_or(0);
        let target = match mode {
            FanMode::Off if current != 0 => 0,
            FanMode::On if current == 0 => 1,
            _ => return true,
        };
        self.attrs
            .update(attributes::SPEED_SETTING, AttrValue::U8(target));
        self.speed.on_speed_change(target)
    }

    fn write_percent_setting(&self, value: &mut AttrValue) -> bool {
        let Some(requested) = value.as_u8() else {
            return false;
        };
        let percent = requested.min(100);
        if percent != requested {
            warn!("fan cluster: PercentSetting {} capped at 100", requested);
        }
        *value = AttrValue::U8(percent);
        debug!("fan cluster: PercentSetting {} mirrored, not actuated", percent);
        self.attrs.update(attributes::PERCENT_CURRENT, AttrValue::U8(percent));
        true
    }

    fn write_rock_setting(&self, value: &mut AttrValue) -> bool {
        let Some(requested) = value.as_u8() else {
            return false;
        };
        if self.attrs.rock_support() == 0 {
            if requested != 0 {
                warn!("fan cluster: RockSetting 0x{:02X} ignored, rocking not supported", requested);
            }
            *value = AttrValue::Bitmap8(0);
            return true;
        }
        let masked = requested & self.attrs.rock_support();
        if masked != requested {
            warn!(
                "fan cluster: RockSetting 0x{:02X} masked to 0x{:02X}",
                requested, masked
            );
        }
        *value = AttrValue::Bitmap8(masked);
        info!("fan cluster: RockSetting -> 0x{:02X}", masked);
        self.rock.on_rock_change(masked)
    }
}

impl AttributeWriteHandler for FanEndpoint {
    fn on_attribute_write(&self, path: AttributePath, value: &mut AttrValue) -> bool {
        if path.endpoint != self.attrs.endpoint_id() || path.cluster != CLUSTER_ID {
            return true;
        }
        match path.attribute {
            attributes::SPEED_SETTING => self.write_speed_setting(value),
            attributes::FAN_MODE => self.write_fan_mode(*value),
            attributes::ROCK_SETTING => self.write_rock_setting(value),
            attributes::PERCENT_SETTING => self.write_percent_setting(value),
            attributes::FAN_MODE_SEQUENCE
            | attributes::PERCENT_CURRENT
            | attributes::SPEED_MAX
            | attributes::SPEED_CURRENT
            | attributes::ROCK_SUPPORT
            | attributes::FEATURE_MAP => {
                warn!(
                    "fan cluster: write to read-only attribute 0x{:04X} rejected",
                    path.attribute
                );
                false
            }
            _ => true,
        }
    }
}
