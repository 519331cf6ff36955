//! Capability tiers
//!
//! Tiers form a superset chain: Power -> Dim -> RGB -> {Stripe, Matrix, WordClock}.
//! Each later tier has every state field and effect of the tiers it builds on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability tier of a Feel@Home output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Power = 0,
    Dim = 1,
    Rgb = 2,
    Stripe = 3,
    Matrix = 4,
    WordClock = 5,
}

impl DeviceClass {
    /// Every tier, in discriminant order
    pub const ALL: [DeviceClass; 6] = [
        DeviceClass::Power,
        DeviceClass::Dim,
        DeviceClass::Rgb,
        DeviceClass::Stripe,
        DeviceClass::Matrix,
        DeviceClass::WordClock,
    ];

    /// Brightness and effects (Dim and above)
    pub fn is_dimmable(self) -> bool {
        !matches!(self, DeviceClass::Power)
    }

    /// RGB color (RGB and above)
    pub fn has_color(self) -> bool {
        !matches!(self, DeviceClass::Power | DeviceClass::Dim)
    }

    pub fn features(self) -> Features {
        Features {
            brightness: self.is_dimmable(),
            effect: self.is_dimmable(),
            rgb_color: self.has_color(),
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Power => "Power",
            DeviceClass::Dim => "Dim",
            DeviceClass::Rgb => "RGB",
            DeviceClass::Stripe => "Stripe",
            DeviceClass::Matrix => "Matrix",
            DeviceClass::WordClock => "WordClock",
        };
        f.write_str(name)
    }
}

/// Entity platform the device is exposed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Light,
    Switch,
}

/// Supported feature flags exposed to the automation host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Features {
    pub brightness: bool,
    pub effect: bool,
    pub rgb_color: bool,
}

impl Features {
    pub const SUPPORT_BRIGHTNESS: u32 = 1;
    pub const SUPPORT_EFFECT: u32 = 4;
    pub const SUPPORT_RGB_COLOR: u32 = 16;

    /// Host framework bitmask
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.brightness {
            bits |= Self::SUPPORT_BRIGHTNESS;
        }
        if self.effect {
            bits |= Self::SUPPORT_EFFECT;
        }
        if self.rgb_color {
            bits |= Self::SUPPORT_RGB_COLOR;
        }
        bits
    }
}
