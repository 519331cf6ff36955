//! Device identity and locally tracked state

use super::class::{DeviceClass, EntityKind};
use crate::constants::{INITIAL_BRIGHTNESS, INITIAL_EFFECT};
use crate::protocol::Rgb;
use serde::{Deserialize, Serialize};

/// Where a device lives and how it is addressed on the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub device_number: u8,
}

impl DeviceIdentity {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16, device_number: u8) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            device_number,
        }
    }

    /// `host:port` for logs and errors
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Last requested state (optimistic, never confirmed by the device)
///
/// Fields a tier does not have are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightState {
    pub is_on: bool,
    pub brightness: Option<u8>,
    pub rgb_color: Option<Rgb>,
    pub effect: Option<&'static str>,
}

impl LightState {
    pub fn initial(class: DeviceClass) -> Self {
        Self {
            is_on: false,
            brightness: class.is_dimmable().then_some(INITIAL_BRIGHTNESS),
            rgb_color: class.has_color().then_some(Rgb::WHITE),
            effect: class.is_dimmable().then_some(INITIAL_EFFECT),
        }
    }
}

/// Snapshot of everything the automation host reads from an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
    pub name: String,
    pub kind: EntityKind,
    pub class: DeviceClass,
    pub is_on: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_list: Option<Vec<String>>,
    pub supported_features: u32,
    pub should_poll: bool,
    pub assumed_state: bool,
    /// Sequence number the next frame will carry
    pub sequence: u8,
}
