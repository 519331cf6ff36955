//! Effect catalog
//!
//! Each tier's catalog is composed from the Power base table plus the
//! extension layers of the tiers it builds on:
//!
//! ```text
//! Power  : base
//! Dim    : base + dim
//! RGB    : base + dim + color
//! Stripe : base + dim + color + stripe
//! Matrix : base + dim + color + matrix
//! Clock  : base + dim + color + clock
//! ```
//!
//! Catalogs are built once per tier and shared for the life of the process.

use crate::constants::{GROUP_CLOCK, GROUP_COLOR, GROUP_DIM, GROUP_MATRIX, GROUP_POWER, GROUP_STRIPE};
use crate::device::DeviceClass;
use crate::error::{BridgeError, Result};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;

/// Opcode pair that selects an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectCode {
    pub group: u8,
    pub code: u8,
}

impl EffectCode {
    pub const fn new(group: u8, code: u8) -> Self {
        Self { group, code }
    }
}

type Layer = &'static [(&'static str, EffectCode)];

const BASE: Layer = &[("static", EffectCode::new(GROUP_POWER, 0x03))];

const DIM_LAYER: Layer = &[
    ("fading", EffectCode::new(GROUP_DIM, 0x04)),
    ("strobe", EffectCode::new(GROUP_DIM, 0x05)),
];

const COLOR_LAYER: Layer = &[
    ("colorwheel", EffectCode::new(GROUP_COLOR, 0x02)),
    ("sunrise", EffectCode::new(GROUP_COLOR, 0x03)),
];

const STRIPE_LAYER: Layer = &[
    ("randompixelunicolorfade", EffectCode::new(GROUP_STRIPE, 0x04)),
    ("randompixelrandomcolorfade", EffectCode::new(GROUP_STRIPE, 0x05)),
    ("rainbow", EffectCode::new(GROUP_STRIPE, 0x06)),
    ("fire", EffectCode::new(GROUP_STRIPE, 0x07)),
];

const MATRIX_LAYER: Layer = &[("heart", EffectCode::new(GROUP_MATRIX, 0x00))];

const CLOCK_LAYER: Layer = &[("clock", EffectCode::new(GROUP_CLOCK, 0x00))];

fn layers(class: DeviceClass) -> &'static [Layer] {
    match class {
        DeviceClass::Power => &[BASE],
        DeviceClass::Dim => &[BASE, DIM_LAYER],
        DeviceClass::Rgb => &[BASE, DIM_LAYER, COLOR_LAYER],
        DeviceClass::Stripe => &[BASE, DIM_LAYER, COLOR_LAYER, STRIPE_LAYER],
        DeviceClass::Matrix => &[BASE, DIM_LAYER, COLOR_LAYER, MATRIX_LAYER],
        DeviceClass::WordClock => &[BASE, DIM_LAYER, COLOR_LAYER, CLOCK_LAYER],
    }
}

/// Effect name to opcode table of one tier
#[derive(Debug)]
pub struct EffectCatalog {
    class: DeviceClass,
    entries: BTreeMap<&'static str, EffectCode>,
}

impl EffectCatalog {
    fn build(class: DeviceClass) -> Self {
        let mut entries = BTreeMap::new();
        for layer in layers(class) {
            for &(name, code) in layer.iter() {
                let shadowed = entries.insert(name, code);
                debug_assert!(shadowed.is_none(), "effect '{name}' defined twice for {class}");
            }
        }
        Self { class, entries }
    }

    /// Shared catalog for a tier
    pub fn for_class(class: DeviceClass) -> &'static EffectCatalog {
        static CATALOGS: OnceCell<[EffectCatalog; 6]> = OnceCell::new();
        let catalogs = CATALOGS.get_or_init(|| DeviceClass::ALL.map(EffectCatalog::build));
        &catalogs[class as usize]
    }

    /// Look up an effect, returning the stored name with its opcode
    pub fn lookup(&self, name: &str) -> Result<(&'static str, EffectCode)> {
        self.entries
            .get_key_value(name)
            .map(|(&stored, &code)| (stored, code))
            .ok_or_else(|| BridgeError::UnknownEffect {
                name: name.to_string(),
                class: self.class,
            })
    }

    /// Available effect names (order is not meaningful)
    pub fn effect_list(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }
}
