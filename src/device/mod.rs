//! Device state machine
//!
//! A `Device` owns one output on a Feel@Home controller: its identity, tier,
//! transport, sequence counter and last requested state.
//!
//! Every operation follows the same step per frame:
//!
//! ```text
//! encode(seq) -> transport.send -> seq += 1 -> update local state
//! ```
//!
//! A failed send returns the error before the counter or the state move, so
//! local state only ever reflects frames that actually left the host. State is
//! optimistic: the device never confirms anything.
//!
//! Operations take `&mut self`, which serializes them per device. Separate
//! devices share nothing and can be driven concurrently.

pub mod class;
pub mod state;

pub use class::{DeviceClass, EntityKind, Features};
pub use state::{DeviceIdentity, EntityState, LightState};

use crate::effects::{EffectCatalog, EffectCode};
use crate::error::{BridgeError, Result};
use crate::protocol::{byte_param, hex, Command, Rgb};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Optional attributes of a turn-on request, as the automation host sends them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<[i64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

/// Validated turn-on attributes the tier supports
#[derive(Debug, Default)]
struct TurnOnPlan {
    color: Option<Rgb>,
    brightness: Option<u8>,
    effect: Option<(&'static str, EffectCode)>,
}

/// One Feel@Home output
#[derive(Debug)]
pub struct Device<T> {
    identity: DeviceIdentity,
    kind: EntityKind,
    class: DeviceClass,
    catalog: &'static EffectCatalog,
    state: LightState,
    seq: u8,
    transport: T,
}

impl<T: Transport> Device<T> {
    pub fn new(identity: DeviceIdentity, kind: EntityKind, class: DeviceClass, transport: T) -> Self {
        Self {
            identity,
            kind,
            class,
            catalog: EffectCatalog::for_class(class),
            state: LightState::initial(class),
            seq: 0,
            transport,
        }
    }

    /// Light entity of the given tier
    pub fn light(identity: DeviceIdentity, class: DeviceClass, transport: T) -> Self {
        Self::new(identity, EntityKind::Light, class, transport)
    }

    /// On/off switch entity
    pub fn switch(identity: DeviceIdentity, transport: T) -> Self {
        Self::new(identity, EntityKind::Switch, DeviceClass::Power, transport)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Apply the supported attributes, then send power-on
    ///
    /// Order: color, brightness, effect, power. All attributes are validated
    /// before the first frame goes out. Attributes the tier lacks are ignored.
    pub async fn turn_on(&mut self, attrs: &TurnOn) -> Result<()> {
        let plan = self.plan_turn_on(attrs)?;

        if let Some(color) = plan.color {
            self.apply_color(color).await?;
        }
        if let Some(brightness) = plan.brightness {
            self.apply_brightness(brightness).await?;
        }
        if let Some((name, code)) = plan.effect {
            self.apply_effect(name, code).await?;
        }

        self.dispatch(Command::Power(true)).await?;
        self.state.is_on = true;
        Ok(())
    }

    /// Send power-off; brightness, color and effect are kept
    pub async fn turn_off(&mut self) -> Result<()> {
        self.dispatch(Command::Power(false)).await?;
        self.state.is_on = false;
        Ok(())
    }

    /// Set brightness without changing the on/off state
    pub async fn set_brightness(&mut self, value: i64) -> Result<()> {
        self.require(self.class.is_dimmable(), "brightness")?;
        let brightness = byte_param("brightness", value)?;
        self.apply_brightness(brightness).await
    }

    /// Set color without changing the on/off state
    pub async fn set_color(&mut self, r: i64, g: i64, b: i64) -> Result<()> {
        self.require(self.class.has_color(), "rgb color")?;
        let color = Rgb::from_channels(r, g, b)?;
        self.apply_color(color).await
    }

    /// Select an effect from this tier's catalog
    pub async fn set_effect(&mut self, name: &str) -> Result<()> {
        self.require(self.class.is_dimmable(), "effects")?;
        let (name, code) = self.catalog.lookup(name)?;
        self.apply_effect(name, code).await
    }

    fn plan_turn_on(&self, attrs: &TurnOn) -> Result<TurnOnPlan> {
        let mut plan = TurnOnPlan::default();

        if let Some([r, g, b]) = attrs.rgb_color {
            if self.class.has_color() {
                plan.color = Some(Rgb::from_channels(r, g, b)?);
            } else {
                debug!(device = %self.identity.name, class = %self.class, "ignoring rgb_color");
            }
        }
        if let Some(value) = attrs.brightness {
            if self.class.is_dimmable() {
                plan.brightness = Some(byte_param("brightness", value)?);
            } else {
                debug!(device = %self.identity.name, class = %self.class, "ignoring brightness");
            }
        }
        if let Some(name) = &attrs.effect {
            if self.class.is_dimmable() {
                plan.effect = Some(self.catalog.lookup(name)?);
            } else {
                debug!(device = %self.identity.name, class = %self.class, "ignoring effect");
            }
        }
        Ok(plan)
    }

    fn require(&self, supported: bool, feature: &'static str) -> Result<()> {
        if supported {
            Ok(())
        } else {
            Err(BridgeError::Unsupported {
                class: self.class,
                feature,
            })
        }
    }

    async fn apply_brightness(&mut self, brightness: u8) -> Result<()> {
        self.dispatch(Command::Brightness(brightness)).await?;
        self.state.brightness = Some(brightness);
        Ok(())
    }

    async fn apply_color(&mut self, color: Rgb) -> Result<()> {
        self.dispatch(Command::Color(color)).await?;
        self.state.rgb_color = Some(color);
        Ok(())
    }

    async fn apply_effect(&mut self, name: &'static str, code: EffectCode) -> Result<()> {
        info!(device = %self.identity.name, effect = name, "effect requested");
        self.dispatch(Command::Effect(code)).await?;
        self.state.effect = Some(name);
        Ok(())
    }

    /// Encode, send, then advance the sequence counter
    async fn dispatch(&mut self, command: Command) -> Result<()> {
        let frame = command.encode(self.seq, self.identity.device_number)?;
        info!(
            device = %self.identity.name,
            seq = self.seq,
            addr = %self.identity.addr(),
            devicenum = self.identity.device_number,
            frame = %hex(&frame),
            "{}",
            command.name()
        );
        self.transport.send(&frame).await?;
        self.seq = self.seq.wrapping_add(1);
        Ok(())
    }

    // =========================================================================
    // Queries (local state only)
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn is_on(&self) -> bool {
        self.state.is_on
    }

    /// 1..=255, `None` below the Dim tier
    pub fn brightness(&self) -> Option<u8> {
        self.state.brightness
    }

    /// `None` below the RGB tier
    pub fn rgb_color(&self) -> Option<Rgb> {
        self.state.rgb_color
    }

    /// `None` below the Dim tier
    pub fn effect(&self) -> Option<&'static str> {
        self.state.effect
    }

    /// `None` below the Dim tier
    pub fn effect_list(&self) -> Option<Vec<&'static str>> {
        self.class
            .is_dimmable()
            .then(|| self.catalog.effect_list())
    }

    pub fn supported_features(&self) -> Features {
        self.class.features()
    }

    /// State is pushed by commands, never polled
    pub fn should_poll(&self) -> bool {
        false
    }

    /// There is no feedback channel from the device
    pub fn assumed_state(&self) -> bool {
        true
    }

    /// Sequence number the next frame will carry
    pub fn sequence(&self) -> u8 {
        self.seq
    }

    pub fn snapshot(&self) -> EntityState {
        EntityState {
            name: self.identity.name.clone(),
            kind: self.kind,
            class: self.class,
            is_on: self.state.is_on,
            brightness: self.state.brightness,
            rgb_color: self.state.rgb_color,
            effect: self.state.effect.map(str::to_string),
            effect_list: self
                .effect_list()
                .map(|list| list.into_iter().map(str::to_string).collect()),
            supported_features: self.supported_features().bits(),
            should_poll: self.should_poll(),
            assumed_state: self.assumed_state(),
            sequence: self.seq,
        }
    }
}
