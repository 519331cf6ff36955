//! Feel@Home bridge library
//!
//! Encodes device commands as small UDP frames and keeps the assumed state of
//! each configured light or power device.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod constants;
pub mod control;
pub mod device;
pub mod effects;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod transport;

pub use bridge::{Bridge, BridgeClient, Operation};
pub use config::Config;
pub use device::{Device, DeviceClass, DeviceIdentity, EntityKind, EntityState, TurnOn};
pub use effects::{EffectCatalog, EffectCode};
pub use error::{BridgeError, Result};
pub use protocol::{Command, Rgb};
pub use transport::{DeviceTransport, MemoryTransport, SendToTransport, Transport, UdpEndpoint};
