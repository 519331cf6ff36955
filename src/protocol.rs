//! Feel@Home datagram protocol
//!
//! Every command is one UDP datagram with no header, length prefix or checksum:
//!
//! `[seq, device_number, group, code, params...]`
//!
//! - seq: per-device sequence number, wraps at 256
//! - device_number: address of the output on the controller
//! - group / code: opcode selecting the action
//! - params: zero to three bytes, in call order
//!
//! | Command    | group | code | params    | length |
//! |------------|-------|------|-----------|--------|
//! | power      | 0x50  | 0x01 | on/off    | 5      |
//! | brightness | 0x44  | 0x00 | value     | 5      |
//! | color      | 0x43  | 0x00 | r, g, b   | 7      |
//! | effect     | *     | *    | -         | 4      |
//!
//! Encoding is pure. Sending and sequence advancement belong to the device.

use crate::constants::{
    CODE_BRIGHTNESS, CODE_COLOR, CODE_POWER, FRAME_HEADER_LEN, GROUP_COLOR, GROUP_DIM,
    GROUP_POWER, MAX_FRAME_PARAMS, POWER_OFF, POWER_ON,
};
use crate::effects::EffectCode;
use crate::error::{BridgeError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Parameter types
// =============================================================================

/// Convert a framework integer into a frame byte
///
/// Fails with `InvalidParameter` outside 0..=255.
pub fn byte_param(field: &'static str, value: i64) -> Result<u8> {
    u8::try_from(value).map_err(|_| BridgeError::InvalidParameter { field, value })
}

/// RGB color, serialized as `[r, g, b]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Validate three framework integers as channel bytes
    pub fn from_channels(r: i64, g: i64, b: i64) -> Result<Self> {
        Ok(Self(
            byte_param("red channel", r)?,
            byte_param("green channel", g)?,
            byte_param("blue channel", b)?,
        ))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = BridgeError;

    /// Parse `r,g,b`
    fn from_str(s: &str) -> Result<Self> {
        let channels = parse_channels(s)?;
        Self::from_channels(channels[0], channels[1], channels[2])
    }
}

/// Parse `r,g,b` into raw integers, leaving range checks to the device
pub fn parse_channels(s: &str) -> Result<[i64; 3]> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let invalid = || BridgeError::InvalidColor(s.to_string());
    if parts.len() != 3 {
        return Err(invalid());
    }
    let mut out = [0i64; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|_| invalid())?;
    }
    Ok(out)
}

// =============================================================================
// Commands
// =============================================================================

/// One device command, before sequence and device number are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Power(bool),
    Brightness(u8),
    Color(Rgb),
    Effect(EffectCode),
}

impl Command {
    /// Opcode group and code
    pub fn opcode(&self) -> (u8, u8) {
        match self {
            Command::Power(_) => (GROUP_POWER, CODE_POWER),
            Command::Brightness(_) => (GROUP_DIM, CODE_BRIGHTNESS),
            Command::Color(_) => (GROUP_COLOR, CODE_COLOR),
            Command::Effect(effect) => (effect.group, effect.code),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Power(true) => "turn on",
            Command::Power(false) => "turn off",
            Command::Brightness(_) => "set brightness",
            Command::Color(_) => "set color",
            Command::Effect(_) => "set effect",
        }
    }

    /// Parameter bytes in frame order
    pub fn params(&self) -> FrameParams {
        match *self {
            Command::Power(on) => FrameParams::one(if on { POWER_ON } else { POWER_OFF }),
            Command::Brightness(value) => FrameParams::one(value),
            Command::Color(Rgb(r, g, b)) => FrameParams {
                buf: [r, g, b],
                len: 3,
            },
            Command::Effect(_) => FrameParams::default(),
        }
    }

    /// Encode with the given sequence and device number
    pub fn encode(&self, seq: u8, device_number: u8) -> Result<Bytes> {
        let (group, code) = self.opcode();
        encode(seq, device_number, group, code, &self.params())
    }
}

/// Up to three parameter bytes of a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameParams {
    buf: [u8; MAX_FRAME_PARAMS],
    len: usize,
}

impl FrameParams {
    fn one(value: u8) -> Self {
        Self {
            buf: [value, 0, 0],
            len: 1,
        }
    }
}

impl std::ops::Deref for FrameParams {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Build one frame: `[seq, device_number, group, code, params...]`
///
/// Fails with `InvalidParameter` when more than three params are given.
pub fn encode(seq: u8, device_number: u8, group: u8, code: u8, params: &[u8]) -> Result<Bytes> {
    if params.len() > MAX_FRAME_PARAMS {
        return Err(BridgeError::InvalidParameter {
            field: "parameter count",
            value: params.len() as i64,
        });
    }
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + params.len());
    buf.put_u8(seq);
    buf.put_u8(device_number);
    buf.put_u8(group);
    buf.put_u8(code);
    buf.put_slice(params);
    Ok(buf.freeze())
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Borrowed view of a datagram in frame layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub seq: u8,
    pub device_number: u8,
    pub group: u8,
    pub code: u8,
    pub params: &'a [u8],
}

/// Interpret a datagram as a frame
///
/// Returns `None` when it is too short or carries more params than any
/// command does. Only used to describe unexpected inbound traffic.
pub fn parse(data: &[u8]) -> Option<FrameView<'_>> {
    if data.len() < FRAME_HEADER_LEN || data.len() > FRAME_HEADER_LEN + MAX_FRAME_PARAMS {
        return None;
    }
    Some(FrameView {
        seq: data[0],
        device_number: data[1],
        group: data[2],
        code: data[3],
        params: &data[FRAME_HEADER_LEN..],
    })
}

impl fmt::Display for FrameView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seq={} device={} op={:#04x}/{:#04x} params=[{}]",
            self.seq,
            self.device_number,
            self.group,
            self.code,
            hex(self.params)
        )
    }
}

/// Space separated hex bytes for log lines
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
