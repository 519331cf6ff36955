//! Transport abstraction for outbound frames
//!
//! A transport delivers exactly one best-effort datagram per `send` to the
//! device's `host:port`. It does not retry, wait for acknowledgements or
//! parse responses.
//!
//! Implementations:
//! - `UdpEndpoint`: connected socket opened once at device setup, closed on drop.
//!   Inbound datagrams and socket errors are logged, never returned.
//! - `SendToTransport`: stateless, resolves and binds on every send.
//! - `MemoryTransport`: records frames instead of sending (dry run, tests).
//!
//! # Adding a new transport
//!
//! 1. Create `transport/my_transport.rs`
//! 2. Implement the `Transport` trait
//! 3. Add a `DeviceTransport` variant if it should be selectable from config

pub mod memory;
pub mod send_to;
pub mod udp;

pub use memory::MemoryTransport;
pub use send_to::SendToTransport;
pub use udp::UdpEndpoint;

use crate::config::TransportMode;
use crate::constants::DRY_RUN_HISTORY;
use crate::device::DeviceIdentity;
use crate::error::{BridgeError, Result};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Sends frames to one device
///
/// `send` must complete (or fail) before the caller advances the sequence
/// counter, so a failed send leaves the device untouched.
pub trait Transport: Send + 'static {
    /// Deliver one datagram
    fn send(&mut self, frame: &[u8]) -> impl Future<Output = Result<()>> + Send;
}

/// Resolve `host:port` to the first socket address
pub(crate) async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addr = format!("{host}:{port}");
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| BridgeError::transport(&addr, e))?;
    addrs.next().ok_or_else(|| {
        BridgeError::transport(
            &addr,
            std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no address"),
        )
    })
}

/// Wildcard address with an ephemeral port, in the family of `peer`
pub(crate) fn unspecified_local(peer: SocketAddr) -> SocketAddr {
    match peer.ip() {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

/// Transport selected by configuration
#[derive(Debug)]
pub enum DeviceTransport {
    Endpoint(UdpEndpoint),
    SendTo(SendToTransport),
    Memory(MemoryTransport),
}

impl DeviceTransport {
    /// Acquire the transport for a device
    ///
    /// For `TransportMode::Endpoint` this opens the socket; it is released
    /// when the transport is dropped.
    pub async fn open(mode: TransportMode, identity: &DeviceIdentity) -> Result<Self> {
        Ok(match mode {
            TransportMode::Endpoint => {
                Self::Endpoint(UdpEndpoint::connect(&identity.host, identity.port).await?)
            }
            TransportMode::SendTo => {
                Self::SendTo(SendToTransport::new(identity.host.clone(), identity.port))
            }
            TransportMode::DryRun => Self::Memory(MemoryTransport::bounded(DRY_RUN_HISTORY)),
        })
    }
}

impl Transport for DeviceTransport {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        match self {
            Self::Endpoint(t) => t.send(frame).await,
            Self::SendTo(t) => t.send(frame).await,
            Self::Memory(t) => t.send(frame).await,
        }
    }
}
