//! Connectionless transport
//!
//! Resolves the host and binds an ephemeral socket on every send.
//! Nothing is kept between sends, so there is nothing to release.

use super::{resolve, unspecified_local, Transport};
use crate::error::{BridgeError, Result};
use tokio::net::UdpSocket;

/// Stateless `sendto` transport
#[derive(Debug, Clone)]
pub struct SendToTransport {
    host: String,
    port: u16,
}

impl SendToTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Transport for SendToTransport {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        let peer = resolve(&self.host, self.port).await?;
        let map_err = |e| BridgeError::transport(peer.to_string(), e);

        let socket = UdpSocket::bind(unspecified_local(peer)).await.map_err(map_err)?;
        socket.send_to(frame, peer).await.map_err(map_err)?;
        Ok(())
    }
}
