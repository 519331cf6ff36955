//! Persistent UDP endpoint
//!
//! One connected datagram socket per device, opened at setup:
//! - TX: `send` writes one datagram to the connected peer
//! - RX task: logs anything the device (or the network) sends back
//!
//! The protocol has no responses, so inbound traffic is diagnostic only.
//! ICMP errors on a connected socket surface here as receive errors.

use super::{resolve, unspecified_local, Transport};
use crate::constants::{RECV_POLL_INTERVAL_MS, UDP_BUFFER_SIZE};
use crate::error::{BridgeError, Result};
use crate::protocol;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Connected datagram endpoint for one device
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    monitor: JoinHandle<()>,
}

impl UdpEndpoint {
    /// Resolve `host:port`, bind an ephemeral local port and connect to it
    ///
    /// Must be called within a tokio runtime.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let peer = resolve(host, port).await?;
        let socket = create_connected_socket(peer)
            .map_err(|e| BridgeError::transport(peer.to_string(), e))?;
        let socket = Arc::new(socket);

        debug!(%peer, local = ?socket.local_addr().ok(), "endpoint opened");

        let monitor = tokio::spawn(monitor_inbound(socket.clone(), peer));

        Ok(Self {
            socket,
            peer,
            monitor,
        })
    }

    /// Remote address frames are sent to
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Local address the endpoint is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| BridgeError::transport(self.peer.to_string(), e))
    }

    /// Stop the receive task and release the socket
    pub async fn close(mut self) {
        self.monitor.abort();
        // Aborted tasks resolve to a cancellation error
        let _ = (&mut self.monitor).await;
    }
}

impl Transport for UdpEndpoint {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        let sent = self
            .socket
            .send(frame)
            .await
            .map_err(|e| BridgeError::transport(self.peer.to_string(), e))?;
        if sent != frame.len() {
            return Err(BridgeError::transport(
                self.peer.to_string(),
                std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!("short datagram: {sent} of {} bytes", frame.len()),
                ),
            ));
        }
        Ok(())
    }
}

impl Drop for UdpEndpoint {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

/// Create a non-blocking UDP socket connected to `peer`
fn create_connected_socket(peer: SocketAddr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(peer), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_nonblocking(true)?;
    socket.bind(&unspecified_local(peer).into())?;
    socket.connect(&peer.into())?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Log inbound datagrams and socket errors until aborted
async fn monitor_inbound(socket: Arc<UdpSocket>, peer: SocketAddr) {
    let mut buf = [0u8; UDP_BUFFER_SIZE];
    loop {
        match socket.recv(&mut buf).await {
            Ok(len) => {
                let data = &buf[..len];
                match protocol::parse(data) {
                    Some(frame) => warn!(%peer, %frame, "unexpected datagram received"),
                    None => warn!(%peer, bytes = %protocol::hex(data), "unexpected datagram received"),
                }
            }
            Err(e) => {
                warn!(%peer, error = %e, "endpoint error received");
                // Some platforms report the same error repeatedly
                tokio::time::sleep(Duration::from_millis(RECV_POLL_INTERVAL_MS)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_endpoint_delivers_frame() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut endpoint = UdpEndpoint::connect("127.0.0.1", port).await.unwrap();
        assert_eq!(endpoint.peer().port(), port);

        endpoint.send(&[0x00, 0x05, 0x50, 0x01, 0x01]).await.unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(&buf[..len], &[0x00, 0x05, 0x50, 0x01, 0x01]);
        assert_eq!(from.port(), endpoint.local_addr().unwrap().port());

        endpoint.close().await;
    }

    #[tokio::test]
    async fn test_inbound_datagram_is_ignored() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let mut endpoint = UdpEndpoint::connect("127.0.0.1", port).await.unwrap();

        // Device talks back: must not disturb later sends
        let local = endpoint.local_addr().unwrap();
        receiver.send_to(&[0xAA, 0xBB], local).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        endpoint.send(&[0x01, 0x05, 0x50, 0x01, 0x00]).await.unwrap();
        let mut buf = [0u8; 16];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(&buf[..len], &[0x01, 0x05, 0x50, 0x01, 0x00]);
    }
}
