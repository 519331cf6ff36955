//! Integration tests for the bridge
//!
//! Drives devices end to end: real UDP frames on loopback, and the control
//! plane against a dry-run bridge.

use feelhome_bridge::control::{self, Request};
use feelhome_bridge::device::{Device, DeviceClass, DeviceIdentity, TurnOn};
use feelhome_bridge::transport::{MemoryTransport, UdpEndpoint};
use feelhome_bridge::{Bridge, BridgeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

// =============================================================================
// Helpers
// =============================================================================

async fn receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

async fn recv_frame(socket: &UdpSocket) -> Vec<u8> {
    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .expect("frame not received")
        .unwrap();
    buf[..n].to_vec()
}

// =============================================================================
// UDP
// =============================================================================

#[tokio::test]
async fn test_rgb_light_turn_on_over_udp() {
    let (socket, port) = receiver().await;
    let endpoint = UdpEndpoint::connect("127.0.0.1", port).await.unwrap();
    let identity = DeviceIdentity::new("kitchen", "127.0.0.1", port, 3);
    let mut light = Device::light(identity, DeviceClass::Rgb, endpoint);

    light
        .turn_on(&TurnOn {
            brightness: Some(128),
            rgb_color: Some([255, 0, 10]),
            effect: None,
        })
        .await
        .unwrap();

    // color, brightness, then power
    assert_eq!(recv_frame(&socket).await, vec![0, 3, 0x43, 0x00, 255, 0, 10]);
    assert_eq!(recv_frame(&socket).await, vec![1, 3, 0x44, 0x00, 128]);
    assert_eq!(recv_frame(&socket).await, vec![2, 3, 0x50, 0x01, 0x01]);

    assert!(light.is_on());
    assert_eq!(light.sequence(), 3);
}

#[tokio::test]
async fn test_sequence_wraps_over_udp() {
    let (socket, port) = receiver().await;
    let endpoint = UdpEndpoint::connect("127.0.0.1", port).await.unwrap();
    let identity = DeviceIdentity::new("pump", "127.0.0.1", port, 1);
    let mut pump = Device::switch(identity, endpoint);

    let mut last = Vec::new();
    for _ in 0..256 {
        pump.turn_off().await.unwrap();
        last = recv_frame(&socket).await;
    }
    assert_eq!(last, vec![255, 1, 0x50, 0x01, 0x00]);
    assert_eq!(pump.sequence(), 0);

    pump.turn_on(&TurnOn::default()).await.unwrap();
    assert_eq!(recv_frame(&socket).await, vec![0, 1, 0x50, 0x01, 0x01]);
}

#[tokio::test]
async fn test_rejected_value_sends_nothing() {
    let (socket, port) = receiver().await;
    let endpoint = UdpEndpoint::connect("127.0.0.1", port).await.unwrap();
    let identity = DeviceIdentity::new("desk", "127.0.0.1", port, 2);
    let mut desk = Device::light(identity, DeviceClass::Dim, endpoint);

    let err = desk.set_brightness(300).await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidParameter { .. }));
    assert_eq!(desk.sequence(), 0);

    desk.set_brightness(7).await.unwrap();
    assert_eq!(recv_frame(&socket).await, vec![0, 2, 0x44, 0x00, 7]);
}

// =============================================================================
// Control plane
// =============================================================================

fn dry_run_bridge() -> (Bridge, MemoryTransport) {
    let transport = MemoryTransport::new();
    let identity = DeviceIdentity::new("strip", "192.0.2.1", 8080, 5);
    let device = Device::light(identity, DeviceClass::Stripe, transport.clone());
    (Bridge::from_devices(vec![device]), transport)
}

async fn request(port: u16, req: Request) -> control::Response {
    tokio::task::spawn_blocking(move || {
        control::send_request_blocking(port, &req, Duration::from_secs(2))
    })
    .await
    .unwrap()
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_control_round_trip() {
    let (bridge, transport) = dry_run_bridge();
    let listener = control::bind_listener(0).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let shutdown = Arc::new(AtomicBool::new(false));

    let server = tokio::spawn(control::run_server_with_listener(
        listener,
        bridge.client(),
        shutdown.clone(),
    ));

    let resp = request(
        port,
        Request {
            effect: Some("rainbow".into()),
            ..Request::for_device("set_effect", "strip")
        },
    )
    .await;
    assert!(resp.ok, "{:?}", resp.message);
    assert_eq!(resp.devices[0].effect.as_deref(), Some("rainbow"));
    assert_eq!(transport.sent()[0].as_ref(), &[0, 5, 0x53, 0x06]);

    let resp = request(
        port,
        Request {
            effect: Some("heart".into()),
            ..Request::for_device("set_effect", "strip")
        },
    )
    .await;
    assert!(!resp.ok);
    assert_eq!(
        resp.message.as_deref(),
        Some("Unknown effect 'heart' for Stripe device")
    );

    let resp = request(port, Request::new("list")).await;
    assert!(resp.ok);
    assert_eq!(resp.devices.len(), 1);
    assert_eq!(resp.devices[0].sequence, 1);

    let resp = request(port, Request::for_device("turn_off", "garage")).await;
    assert!(!resp.ok);

    let resp = request(port, Request::new("shutdown")).await;
    assert!(resp.ok);
    assert!(shutdown.load(Ordering::SeqCst));

    tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    bridge.stop().await;
}

#[test]
fn test_client_without_server() {
    // bind and drop to find a port nobody listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let err = control::send_request_blocking(port, &Request::new("list"), Duration::from_millis(200))
        .unwrap_err();
    assert!(matches!(err, BridgeError::ControlConnect { .. }));
}
