//! Local control plane (IPC) for the bridge
//!
//! Lets the CLI (or any local automation) drive the devices owned by a
//! running `feelhome serve`:
//! - TCP on 127.0.0.1 only
//! - One JSON request per connection, one JSON line back
//! - Commands: turn_on/turn_off/set_brightness/set_color/set_effect/state/list/shutdown

use crate::bridge::{BridgeClient, Operation};
use crate::constants::{CONTROL_ACCEPT_TIMEOUT_MS, CONTROL_REQUEST_MAX};
use crate::device::{EntityState, TurnOn};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

pub const CONTROL_SCHEMA: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub schema: Option<u32>,
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<[i64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

impl Request {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            schema: Some(CONTROL_SCHEMA),
            cmd: cmd.into(),
            ..Default::default()
        }
    }

    pub fn for_device(cmd: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            ..Self::new(cmd)
        }
    }

    /// Map to a device operation; `None` for bridge-level commands
    fn operation(&self) -> std::result::Result<Option<Operation>, String> {
        let missing = |field: &str| format!("{} requires '{field}'", self.cmd);
        let op = match self.cmd.to_ascii_lowercase().as_str() {
            "turn_on" | "on" => Operation::TurnOn(TurnOn {
                brightness: self.brightness,
                rgb_color: self.rgb_color,
                effect: self.effect.clone(),
            }),
            "turn_off" | "off" => Operation::TurnOff,
            "set_brightness" => {
                Operation::SetBrightness(self.brightness.ok_or_else(|| missing("brightness"))?)
            }
            "set_color" => Operation::SetColor(self.rgb_color.ok_or_else(|| missing("rgb_color"))?),
            "set_effect" => {
                Operation::SetEffect(self.effect.clone().ok_or_else(|| missing("effect"))?)
            }
            "state" if self.device.is_some() => Operation::State,
            "state" | "list" | "ping" | "shutdown" => return Ok(None),
            other => return Err(format!("unknown cmd: {other}")),
        };
        Ok(Some(op))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub schema: Option<u32>,
    pub ok: bool,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<EntityState>,
}

impl Response {
    fn ok(devices: Vec<EntityState>) -> Self {
        Self {
            schema: Some(CONTROL_SCHEMA),
            ok: true,
            message: None,
            devices,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            schema: Some(CONTROL_SCHEMA),
            ok: false,
            message: Some(message.into()),
            devices: Vec::new(),
        }
    }
}

pub async fn bind_listener(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    TcpListener::bind(addr)
        .await
        .map_err(|e| BridgeError::ControlBind { port, source: e })
}

pub async fn run_server_with_listener(
    listener: TcpListener,
    client: BridgeClient,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    while !shutdown.load(Ordering::Relaxed) {
        let accept = tokio::time::timeout(
            Duration::from_millis(CONTROL_ACCEPT_TIMEOUT_MS),
            listener.accept(),
        )
        .await;

        let Ok(Ok((stream, peer))) = accept else {
            continue;
        };

        let client = client.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client, shutdown).await {
                debug!(%peer, error = %e, "control connection failed");
            }
        });
    }

    Ok(())
}

async fn handle_connection(
    mut stream: TcpStream,
    client: BridgeClient,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    // Read up to one request
    let mut buf = vec![0u8; CONTROL_REQUEST_MAX];
    let n = stream
        .read(&mut buf)
        .await
        .map_err(|e| BridgeError::ControlProtocol {
            message: e.to_string(),
        })?;
    buf.truncate(n);

    let text = String::from_utf8_lossy(&buf);
    let text = text.trim();
    let resp = if text.is_empty() {
        Response::error("empty request")
    } else {
        match serde_json::from_str::<Request>(text) {
            Ok(req) => dispatch(&req, &client, &shutdown).await,
            Err(e) => Response::error(format!("invalid json: {e}")),
        }
    };

    let out = serde_json::to_vec(&resp).map_err(|e| BridgeError::ControlProtocol {
        message: e.to_string(),
    })?;

    let _ = stream.write_all(&out).await;
    let _ = stream.write_all(b"\n").await;
    let _ = stream.shutdown().await;
    Ok(())
}

/// Execute one request against the running devices
pub async fn dispatch(req: &Request, client: &BridgeClient, shutdown: &AtomicBool) -> Response {
    let op = match req.operation() {
        Ok(op) => op,
        Err(message) => return Response::error(message),
    };

    let result = match (op, req.device.as_deref()) {
        (Some(op), Some(device)) => client.execute(device, op).await.map(|s| vec![s]),
        (Some(_), None) => return Response::error(format!("{} requires 'device'", req.cmd)),
        (None, _) => match req.cmd.to_ascii_lowercase().as_str() {
            "shutdown" => {
                shutdown.store(true, Ordering::SeqCst);
                Ok(Vec::new())
            }
            "ping" => Ok(Vec::new()),
            _ => client.states().await,
        },
    };

    match result {
        Ok(devices) => Response::ok(devices),
        Err(e) => Response::error(e.to_string()),
    }
}

pub fn send_request_blocking(port: u16, req: &Request, timeout: Duration) -> Result<Response> {
    use std::io::{Read, Write};

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let connect_err = |e| BridgeError::ControlConnect { port, source: e };

    let mut stream = std::net::TcpStream::connect_timeout(&addr, timeout).map_err(connect_err)?;
    stream.set_read_timeout(Some(timeout)).map_err(connect_err)?;
    stream.set_write_timeout(Some(timeout)).map_err(connect_err)?;

    let body = serde_json::to_string(req).map_err(|e| BridgeError::ControlProtocol {
        message: e.to_string(),
    })?;
    stream.write_all(body.as_bytes()).map_err(connect_err)?;
    stream.write_all(b"\n").map_err(connect_err)?;
    stream.flush().map_err(connect_err)?;

    let mut out = String::new();
    stream.read_to_string(&mut out).map_err(connect_err)?;

    serde_json::from_str(out.trim()).map_err(|e| BridgeError::ControlProtocol {
        message: format!("invalid response: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_operations() {
        let mut req = Request::for_device("turn_on", "desk");
        req.brightness = Some(10);
        assert_eq!(
            req.operation().unwrap(),
            Some(Operation::TurnOn(TurnOn {
                brightness: Some(10),
                ..Default::default()
            }))
        );

        assert_eq!(
            Request::for_device("OFF", "desk").operation().unwrap(),
            Some(Operation::TurnOff)
        );
        assert_eq!(Request::new("list").operation().unwrap(), None);
        assert_eq!(Request::new("state").operation().unwrap(), None);
        assert_eq!(
            Request::for_device("state", "desk").operation().unwrap(),
            Some(Operation::State)
        );
    }

    #[test]
    fn test_missing_arguments() {
        let err = Request::for_device("set_brightness", "desk")
            .operation()
            .unwrap_err();
        assert_eq!(err, "set_brightness requires 'brightness'");
        assert!(Request::for_device("set_color", "desk").operation().is_err());
        assert!(Request::for_device("set_effect", "desk").operation().is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Request::new("reboot").operation().unwrap_err(),
            "unknown cmd: reboot"
        );
    }

    #[test]
    fn test_request_json_shape() {
        let mut req = Request::for_device("set_color", "desk");
        req.rgb_color = Some([1, 2, 3]);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"schema":1,"cmd":"set_color","device":"desk","rgb_color":[1,2,3]}"#
        );

        let parsed: Request = serde_json::from_str(r#"{"cmd":"off","device":"desk"}"#).unwrap();
        assert_eq!(parsed.schema, None);
        assert_eq!(parsed.device.as_deref(), Some("desk"));
    }
}
