//! Device runtime
//!
//! Owns every configured device. Each device lives in its own tokio task and
//! handles one request at a time from an mpsc queue, so operations on one
//! device never interleave while separate devices run concurrently.
//!
//! ```text
//! control server ──┐
//!                  ├─> BridgeClient ──mpsc──> device task (Device<T>) ──> Transport
//! CLI / tests    ──┘                 <─oneshot── EntityState | BridgeError
//! ```

use crate::config::Config;
use crate::constants::CHANNEL_CAPACITY;
use crate::device::{Device, EntityState, TurnOn};
use crate::error::{BridgeError, Result};
use crate::transport::{DeviceTransport, Transport};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Request to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    TurnOn(TurnOn),
    TurnOff,
    SetBrightness(i64),
    SetColor([i64; 3]),
    SetEffect(String),
    /// Read state without sending anything
    State,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::TurnOn(_) => "turn_on",
            Operation::TurnOff => "turn_off",
            Operation::SetBrightness(_) => "set_brightness",
            Operation::SetColor(_) => "set_color",
            Operation::SetEffect(_) => "set_effect",
            Operation::State => "state",
        }
    }
}

struct Request {
    op: Operation,
    reply: oneshot::Sender<Result<EntityState>>,
}

/// Sender side of one device task
#[derive(Debug, Clone)]
struct DeviceHandle {
    name: String,
    tx: mpsc::Sender<Request>,
}

impl DeviceHandle {
    async fn execute(&self, op: Operation) -> Result<EntityState> {
        let closed = || BridgeError::BridgeClosed(self.name.clone());
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Request { op, reply })
            .await
            .map_err(|_| closed())?;
        response.await.map_err(|_| closed())?
    }
}

/// Cloneable access to the running devices
#[derive(Debug, Clone)]
pub struct BridgeClient {
    devices: Arc<BTreeMap<String, DeviceHandle>>,
    /// Configured devices whose transport failed to open, with the reason
    unavailable: Arc<BTreeMap<String, String>>,
}

impl BridgeClient {
    /// Run an operation on the named device and return its new state
    pub async fn execute(&self, name: &str, op: Operation) -> Result<EntityState> {
        match self.devices.get(name) {
            Some(handle) => handle.execute(op).await,
            None => match self.unavailable.get(name) {
                Some(reason) => Err(BridgeError::DeviceUnavailable {
                    name: name.to_string(),
                    reason: reason.clone(),
                }),
                None => Err(BridgeError::DeviceNotFound(name.to_string())),
            },
        }
    }

    /// State of every device, in name order
    pub async fn states(&self) -> Result<Vec<EntityState>> {
        let mut states = Vec::with_capacity(self.devices.len());
        for handle in self.devices.values() {
            states.push(handle.execute(Operation::State).await?);
        }
        Ok(states)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }
}

/// Running set of devices
pub struct Bridge {
    client: BridgeClient,
    closed: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Bridge {
    /// Open a transport for every configured device and start its task
    ///
    /// Devices are independent: one whose transport cannot be opened is
    /// logged and reported as unavailable while the others start normally.
    pub async fn start(config: &Config) -> Self {
        let mut devices = Vec::with_capacity(config.devices.len());
        let mut unavailable = BTreeMap::new();
        for entry in &config.devices {
            let identity = entry.identity();
            let transport = match DeviceTransport::open(config.bridge.transport, &identity).await {
                Ok(transport) => transport,
                Err(e) => {
                    warn!(
                        device = %identity.name,
                        addr = %identity.addr(),
                        error = %e,
                        "device unavailable"
                    );
                    unavailable.insert(identity.name, e.to_string());
                    continue;
                }
            };
            info!(
                device = %identity.name,
                addr = %identity.addr(),
                devicenum = identity.device_number,
                class = %entry.device_type.class(),
                transport = ?config.bridge.transport,
                "device ready"
            );
            devices.push(Device::new(
                identity,
                entry.device_type.kind(),
                entry.device_type.class(),
                transport,
            ));
        }
        let mut bridge = Self::from_devices(devices);
        bridge.client.unavailable = Arc::new(unavailable);
        bridge
    }

    /// Start tasks for already constructed devices
    ///
    /// Must be called within a tokio runtime.
    pub fn from_devices<T: Transport>(devices: Vec<Device<T>>) -> Self {
        let (closed, closed_rx) = watch::channel(false);
        let mut handles = BTreeMap::new();
        let mut tasks = Vec::with_capacity(devices.len());

        for device in devices {
            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            let name = device.name().to_string();
            tasks.push(tokio::spawn(run_device(device, rx, closed_rx.clone())));
            handles.insert(name.clone(), DeviceHandle { name, tx });
        }

        Self {
            client: BridgeClient {
                devices: Arc::new(handles),
                unavailable: Arc::default(),
            },
            closed,
            tasks,
        }
    }

    pub fn client(&self) -> BridgeClient {
        self.client.clone()
    }

    /// Stop every device task and release its transport
    pub async fn stop(self) {
        let _ = self.closed.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        info!("bridge stopped");
    }
}

async fn run_device<T: Transport>(
    mut device: Device<T>,
    mut requests: mpsc::Receiver<Request>,
    mut closed: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(Request { op, reply }) = request else { break };
                let op_name = op.name();
                let result = apply(&mut device, op).await;
                if let Err(e) = &result {
                    warn!(device = %device.name(), op = op_name, error = %e, "operation failed");
                }
                let _ = reply.send(result);
            }
            _ = closed.changed() => break,
        }
    }
    debug!(device = %device.name(), "device task stopped");
}

async fn apply<T: Transport>(device: &mut Device<T>, op: Operation) -> Result<EntityState> {
    match op {
        Operation::TurnOn(attrs) => device.turn_on(&attrs).await?,
        Operation::TurnOff => device.turn_off().await?,
        Operation::SetBrightness(value) => device.set_brightness(value).await?,
        Operation::SetColor([r, g, b]) => device.set_color(r, g, b).await?,
        Operation::SetEffect(name) => device.set_effect(&name).await?,
        Operation::State => {}
    }
    Ok(device.snapshot())
}
