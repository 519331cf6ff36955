//! Feel@Home bridge - UDP control for Feel@Home DIY lights
//!
//! Usage:
//!   feelhome serve                      Open devices and serve control requests
//!   feelhome devices                    List configured devices
//!   feelhome on NAME [--brightness N]   Drive a device through a running bridge
//!   feelhome state [NAME]               Show assumed state
//!   feelhome shutdown                   Stop a running bridge

use anyhow::{bail, Context, Result};
use clap::Parser;
use feelhome_bridge::cli::{format_color, Cli, Command};
use feelhome_bridge::config::{self, Config};
use feelhome_bridge::constants::{CONTROL_CLIENT_TIMEOUT_SECS, DEFAULT_CONTROL_PORT};
use feelhome_bridge::control::{self, Response};
use feelhome_bridge::effects::EffectCatalog;
use feelhome_bridge::logging;
use feelhome_bridge::Bridge;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let path = config::config_path(cli.config.as_deref());

    match &cli.command {
        Command::Serve => {
            let config = config::load(&path)?;
            let port = cli.control_port.unwrap_or(config.bridge.control_port);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_serve(config, port))
        }
        Command::Devices => {
            let config = config::load(&path)?;
            print_devices(&config);
            Ok(())
        }
        command => {
            let port = match cli.control_port {
                Some(port) => port,
                None => config::load(&path)
                    .map(|c| c.bridge.control_port)
                    .unwrap_or(DEFAULT_CONTROL_PORT),
            };
            run_client(command, port)
        }
    }
}

async fn run_serve(config: Config, control_port: u16) -> Result<()> {
    let bridge = Bridge::start(&config).await;
    let listener = control::bind_listener(control_port).await?;
    info!(
        port = control_port,
        devices = config.devices.len(),
        "control server listening"
    );

    // Setup shutdown handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            shutdown_clone.store(true, Ordering::SeqCst);
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown_clone.store(true, Ordering::SeqCst);
        });
    }

    let served = control::run_server_with_listener(listener, bridge.client(), shutdown).await;
    bridge.stop().await;
    served?;
    Ok(())
}

fn print_devices(config: &Config) {
    for device in &config.devices {
        let class = device.device_type.class();
        let catalog = EffectCatalog::for_class(class);
        println!(
            "{:<16} {:<16} {}:{} #{} {:?} {}",
            device.name,
            format!("{:?}", device.device_type),
            device.ip_address,
            device.port,
            device.device,
            device.device_type.kind(),
            class.features().bits(),
        );
        if class.is_dimmable() {
            println!("    effects: {}", catalog.effect_list().join(", "));
        }
    }
}

fn run_client(command: &Command, port: u16) -> Result<()> {
    let Some(req) = command.to_request() else {
        bail!("command does not use the control port");
    };

    let timeout = Duration::from_secs(CONTROL_CLIENT_TIMEOUT_SECS);
    let resp = control::send_request_blocking(port, &req, timeout)
        .with_context(|| format!("is `feelhome serve` running on port {port}?"))?;

    print_response(&resp);
    if !resp.ok {
        bail!(resp.message.unwrap_or_else(|| "request failed".into()));
    }
    Ok(())
}

fn print_response(resp: &Response) {
    for state in &resp.devices {
        println!(
            "{:<16} {:<9} {:<4} brightness={} color={} effect={} seq={}",
            state.name,
            state.class.to_string(),
            if state.is_on { "on" } else { "off" },
            state
                .brightness
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".into()),
            format_color(state.rgb_color),
            state.effect.as_deref().unwrap_or("-"),
            state.sequence,
        );
    }
}
