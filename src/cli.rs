//! Command-line interface definition using clap
//!
//! `serve` owns the devices; every other device command talks to a running
//! `serve` through the local control port.

use crate::control::Request;
use crate::protocol::{parse_channels, Rgb};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// UDP bridge for Feel@Home DIY lights and power devices
#[derive(Parser, Debug)]
#[command(name = "feelhome")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: feelhome.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Control port (overrides config)
    #[arg(long, value_name = "PORT", global = true)]
    pub control_port: Option<u16>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Open every configured device and serve control requests
    Serve,

    /// List configured devices with their effects (no bridge needed)
    Devices,

    /// Turn a device on, optionally setting attributes first
    On {
        name: String,
        #[arg(long, value_name = "0-255")]
        brightness: Option<i64>,
        /// Color as R,G,B
        #[arg(long, value_name = "R,G,B", value_parser = parse_color)]
        color: Option<[i64; 3]>,
        #[arg(long, value_name = "EFFECT")]
        effect: Option<String>,
    },

    /// Turn a device off
    Off { name: String },

    /// Set brightness without changing power state
    Brightness {
        name: String,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Set color as R,G,B
    Color {
        name: String,
        #[arg(value_parser = parse_color)]
        rgb: [i64; 3],
    },

    /// Select an effect by name
    Effect { name: String, effect: String },

    /// Show state of one or all devices
    State { name: Option<String> },

    /// Stop a running bridge
    Shutdown,
}

fn parse_color(s: &str) -> Result<[i64; 3], String> {
    parse_channels(s).map_err(|e| e.to_string())
}

impl Command {
    /// Control request for commands handled by a running bridge
    pub fn to_request(&self) -> Option<Request> {
        let req = match self {
            Command::Serve | Command::Devices => return None,
            Command::On {
                name,
                brightness,
                color,
                effect,
            } => Request {
                brightness: *brightness,
                rgb_color: *color,
                effect: effect.clone(),
                ..Request::for_device("turn_on", name)
            },
            Command::Off { name } => Request::for_device("turn_off", name),
            Command::Brightness { name, value } => Request {
                brightness: Some(*value),
                ..Request::for_device("set_brightness", name)
            },
            Command::Color { name, rgb } => Request {
                rgb_color: Some(*rgb),
                ..Request::for_device("set_color", name)
            },
            Command::Effect { name, effect } => Request {
                effect: Some(effect.clone()),
                ..Request::for_device("set_effect", name)
            },
            Command::State { name: Some(name) } => Request::for_device("state", name),
            Command::State { name: None } => Request::new("list"),
            Command::Shutdown => Request::new("shutdown"),
        };
        Some(req)
    }
}

/// One-line rendering of a color for state output
pub fn format_color(rgb: Option<Rgb>) -> String {
    rgb.map(|c| c.to_string()).unwrap_or_else(|| "-".into())
}

// =============================================================================
// Tests
// =============================================================================
