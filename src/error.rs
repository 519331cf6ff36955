//! Centralized error types for the bridge
//!
//! All bridge errors are represented by the `BridgeError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, BridgeError>`.

use crate::device::DeviceClass;
use std::path::PathBuf;
use thiserror::Error;

/// All bridge errors
#[derive(Debug, Error)]
pub enum BridgeError {
    // === Device operations ===
    /// Value does not fit the unsigned byte a frame field carries
    #[error("Invalid {field}: {value} is outside 0..=255")]
    InvalidParameter { field: &'static str, value: i64 },

    /// Color text is not three comma separated integers
    #[error("Invalid color '{0}': expected R,G,B")]
    InvalidColor(String),

    /// Effect name not present in the catalog of the device's tier
    #[error("Unknown effect '{name}' for {class} device")]
    UnknownEffect { name: String, class: DeviceClass },

    /// Operation not offered by the device's tier
    #[error("{class} device does not support {feature}")]
    Unsupported {
        class: DeviceClass,
        feature: &'static str,
    },

    // === Network ===
    /// Resolving, binding or sending to a device failed
    #[error("Cannot send to {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // === Config ===
    /// Config file could not be read
    #[error("Cannot read config: {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected shape
    #[error("Invalid config {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// Config parsed but a value is unusable
    #[error("Invalid {field}: {reason}")]
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// No device with this name is configured
    #[error("No device named '{0}'")]
    DeviceNotFound(String),

    /// Device is configured but its transport could not be set up
    #[error("Device '{name}' is unavailable: {reason}")]
    DeviceUnavailable { name: String, reason: String },

    /// Device task stopped before answering
    #[error("Device '{0}' is no longer running")]
    BridgeClosed(String),

    // === Control plane ===
    /// Failed to bind control server port
    #[error("Cannot bind control port {port}")]
    ControlBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Failed to connect to control server
    #[error("Cannot connect to control port {port} (is `feelhome serve` running?)")]
    ControlConnect {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Control protocol error
    #[error("Control protocol error: {message}")]
    ControlProtocol { message: String },
}

impl BridgeError {
    /// Wrap an I/O failure talking to `addr`
    pub fn transport(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transport {
            addr: addr.into(),
            source,
        }
    }
}

/// Alias for Result with BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_invalid_parameter_message() {
        let err = BridgeError::InvalidParameter {
            field: "brightness",
            value: 300,
        };
        assert_eq!(err.to_string(), "Invalid brightness: 300 is outside 0..=255");
    }

    #[test]
    fn test_transport_keeps_source() {
        let err = BridgeError::transport(
            "10.0.0.2:8080",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert!(err.to_string().starts_with("Cannot send to 10.0.0.2:8080"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unknown_effect_names_class() {
        let err = BridgeError::UnknownEffect {
            name: "heart".into(),
            class: DeviceClass::Stripe,
        };
        assert_eq!(err.to_string(), "Unknown effect 'heart' for Stripe device");
    }

    #[test]
    fn test_invalid_color_message() {
        let err = BridgeError::InvalidColor("red".into());
        assert_eq!(err.to_string(), "Invalid color 'red': expected R,G,B");
    }
}
