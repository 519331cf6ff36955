//! Configuration management
//!
//! Config file is `feelhome.toml`, looked up in the working directory and then
//! next to the executable. `--config` overrides the lookup.
//!
//! ```toml
//! [bridge]
//! transport = "endpoint"
//! control_port = 9310
//!
//! [[device]]
//! name = "kitchen"
//! ip_address = "192.168.1.40"
//! port = 8080
//! device = 3
//! type = "RGBLight"
//! ```

use crate::constants::{DEFAULT_CONTROL_PORT, DEFAULT_DEVICE_NAME, DEFAULT_DEVICE_PORT};
use crate::device::{DeviceClass, DeviceIdentity, EntityKind};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "feelhome.toml";

// =============================================================================
// Transport selection
// =============================================================================

/// How frames leave the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// One connected UDP socket per device, opened at startup
    #[default]
    Endpoint,
    /// Fresh socket per frame, nothing kept open
    SendTo,
    /// Log and record frames, send nothing
    DryRun,
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Device type names as written in the config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    PowerLight,
    DimLight,
    #[serde(rename = "RGBLight")]
    RgbLight,
    StripeLight,
    MatrixLight,
    WordClockLight,
    /// On/off outlet exposed as a switch
    PowerDevice,
}

impl DeviceType {
    pub fn kind(self) -> EntityKind {
        match self {
            DeviceType::PowerDevice => EntityKind::Switch,
            _ => EntityKind::Light,
        }
    }

    pub fn class(self) -> DeviceClass {
        match self {
            DeviceType::PowerLight | DeviceType::PowerDevice => DeviceClass::Power,
            DeviceType::DimLight => DeviceClass::Dim,
            DeviceType::RgbLight => DeviceClass::Rgb,
            DeviceType::StripeLight => DeviceClass::Stripe,
            DeviceType::MatrixLight => DeviceClass::Matrix,
            DeviceType::WordClockLight => DeviceClass::WordClock,
        }
    }
}

/// One `[[device]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Entity name (unique across the file)
    #[serde(default = "default_device_name")]
    pub name: String,
    /// Controller host name or IP address
    pub ip_address: String,
    /// Controller UDP port
    #[serde(default = "default_device_port")]
    pub port: u16,
    /// Output number on the controller
    pub device: u8,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}

fn default_device_port() -> u16 {
    DEFAULT_DEVICE_PORT
}

impl DeviceConfig {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(&self.name, &self.ip_address, self.port, self.device)
    }
}

// =============================================================================
// Bridge Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Transport used for every device
    pub transport: TransportMode,
    /// Local TCP port of the control server
    pub control_port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::Endpoint,
            control_port: DEFAULT_CONTROL_PORT,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Parse and validate config text; `path` is only used in errors
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| BridgeError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(BridgeError::ConfigValidation {
                field: "device",
                reason: "at least one [[device]] is required".into(),
            });
        }

        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.trim().is_empty() {
                return Err(BridgeError::ConfigValidation {
                    field: "name",
                    reason: "must not be empty".into(),
                });
            }
            if !names.insert(device.name.as_str()) {
                return Err(BridgeError::ConfigValidation {
                    field: "name",
                    reason: format!("'{}' is used by more than one device", device.name),
                });
            }
            if device.ip_address.trim().is_empty() {
                return Err(BridgeError::ConfigValidation {
                    field: "ip_address",
                    reason: format!("missing for device '{}'", device.name),
                });
            }
            if device.port == 0 {
                return Err(BridgeError::ConfigValidation {
                    field: "port",
                    reason: format!("must be 1-65535 for device '{}'", device.name),
                });
            }
        }
        Ok(())
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }
}

/// Resolve the config file path
///
/// Searches in order:
/// 1. `explicit` (from `--config`)
/// 2. `feelhome.toml` in the working directory
/// 3. `feelhome.toml` next to the executable
///
/// Falls back to the working directory path so the read error names it.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let beside_exe = exe_dir.join(CONFIG_FILE_NAME);
        if beside_exe.exists() {
            return beside_exe;
        }
    }

    local
}

/// Read, parse and validate a config file
pub fn load(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| BridgeError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Config::parse(&content, path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config> {
        Config::parse(text, Path::new("test.toml"))
    }

    #[test]
    fn test_minimal_device_defaults() {
        let config = parse(
            r#"
[[device]]
ip_address = "192.168.1.40"
device = 3
type = "RGBLight"
"#,
        )
        .unwrap();

        assert_eq!(config.bridge.transport, TransportMode::Endpoint);
        assert_eq!(config.bridge.control_port, DEFAULT_CONTROL_PORT);

        let device = &config.devices[0];
        assert_eq!(device.name, "feelhome");
        assert_eq!(device.port, 8080);
        assert_eq!(device.device, 3);
        assert_eq!(device.device_type, DeviceType::RgbLight);
        assert_eq!(
            device.identity(),
            DeviceIdentity::new("feelhome", "192.168.1.40", 8080, 3)
        );
    }

    #[test]
    fn test_all_device_types() {
        let cases = [
            ("PowerLight", EntityKind::Light, DeviceClass::Power),
            ("DimLight", EntityKind::Light, DeviceClass::Dim),
            ("RGBLight", EntityKind::Light, DeviceClass::Rgb),
            ("StripeLight", EntityKind::Light, DeviceClass::Stripe),
            ("MatrixLight", EntityKind::Light, DeviceClass::Matrix),
            ("WordClockLight", EntityKind::Light, DeviceClass::WordClock),
            ("PowerDevice", EntityKind::Switch, DeviceClass::Power),
        ];
        for (name, kind, class) in cases {
            let text = format!(
                "[[device]]\nip_address = \"10.0.0.2\"\ndevice = 1\ntype = \"{name}\"\n"
            );
            let config = parse(&text).unwrap();
            assert_eq!(config.devices[0].device_type.kind(), kind, "{name}");
            assert_eq!(config.devices[0].device_type.class(), class, "{name}");
        }
    }

    #[test]
    fn test_transport_modes() {
        for (text, mode) in [
            ("endpoint", TransportMode::Endpoint),
            ("send_to", TransportMode::SendTo),
            ("dry_run", TransportMode::DryRun),
        ] {
            let config = parse(&format!(
                "[bridge]\ntransport = \"{text}\"\n[[device]]\nip_address = \"h\"\ndevice = 1\ntype = \"DimLight\"\n"
            ))
            .unwrap();
            assert_eq!(config.bridge.transport, mode);
        }
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        let err = parse("[[device]]\nip_address = \"h\"\ndevice = 1\ntype = \"LavaLamp\"\n")
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConfigParse { .. }));
    }

    #[test]
    fn test_device_number_must_fit_byte() {
        let err = parse("[[device]]\nip_address = \"h\"\ndevice = 256\ntype = \"DimLight\"\n")
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_required_fields() {
        assert!(parse("[[device]]\ndevice = 1\ntype = \"DimLight\"\n").is_err());
        assert!(parse("[[device]]\nip_address = \"h\"\ntype = \"DimLight\"\n").is_err());
        assert!(parse("[[device]]\nip_address = \"h\"\ndevice = 1\n").is_err());
    }

    #[test]
    fn test_no_devices() {
        let err = parse("").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ConfigValidation { field: "device", .. }
        ));
    }

    #[test]
    fn test_duplicate_default_names() {
        let err = parse(
            r#"
[[device]]
ip_address = "h"
device = 1
type = "DimLight"

[[device]]
ip_address = "h"
device = 2
type = "DimLight"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::ConfigValidation { field: "name", .. }));
    }

    #[test]
    fn test_port_zero_rejected() {
        let err = parse("[[device]]\nip_address = \"h\"\nport = 0\ndevice = 1\ntype = \"DimLight\"\n")
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConfigValidation { field: "port", .. }));
    }

    #[test]
    fn test_lookup_by_name() {
        let config = parse(
            r#"
[[device]]
name = "desk"
ip_address = "h"
device = 1
type = "DimLight"

[[device]]
name = "pump"
ip_address = "h"
device = 2
type = "PowerDevice"
"#,
        )
        .unwrap();
        assert_eq!(config.device("pump").unwrap().device, 2);
        assert!(config.device("garage").is_none());
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = config_path(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/feelhome.toml")).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigRead { .. }));
    }
}
