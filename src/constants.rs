//! Application-wide constants
//!
//! Wire opcodes live here next to the defaults so the encoder, the device
//! state machine and the tests agree on one table.

// =============================================================================
// Wire protocol
// =============================================================================

/// Opcode group for power and the base effect
pub const GROUP_POWER: u8 = 0x50;

/// Power toggle opcode (param: 0x01 on, 0x00 off)
pub const CODE_POWER: u8 = 0x01;

/// Power toggle parameter: on
pub const POWER_ON: u8 = 0x01;

/// Power toggle parameter: off
pub const POWER_OFF: u8 = 0x00;

/// Opcode group for dimming
pub const GROUP_DIM: u8 = 0x44;

/// Set-brightness opcode (param: brightness)
pub const CODE_BRIGHTNESS: u8 = 0x00;

/// Opcode group for color
pub const GROUP_COLOR: u8 = 0x43;

/// Set-color opcode (params: r, g, b)
pub const CODE_COLOR: u8 = 0x00;

/// Opcode group for stripe (per-pixel) effects
pub const GROUP_STRIPE: u8 = 0x53;

/// Opcode group for matrix effects
pub const GROUP_MATRIX: u8 = 0x4d;

/// Opcode group for word clock effects
pub const GROUP_CLOCK: u8 = 0x54;

/// Header bytes: seq, device number, group, code
pub const FRAME_HEADER_LEN: usize = 4;

/// Maximum parameter bytes carried by one frame
pub const MAX_FRAME_PARAMS: usize = 3;

// =============================================================================
// Device defaults
// =============================================================================

/// Default entity name when the config omits one
pub const DEFAULT_DEVICE_NAME: &str = "feelhome";

/// Default UDP port of a Feel@Home controller
pub const DEFAULT_DEVICE_PORT: u16 = 8080;

/// Brightness reported before the first brightness command
pub const INITIAL_BRIGHTNESS: u8 = 255;

/// Effect reported before the first effect command
pub const INITIAL_EFFECT: &str = "static";

// =============================================================================
// Control plane
// =============================================================================

/// Default TCP port of the local control server
pub const DEFAULT_CONTROL_PORT: u16 = 9310;

/// Accept poll interval, lets the server observe the shutdown flag (milliseconds)
pub const CONTROL_ACCEPT_TIMEOUT_MS: u64 = 250;

/// Client connect/read/write timeout (seconds)
pub const CONTROL_CLIENT_TIMEOUT_SECS: u64 = 2;

/// Largest accepted control request
pub const CONTROL_REQUEST_MAX: usize = 4096;

// =============================================================================
// Buffers / timing
// =============================================================================

/// Receive buffer for diagnostic reads on a persistent endpoint
pub const UDP_BUFFER_SIZE: usize = 512;

/// Receive poll interval, lets the diagnostic task observe shutdown (milliseconds)
pub const RECV_POLL_INTERVAL_MS: u64 = 100;

/// Pending requests per device task
pub const CHANNEL_CAPACITY: usize = 32;

/// Frames kept by the dry-run recorder
pub const DRY_RUN_HISTORY: usize = 256;
