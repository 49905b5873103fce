//! Server-wide defaults and fixed protocol values

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const WS_PATH: &str = "socket";
pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

/// Runlevel granted by a successful godmode command
pub const GOD_RUNLEVEL: u8 = 3;

/// Broadcast in place of a payload that failed shape validation, so the room
/// sees that something odd happened without leaking error details
pub const MALICIOUS_PLACEHOLDER: &str =
    "HEY EVERYONE LOOK AT ME I'M TRYING TO SCREW WITH THE SERVER LMAO";

/// Fixed video id broadcast by the vaporwave command
pub const VAPORWAVE_VID: &str = "aQkPcPqTq4M";
