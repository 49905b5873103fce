//! Server configuration module
//!
//! Room preference snapshots and the color palette are loaded once at process
//! start from a JSON settings file; host/port may be overridden through the
//! environment. Everything here is read-only after startup.

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SETTINGS_PATH};
use crate::error::{Result, RoomcastError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;

/// Default for a pitch/speed range: a literal value or a uniformly random
/// draw from the configured min/max (inclusive) at login time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RangeDefault {
    Value(i32),
    /// Accepts the literal string "random"
    Keyword(String),
}

impl RangeDefault {
    pub fn is_random(&self) -> bool {
        matches!(self, RangeDefault::Keyword(k) if k == "random")
    }
}

/// Min/max bounds plus the default used when a session logs in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangePref {
    pub min: i32,
    pub max: i32,
    pub default: RangeDefault,
}

impl RangePref {
    pub fn clamp(&self, value: i32) -> i32 {
        value.max(self.min).min(self.max)
    }
}

/// Immutable per-room preference snapshot, taken at room creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomPrefs {
    /// Maximum number of members admitted
    pub capacity: usize,
    /// Maximum sanitized display-name length
    pub name_limit: usize,
    /// Maximum sanitized talk-text length
    pub char_limit: usize,
    /// Display name assigned when the sanitized name comes out empty
    pub default_name: String,
    /// Shared secret elevating a session to the maximum runlevel;
    /// empty disables godmode entirely
    pub god_word: String,
    pub pitch: RangePref,
    pub speed: RangePref,
    /// Minimum runlevel per command name; unlisted commands default to 0
    pub runlevel: HashMap<String, u8>,
    /// Guid of the creating session, set for private rooms only
    #[serde(skip)]
    pub owner: Option<String>,
}

impl Default for RoomPrefs {
    fn default() -> Self {
        Self {
            capacity: 12,
            name_limit: 20,
            char_limit: 255,
            default_name: "Guest".to_string(),
            god_word: String::new(),
            pitch: RangePref {
                min: 0,
                max: 100,
                default: RangeDefault::Keyword("random".to_string()),
            },
            speed: RangePref {
                min: 80,
                max: 400,
                default: RangeDefault::Value(175),
            },
            runlevel: HashMap::new(),
            owner: None,
        }
    }
}

/// Process-wide settings: defaults for the two room flavors plus the palette
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Preference snapshot applied to auto-assigned rooms
    pub public: RoomPrefs,
    /// Preference snapshot applied to client-named rooms
    pub private: RoomPrefs,
    /// Colors a session may take; also the pool for random assignment
    pub palette: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public: RoomPrefs::default(),
            private: RoomPrefs::default(),
            palette: [
                "purple", "blue", "green", "red", "pink", "brown", "black", "white",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Settings {
    /// Load settings from the file named by ROOMCAST_SETTINGS (falling back
    /// to `settings.json`, and to compiled defaults when no file exists),
    /// then apply ROOMCAST_HOST / ROOMCAST_PORT overrides.
    pub fn load() -> Result<Self> {
        let path =
            env::var("ROOMCAST_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());

        let mut settings = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                RoomcastError::ConfigError(format!("failed to parse {}: {}", path, e))
            })?,
            Err(_) => {
                log::warn!("Settings file {} not found, using defaults", path);
                Settings::default()
            }
        };

        if let Ok(host) = env::var("ROOMCAST_HOST") {
            settings.host = host;
        }
        if let Some(port) = env::var("ROOMCAST_PORT").ok().and_then(|p| p.parse().ok()) {
            settings.port = port;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            return Err(RoomcastError::ConfigError(
                "palette must contain at least one color".to_string(),
            ));
        }
        for (label, prefs) in [("public", &self.public), ("private", &self.private)] {
            if prefs.capacity == 0 {
                return Err(RoomcastError::ConfigError(format!(
                    "{} room capacity must be at least 1",
                    label
                )));
            }
            for (range_label, range) in [("pitch", &prefs.pitch), ("speed", &prefs.speed)] {
                if range.min > range.max {
                    return Err(RoomcastError::ConfigError(format!(
                        "{} room {} range has min > max",
                        label, range_label
                    )));
                }
                if let RangeDefault::Keyword(keyword) = &range.default {
                    if !range.default.is_random() {
                        return Err(RoomcastError::ConfigError(format!(
                            "{} room {} default {:?} is not a number or \"random\"",
                            label, range_label, keyword
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
