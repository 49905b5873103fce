//! Per-connection session state

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::connection::Connection;
use crate::core::events::ServerEvent;

/// Session lifecycle: `Anonymous -> LoggedIn -> Disconnected` (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Anonymous,
    LoggedIn,
    Disconnected,
}

/// Public per-user state, broadcast to room peers on every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub color: String,
    pub pitch: i32,
    pub speed: i32,
}

pub struct Session {
    /// Opaque id, stable for the connection's lifetime
    pub guid: String,
    /// Owned transport handle, released on disconnect
    pub connection: Connection,
    pub phase: Phase,
    /// Preference recorded by the sanitize command; chat text is stripped
    /// regardless of its value
    pub sanitize_enabled: bool,
    /// Permission level gating command access
    pub runlevel: u8,
    pub profile: Profile,
    /// Back-reference to the joined room, present exactly while LoggedIn
    pub room: Option<String>,
}

impl Session {
    /// Create a session for a freshly accepted connection. The color is
    /// drawn from the palette immediately; the rest of the profile is
    /// populated at login.
    pub fn new(connection: Connection, palette: &[String]) -> Self {
        let color = palette
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();
        Self {
            guid: Uuid::new_v4().to_string(),
            connection,
            phase: Phase::Anonymous,
            sanitize_enabled: true,
            runlevel: 0,
            profile: Profile {
                name: String::new(),
                color,
                pitch: 0,
                speed: 0,
            },
            room: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.phase == Phase::LoggedIn
    }

    /// Direct reply to this session's own client
    pub fn reply(&self, event: ServerEvent) -> bool {
        self.connection.send(event)
    }
}
