//! Wire types for client/server events
//!
//! Inbound frames arrive as a raw `{event, data}` envelope so each event can
//! apply its own malformed-payload policy instead of failing the whole frame.
//! Outbound traffic is the single [`ServerEvent`] enum; its serialized form
//! is `{"event": <name>, "data": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::core::session::Profile;

/// Raw inbound frame; `data` stays untyped until the event is dispatched
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Typed payload of a login event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginFailReason {
    NameMal,
    Full,
    NameLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandFailReason {
    InvalidFormat,
    Runlevel,
    Unknown,
}

/// Every event the server emits, to one connection or as a room broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    // Session lifecycle replies
    LoginFail {
        reason: LoginFailReason,
    },
    CommandFail {
        reason: CommandFailReason,
    },
    #[serde(rename_all = "camelCase")]
    Room {
        room: String,
        is_owner: bool,
        is_public: bool,
    },
    #[serde(rename_all = "camelCase")]
    UpdateAll {
        users_public: HashMap<String, Profile>,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        guid: String,
        user_public: Profile,
    },
    Leave {
        guid: String,
    },
    Ban,

    // Chat
    Talk {
        guid: String,
        text: String,
    },

    // Command broadcasts
    Joke {
        guid: String,
        rng: f64,
    },
    Fact {
        guid: String,
        rng: f64,
    },
    Backflip {
        guid: String,
        swag: bool,
    },
    Muted {
        guid: String,
        target: String,
    },
    Owo {
        guid: String,
        target: String,
    },
    Asshole {
        guid: String,
        target: String,
    },
    Img {
        guid: String,
        vid: String,
    },
    Video {
        guid: String,
        vid: String,
    },
    Iframe {
        guid: String,
        vid: String,
    },
    Youtube {
        guid: String,
        vid: String,
    },
    Vaporwave,
    Unvaporwave,

    // Passthrough commands: the name goes out verbatim with the sender only
    Linux {
        guid: String,
    },
    Pawn {
        guid: String,
    },
    Bees {
        guid: String,
    },
    Triggered {
        guid: String,
    },
}

impl ServerEvent {
    /// Broadcast event for a passthrough command, if `name` is one
    pub fn passthrough(name: &str, guid: &str) -> Option<ServerEvent> {
        let guid = guid.to_string();
        match name {
            "linux" => Some(ServerEvent::Linux { guid }),
            "pawn" => Some(ServerEvent::Pawn { guid }),
            "bees" => Some(ServerEvent::Bees { guid }),
            "triggered" => Some(ServerEvent::Triggered { guid }),
            _ => None,
        }
    }
}
