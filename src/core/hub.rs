//! The hub: all mutable server state plus the inbound-event dispatcher
//!
//! Sessions, the room directory, and the ban list live together behind one
//! mutex. Each inbound event locks the hub, runs to completion, and unlocks,
//! which is what makes the join/leave/reclaim invariants checkable within a
//! single operation: no other writer can interleave.

use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::ban::BanGuard;
use crate::config::{RangeDefault, RangePref, Settings};
use crate::constants::MALICIOUS_PLACEHOLDER;
use crate::core::commands::{CommandContext, CommandRegistry, CommandSpec, Effect};
use crate::core::connection::Connection;
use crate::core::events::{
    CommandFailReason, InboundEnvelope, LoginData, LoginFailReason, ServerEvent,
};
use crate::core::room::RoomDirectory;
use crate::core::session::{Phase, Profile, Session};
use crate::error::{Result, RoomcastError};
use crate::sanitize::{sanitize, CharClass};

pub struct Hub {
    settings: Settings,
    registry: CommandRegistry,
    pub ban: BanGuard,
    sessions: HashMap<String, Session>,
    directory: RoomDirectory,
}

impl Hub {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            registry: CommandRegistry::new(),
            ban: BanGuard::new(),
            sessions: HashMap::new(),
            directory: RoomDirectory::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self, guid: &str) -> Option<&Session> {
        self.sessions.get(guid)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Accept a new connection and create its anonymous session
    pub fn connect(
        &mut self,
        sender: mpsc::UnboundedSender<ServerEvent>,
        addr: Option<SocketAddr>,
    ) -> String {
        let session = Session::new(Connection::new(sender, addr), &self.settings.palette);
        let guid = session.guid.clone();
        info!(target: "access", "connect guid={} ip={}", guid, session.connection.describe_addr());
        self.sessions.insert(guid.clone(), session);
        guid
    }

    /// Route one inbound frame to its handler
    pub fn handle_event(&mut self, guid: &str, envelope: InboundEnvelope) {
        match envelope.event.as_str() {
            "login" => self.login(guid, &envelope.data),
            "talk" => self.talk(guid, &envelope.data),
            "command" => self.command(guid, &envelope.data),
            other => debug!("ignoring unknown event {:?} from {}", other, guid),
        }
    }

    /// Anonymous -> LoggedIn transition
    pub fn login(&mut self, guid: &str, data: &Value) {
        let session = match self.sessions.get(guid) {
            Some(s) => s,
            None => return,
        };
        // Idempotent guard: repeated logins and post-disconnect logins no-op
        if session.phase != Phase::Anonymous {
            return;
        }
        // Malformed payload is dropped, not answered
        if !data.is_object() {
            debug!("dropping malformed login from {}", guid);
            return;
        }
        let login: LoginData = serde_json::from_value(data.clone()).unwrap_or_default();
        info!("login guid={}", guid);

        let requested = login.room.as_deref().unwrap_or("");
        let room_specified = !requested.is_empty();
        debug!("login guid={} roomSpecified={}", guid, room_specified);

        // Resolve the target id and the preference snapshot that will govern
        // it, without creating anything yet: a failed login must not leave an
        // empty room behind.
        let (rid, prefs) = if room_specified {
            let rid = sanitize(requested, Some(CharClass::Identifier));
            if rid.is_empty() {
                self.reply(guid, ServerEvent::LoginFail {
                    reason: LoginFailReason::NameMal,
                });
                return;
            }
            match self.directory.get(&rid) {
                Some(room) if room.is_full() => {
                    debug!("loginFail guid={} reason=full", guid);
                    self.reply(guid, ServerEvent::LoginFail {
                        reason: LoginFailReason::Full,
                    });
                    return;
                }
                Some(room) => {
                    let prefs = room.prefs.clone();
                    (rid, prefs)
                }
                None => (rid, self.settings.private.clone()),
            }
        } else {
            (String::new(), self.settings.public.clone())
        };

        let mut name = sanitize(login.name.as_deref().unwrap_or(""), Some(CharClass::Identifier));
        if name.is_empty() {
            name = prefs.default_name.clone();
        }
        if name.chars().count() > prefs.name_limit {
            debug!("loginFail guid={} reason=nameLength", guid);
            self.reply(guid, ServerEvent::LoginFail {
                reason: LoginFailReason::NameLength,
            });
            return;
        }

        // Materialize the room and admit the session
        let rid = if room_specified {
            match self.directory.resolve_or_create_private(&rid, guid, &self.settings.private) {
                Ok(room) => room.id.clone(),
                Err(_) => {
                    self.reply(guid, ServerEvent::LoginFail {
                        reason: LoginFailReason::Full,
                    });
                    return;
                }
            }
        } else {
            self.directory.resolve_public_room(&self.settings.public)
        };

        let admitted = match self.directory.get_mut(&rid) {
            Some(room) => room.add_member(guid.to_string()).is_ok(),
            None => false,
        };
        if !admitted {
            self.directory.reclaim(&rid);
            self.reply(guid, ServerEvent::LoginFail {
                reason: LoginFailReason::Full,
            });
            return;
        }

        let pitch = resolve_range_default(&prefs.pitch);
        let speed = resolve_range_default(&prefs.speed);
        let profile = match self.sessions.get_mut(guid) {
            Some(session) => {
                session.profile.name = name;
                session.profile.pitch = pitch;
                session.profile.speed = speed;
                session.room = Some(rid.clone());
                session.phase = Phase::LoggedIn;
                session.profile.clone()
            }
            None => return,
        };

        // Existing members render the newcomer...
        self.broadcast_to_room(&rid, &ServerEvent::Update {
            guid: guid.to_string(),
            user_public: profile,
        });
        // ...and the newcomer bootstraps its view of the room
        let snapshot = self.room_snapshot(&rid);
        let is_owner = self
            .directory
            .get(&rid)
            .map_or(false, |room| room.prefs.owner.as_deref() == Some(guid));
        let is_public = self.directory.is_public(&rid);
        self.reply(guid, ServerEvent::UpdateAll {
            users_public: snapshot,
        });
        self.reply(guid, ServerEvent::Room {
            room: rid,
            is_owner,
            is_public,
        });
    }

    /// Chat text fan-out
    pub fn talk(&mut self, guid: &str, data: &Value) {
        let rid = match self.logged_in_room(guid) {
            Some((rid, _)) => rid,
            None => return,
        };

        let raw = if data.is_object() {
            match data.get("text") {
                None | Some(Value::Null) => return,
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            }
        } else {
            // Shape abuse becomes a flagged placeholder instead of an error
            MALICIOUS_PLACEHOLDER.to_string()
        };
        debug!("talk guid={} len={}", guid, raw.len());

        // Chat text is stripped unconditionally; the session's sanitize
        // preference has no bearing on what peers receive
        let text = sanitize(&raw, None);

        let char_limit = match self.directory.get(&rid) {
            Some(room) => room.prefs.char_limit,
            None => return,
        };
        let len = text.chars().count();
        if len == 0 || len > char_limit {
            return;
        }

        self.broadcast_to_room(&rid, &ServerEvent::Talk {
            guid: guid.to_string(),
            text,
        });
    }

    /// Command dispatch: shape validation, sanitization, authorization,
    /// registry lookup, effect application
    pub fn command(&mut self, guid: &str, data: &Value) {
        let rid = match self.logged_in_room(guid) {
            Some((rid, _)) => rid,
            None => return,
        };

        let list = match data.get("list").and_then(Value::as_array) {
            Some(list) if !list.is_empty() => list,
            _ => {
                warn!("malicious command shape from {}", guid);
                self.broadcast_to_room(&rid, &ServerEvent::Talk {
                    guid: guid.to_string(),
                    text: MALICIOUS_PLACEHOLDER.to_string(),
                });
                return;
            }
        };

        let tokens: Vec<String> = list
            .iter()
            .map(|v| {
                let raw = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                sanitize(&raw, Some(CharClass::Identifier))
            })
            .collect();
        let name = tokens[0].to_lowercase();
        let args = &tokens[1..];
        debug!("command guid={} name={} args={:?}", guid, name, args);

        let threshold = self
            .directory
            .get(&rid)
            .and_then(|room| room.prefs.runlevel.get(&name).copied())
            .unwrap_or(0);
        let runlevel = self.sessions.get(guid).map_or(0, |s| s.runlevel);
        if runlevel < threshold {
            self.reply(guid, ServerEvent::CommandFail {
                reason: CommandFailReason::Runlevel,
            });
            return;
        }

        let handler = match self.registry.get(&name) {
            Some(CommandSpec::Passthrough) => {
                if let Some(event) = ServerEvent::passthrough(&name, guid) {
                    self.broadcast_to_room(&rid, &event);
                }
                return;
            }
            Some(CommandSpec::Handler(handler)) => *handler,
            None => {
                debug!("commandFail guid={} name={} reason=unknown", guid, name);
                self.reply(guid, ServerEvent::CommandFail {
                    reason: CommandFailReason::Unknown,
                });
                return;
            }
        };

        let outcome = {
            let session = match self.sessions.get(guid) {
                Some(s) => s,
                None => return,
            };
            let room = match self.directory.get(&rid) {
                Some(r) => r,
                None => return,
            };
            let ctx = CommandContext {
                guid,
                args,
                profile: &session.profile,
                prefs: &room.prefs,
                palette: &self.settings.palette,
            };
            handler(&ctx)
        };

        match outcome {
            Ok(effects) => self.apply_effects(guid, &rid, effects),
            Err(e) => {
                // Fault isolation boundary: the sender learns nothing beyond
                // "unknown", the room sees no effect
                debug!("commandFail guid={} name={} error={}", guid, name, e);
                self.reply(guid, ServerEvent::CommandFail {
                    reason: CommandFailReason::Unknown,
                });
            }
        }
    }

    /// LoggedIn -> Disconnected transition; cleanup is unconditional
    pub fn disconnect(&mut self, guid: &str) {
        let (ip, port, rid) = match self.sessions.get(guid) {
            Some(session) => (
                session.connection.describe_addr(),
                session.connection.describe_port(),
                session.room.clone(),
            ),
            // Already removed: repeated disconnect signals are ignored
            None => return,
        };
        info!(target: "access", "disconnect guid={} ip={} port={}", guid, ip, port);

        if let Some(rid) = rid {
            self.leave_room(guid, &rid);
        }
        if let Some(mut session) = self.sessions.remove(guid) {
            session.phase = Phase::Disconnected;
        }
    }

    /// Leave broadcast, membership removal, then synchronous reclaim if the
    /// room emptied. No-op when the session is not a member.
    fn leave_room(&mut self, guid: &str, rid: &str) {
        let is_member = self
            .directory
            .get(rid)
            .map_or(false, |room| room.has_member(guid));
        if !is_member {
            return;
        }

        self.broadcast_to_room(rid, &ServerEvent::Leave {
            guid: guid.to_string(),
        });
        if let Some(room) = self.directory.get_mut(rid) {
            room.remove_member(guid);
        }
        if let Some(session) = self.sessions.get_mut(guid) {
            session.room = None;
        }
        self.directory.reclaim(rid);
    }

    /// Deliver an event to every current room member, in send-order
    pub fn broadcast_to_room(&self, rid: &str, event: &ServerEvent) {
        if let Some(room) = self.directory.get(rid) {
            for member in room.members() {
                if let Some(session) = self.sessions.get(member) {
                    session.connection.send(event.clone());
                }
            }
        }
    }

    /// Public profiles of every member, keyed by guid
    pub fn room_snapshot(&self, rid: &str) -> HashMap<String, Profile> {
        let mut snapshot = HashMap::new();
        if let Some(room) = self.directory.get(rid) {
            for member in room.members() {
                if let Some(session) = self.sessions.get(member) {
                    snapshot.insert(member.clone(), session.profile.clone());
                }
            }
        }
        snapshot
    }

    fn apply_effects(&mut self, guid: &str, rid: &str, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Broadcast(event) => self.broadcast_to_room(rid, &event),
                Effect::Reply(event) => self.reply(guid, event),
                Effect::SetName(name) => self.apply_profile_change(guid, rid, |p| p.name = name),
                Effect::SetColor(color) => {
                    self.apply_profile_change(guid, rid, |p| p.color = color)
                }
                Effect::SetPitch(pitch) => {
                    self.apply_profile_change(guid, rid, |p| p.pitch = pitch)
                }
                Effect::SetSpeed(speed) => {
                    self.apply_profile_change(guid, rid, |p| p.speed = speed)
                }
                Effect::SetSanitize(enabled) => {
                    if let Some(session) = self.sessions.get_mut(guid) {
                        session.sanitize_enabled = enabled;
                    }
                }
                Effect::Elevate(runlevel) => {
                    if let Some(session) = self.sessions.get_mut(guid) {
                        session.runlevel = runlevel;
                    }
                }
            }
        }
    }

    fn apply_profile_change(&mut self, guid: &str, rid: &str, change: impl FnOnce(&mut Profile)) {
        let profile = match self.sessions.get_mut(guid) {
            Some(session) => {
                change(&mut session.profile);
                session.profile.clone()
            }
            None => return,
        };
        self.broadcast_to_room(rid, &ServerEvent::Update {
            guid: guid.to_string(),
            user_public: profile,
        });
    }

    fn reply(&self, guid: &str, event: ServerEvent) {
        if let Some(session) = self.sessions.get(guid) {
            session.reply(event);
        }
    }

    /// Session's room id when it is logged in; events before login or after
    /// disconnect fall through to a no-op
    fn logged_in_room(&self, guid: &str) -> Option<(String, &Session)> {
        let session = self.sessions.get(guid)?;
        if !session.is_logged_in() {
            debug!("ignoring event from non-logged-in session {}", guid);
            return None;
        }
        let rid = session.room.clone()?;
        Some((rid, session))
    }
}

fn resolve_range_default(range: &RangePref) -> i32 {
    use rand::Rng;
    match &range.default {
        RangeDefault::Value(v) => *v,
        // Settings validation only admits the "random" keyword
        RangeDefault::Keyword(_) => rand::thread_rng().gen_range(range.min..=range.max),
    }
}

// Thread-safe hub wrapper
pub type SharedHub = Arc<Mutex<Hub>>;

pub fn create_hub(settings: Settings) -> SharedHub {
    Arc::new(Mutex::new(Hub::new(settings)))
}

/// Lock the hub, mapping poisoning into a crate error
pub fn lock_hub(hub: &SharedHub) -> Result<MutexGuard<'_, Hub>> {
    hub.lock().map_err(RoomcastError::from)
}
