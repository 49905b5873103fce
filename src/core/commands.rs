//! Command registry and handlers
//!
//! The registry is an immutable table built once at startup, mapping command
//! names to either a passthrough marker or a handler. Handlers are pure
//! functions of an explicit [`CommandContext`]; they describe their side
//! effects as [`Effect`] values and never touch session or room state
//! directly. The dispatcher in the hub applies the effects and is the only
//! place where a handler fault is caught.

use std::collections::HashMap;

use crate::config::RoomPrefs;
use crate::constants::{GOD_RUNLEVEL, VAPORWAVE_VID};
use crate::core::events::{CommandFailReason, ServerEvent};
use crate::core::session::Profile;
use crate::error::Result;
use crate::sanitize::{sanitize, CharClass};

/// Argument vocabulary that turns the sanitize preference off
const SANITIZE_OFF_TERMS: &[&str] = &["false", "off", "disable", "disabled", "f", "no", "n"];

/// Everything a handler may read: the sender's identity and public profile,
/// the room's preference snapshot, the palette, and the sanitized positional
/// arguments.
pub struct CommandContext<'a> {
    pub guid: &'a str,
    pub args: &'a [String],
    pub profile: &'a Profile,
    pub prefs: &'a RoomPrefs,
    pub palette: &'a [String],
}

impl CommandContext<'_> {
    fn first_arg(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    fn args_joined(&self) -> String {
        self.args.join(" ")
    }
}

/// Side effects a handler may request
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fan out to every current room member
    Broadcast(ServerEvent),
    /// Direct reply to the sender only
    Reply(ServerEvent),
    /// Profile mutations; each is followed by an update broadcast
    SetName(String),
    SetColor(String),
    SetPitch(i32),
    SetSpeed(i32),
    /// Private-state mutations; never broadcast
    SetSanitize(bool),
    Elevate(u8),
}

pub type CommandHandler = fn(&CommandContext) -> Result<Vec<Effect>>;

/// Registry entry: either transformation logic or a verbatim broadcast
pub enum CommandSpec {
    Passthrough,
    Handler(CommandHandler),
}

pub struct CommandRegistry {
    table: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut table: HashMap<&'static str, CommandSpec> = HashMap::new();

        table.insert("godmode", CommandSpec::Handler(godmode));
        table.insert("sanitize", CommandSpec::Handler(toggle_sanitize));
        table.insert("joke", CommandSpec::Handler(joke));
        table.insert("fact", CommandSpec::Handler(fact));
        table.insert("backflip", CommandSpec::Handler(backflip));
        table.insert("muted", CommandSpec::Handler(muted));
        table.insert("owo", CommandSpec::Handler(owo));
        table.insert("asshole", CommandSpec::Handler(asshole));
        table.insert("img", CommandSpec::Handler(img));
        table.insert("video", CommandSpec::Handler(video));
        table.insert("iframe", CommandSpec::Handler(iframe));
        table.insert("youtube", CommandSpec::Handler(youtube));
        table.insert("color", CommandSpec::Handler(color));
        table.insert("pope", CommandSpec::Handler(pope));
        table.insert("vaporwave", CommandSpec::Handler(vaporwave));
        table.insert("unvaporwave", CommandSpec::Handler(unvaporwave));
        table.insert("name", CommandSpec::Handler(name));
        table.insert("pitch", CommandSpec::Handler(pitch));
        table.insert("speed", CommandSpec::Handler(speed));

        table.insert("linux", CommandSpec::Passthrough);
        table.insert("pawn", CommandSpec::Passthrough);
        table.insert("bees", CommandSpec::Passthrough);
        table.insert("triggered", CommandSpec::Passthrough);

        Self { table }
    }

    pub fn get(&self, command: &str) -> Option<&CommandSpec> {
        self.table.get(command)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn godmode(ctx: &CommandContext) -> Result<Vec<Effect>> {
    let success = !ctx.prefs.god_word.is_empty() && ctx.first_arg() == ctx.prefs.god_word;
    log::debug!("godmode attempt by {}: success={}", ctx.guid, success);
    if success {
        Ok(vec![Effect::Elevate(GOD_RUNLEVEL)])
    } else {
        Ok(vec![])
    }
}

fn toggle_sanitize(ctx: &CommandContext) -> Result<Vec<Effect>> {
    let arg = ctx.args_joined().to_lowercase();
    let enabled = !SANITIZE_OFF_TERMS.contains(&arg.as_str());
    Ok(vec![Effect::SetSanitize(enabled)])
}

fn joke(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::Broadcast(ServerEvent::Joke {
        guid: ctx.guid.to_string(),
        rng: rand::random(),
    })])
}

fn fact(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::Broadcast(ServerEvent::Fact {
        guid: ctx.guid.to_string(),
        rng: rand::random(),
    })])
}

fn backflip(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::Broadcast(ServerEvent::Backflip {
        guid: ctx.guid.to_string(),
        swag: ctx.first_arg() == "swag",
    })])
}

fn muted(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::Broadcast(ServerEvent::Muted {
        guid: ctx.guid.to_string(),
        target: sanitize(ctx.first_arg(), None),
    })])
}

fn owo(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::Broadcast(ServerEvent::Owo {
        guid: ctx.guid.to_string(),
        target: sanitize(ctx.first_arg(), None),
    })])
}

fn asshole(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::Broadcast(ServerEvent::Asshole {
        guid: ctx.guid.to_string(),
        target: sanitize(&ctx.args_joined(), None),
    })])
}

/// Shared validation for the three URL media commands: URL-safe character
/// class plus a mandatory http prefix, else a private invalidFormat reply.
fn media_url(ctx: &CommandContext) -> std::result::Result<String, Vec<Effect>> {
    let url = sanitize(ctx.first_arg(), Some(CharClass::UrlSafe));
    if url.starts_with("http") {
        Ok(url)
    } else {
        Err(vec![Effect::Reply(ServerEvent::CommandFail {
            reason: CommandFailReason::InvalidFormat,
        })])
    }
}

fn img(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(match media_url(ctx) {
        Ok(vid) => vec![Effect::Broadcast(ServerEvent::Img {
            guid: ctx.guid.to_string(),
            vid,
        })],
        Err(effects) => effects,
    })
}

fn video(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(match media_url(ctx) {
        Ok(vid) => vec![Effect::Broadcast(ServerEvent::Video {
            guid: ctx.guid.to_string(),
            vid,
        })],
        Err(effects) => effects,
    })
}

fn iframe(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(match media_url(ctx) {
        Ok(vid) => vec![Effect::Broadcast(ServerEvent::Iframe {
            guid: ctx.guid.to_string(),
            vid,
        })],
        Err(effects) => effects,
    })
}

fn youtube(ctx: &CommandContext) -> Result<Vec<Effect>> {
    let vid = sanitize(ctx.first_arg(), Some(CharClass::Identifier));
    // Exact video-id shape: 11 identifier characters
    if vid.chars().count() != 11 {
        return Ok(vec![Effect::Reply(ServerEvent::CommandFail {
            reason: CommandFailReason::InvalidFormat,
        })]);
    }
    Ok(vec![Effect::Broadcast(ServerEvent::Youtube {
        guid: ctx.guid.to_string(),
        vid,
    })])
}

fn color(ctx: &CommandContext) -> Result<Vec<Effect>> {
    match ctx.args.first() {
        Some(wanted) => {
            if ctx.palette.iter().any(|c| c == wanted) {
                Ok(vec![Effect::SetColor(wanted.clone())])
            } else {
                Ok(vec![])
            }
        }
        None => {
            use rand::seq::SliceRandom;
            let picked = ctx
                .palette
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or_default();
            Ok(vec![Effect::SetColor(picked)])
        }
    }
}

fn pope(_ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::SetColor("pope".to_string())])
}

fn vaporwave(ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![
        Effect::Reply(ServerEvent::Vaporwave),
        Effect::Broadcast(ServerEvent::Youtube {
            guid: ctx.guid.to_string(),
            vid: VAPORWAVE_VID.to_string(),
        }),
    ])
}

fn unvaporwave(_ctx: &CommandContext) -> Result<Vec<Effect>> {
    Ok(vec![Effect::Reply(ServerEvent::Unvaporwave)])
}

fn name(ctx: &CommandContext) -> Result<Vec<Effect>> {
    let wanted = ctx.args_joined();
    if wanted.chars().count() > ctx.prefs.name_limit {
        return Ok(vec![]);
    }
    let mut name = sanitize(&wanted, Some(CharClass::Identifier));
    if name.is_empty() {
        name = ctx.prefs.default_name.clone();
    }
    Ok(vec![Effect::SetName(name)])
}

fn pitch(ctx: &CommandContext) -> Result<Vec<Effect>> {
    match ctx.first_arg().parse::<i32>() {
        Ok(value) => Ok(vec![Effect::SetPitch(ctx.prefs.pitch.clamp(value))]),
        Err(_) => Ok(vec![]),
    }
}

fn speed(ctx: &CommandContext) -> Result<Vec<Effect>> {
    match ctx.first_arg().parse::<i32>() {
        Ok(value) => Ok(vec![Effect::SetSpeed(ctx.prefs.speed.clamp(value))]),
        Err(_) => Ok(vec![]),
    }
}
