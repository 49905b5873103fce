//! Command dispatch: authorization, validation, effects

use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use roomcast::config::Settings;
use roomcast::constants::{GOD_RUNLEVEL, VAPORWAVE_VID};
use roomcast::core::events::{CommandFailReason, ServerEvent};
use roomcast::core::hub::Hub;

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.private.god_word = "hunter2".to_string();
    settings
}

fn connect(hub: &mut Hub) -> (String, UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = unbounded_channel();
    let guid = hub.connect(tx, None);
    (guid, rx)
}

fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn send_command(hub: &mut Hub, guid: &str, list: &[&str]) {
    hub.command(guid, &json!({ "list": list }));
}

/// Two logged-in members of the room "lobby"; receivers pre-drained
fn lobby_pair(hub: &mut Hub) -> (String, UnboundedReceiver<ServerEvent>, String, UnboundedReceiver<ServerEvent>) {
    let (alice, mut rx_a) = connect(hub);
    let (bob, mut rx_b) = connect(hub);
    hub.login(&alice, &json!({ "room": "lobby", "name": "alice" }));
    hub.login(&bob, &json!({ "room": "lobby", "name": "bob" }));
    drain(&mut rx_a);
    drain(&mut rx_b);
    (alice, rx_a, bob, rx_b)
}

#[test]
fn test_youtube_broadcast_and_shape_failure() {
    let mut hub = Hub::new(test_settings());
    let (alice, mut rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["youtube", "dQw4w9WgXcQ"]);
    let events = drain(&mut rx_b);
    assert!(events.contains(&ServerEvent::Youtube {
        guid: alice.clone(),
        vid: "dQw4w9WgXcQ".to_string(),
    }));

    send_command(&mut hub, &alice, &["youtube", "short"]);
    // Failure is a private reply, no broadcast
    assert!(drain(&mut rx_b).iter().all(|e| !matches!(e, ServerEvent::Youtube { .. })));
    let events = drain(&mut rx_a);
    assert!(events.contains(&ServerEvent::CommandFail {
        reason: CommandFailReason::InvalidFormat,
    }));
}

#[test]
fn test_runlevel_gate_blocks_side_effects() {
    let mut settings = test_settings();
    settings.private.runlevel.insert("joke".to_string(), 2);
    let mut hub = Hub::new(settings);
    let (alice, mut rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["joke"]);

    // The room sees nothing
    assert!(drain(&mut rx_b).is_empty());
    // The sender gets exactly one runlevel failure
    let events = drain(&mut rx_a);
    assert_eq!(
        events,
        vec![ServerEvent::CommandFail {
            reason: CommandFailReason::Runlevel,
        }]
    );
}

#[test]
fn test_godmode_elevation_unlocks_gated_command() {
    let mut settings = test_settings();
    settings.private.runlevel.insert("joke".to_string(), 2);
    let mut hub = Hub::new(settings);
    let (alice, mut rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["godmode", "wrong"]);
    assert_eq!(hub.session(&alice).unwrap().runlevel, 0);

    send_command(&mut hub, &alice, &["godmode", "hunter2"]);
    assert_eq!(hub.session(&alice).unwrap().runlevel, GOD_RUNLEVEL);

    send_command(&mut hub, &alice, &["joke"]);
    let events = drain(&mut rx_b);
    assert!(events.iter().any(|e| matches!(e, ServerEvent::Joke { .. })));
    drain(&mut rx_a);
}

#[test]
fn test_unknown_command_yields_generic_failure() {
    let mut hub = Hub::new(test_settings());
    let (alice, mut rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["frobnicate"]);

    assert!(drain(&mut rx_b).is_empty());
    let events = drain(&mut rx_a);
    assert_eq!(
        events,
        vec![ServerEvent::CommandFail {
            reason: CommandFailReason::Unknown,
        }]
    );
}

#[test]
fn test_malformed_command_becomes_flagged_talk() {
    let mut hub = Hub::new(test_settings());
    let (alice, _rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    hub.command(&alice, &json!({ "list": [] }));
    hub.command(&alice, &json!({ "wrong": true }));
    hub.command(&alice, &json!("junk"));

    let events = drain(&mut rx_b);
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| matches!(
        e,
        ServerEvent::Talk { text, .. } if text.contains("SCREW WITH THE SERVER")
    )));
}

#[test]
fn test_command_name_is_case_insensitive() {
    let mut hub = Hub::new(test_settings());
    let (alice, _rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["YouTube", "dQw4w9WgXcQ"]);
    let events = drain(&mut rx_b);
    assert!(events.iter().any(|e| matches!(e, ServerEvent::Youtube { .. })));
}

#[test]
fn test_passthrough_broadcasts_sender_only() {
    let mut hub = Hub::new(test_settings());
    let (alice, mut rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["bees"]);

    let expected = ServerEvent::Bees { guid: alice.clone() };
    assert!(drain(&mut rx_b).contains(&expected));
    // Broadcast includes the sender
    assert!(drain(&mut rx_a).contains(&expected));
}

#[test]
fn test_color_updates_profile_and_broadcasts() {
    let mut hub = Hub::new(test_settings());
    let (alice, _rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["color", "red"]);
    assert_eq!(hub.session(&alice).unwrap().profile.color, "red");

    let events = drain(&mut rx_b);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::Update { guid, user_public } if *guid == alice && user_public.color == "red"
    )));

    // Off-palette color is ignored without an error
    send_command(&mut hub, &alice, &["color", "plaid"]);
    assert_eq!(hub.session(&alice).unwrap().profile.color, "red");
    assert!(drain(&mut rx_b).is_empty());
}

#[test]
fn test_pope_forces_fixed_color() {
    let mut hub = Hub::new(test_settings());
    let (alice, _rx_a, _bob, _rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["pope"]);
    assert_eq!(hub.session(&alice).unwrap().profile.color, "pope");
}

#[test]
fn test_sanitize_toggle_stores_preference_only() {
    let mut hub = Hub::new(test_settings());
    let (alice, _rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["sanitize", "off"]);
    assert!(!hub.session(&alice).unwrap().sanitize_enabled);

    // Chat text is still stripped: the preference never reaches peers
    hub.talk(&alice, &json!({ "text": "<img src=x onerror=alert(1)>hi 'bob'" }));
    let events = drain(&mut rx_b);
    assert!(events.contains(&ServerEvent::Talk {
        guid: alice.clone(),
        text: "hi bob".to_string(),
    }));

    send_command(&mut hub, &alice, &["sanitize", "on"]);
    assert!(hub.session(&alice).unwrap().sanitize_enabled);
}

#[test]
fn test_name_command_updates_and_broadcasts() {
    let mut hub = Hub::new(test_settings());
    let (alice, _rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["name", "NewName"]);
    assert_eq!(hub.session(&alice).unwrap().profile.name, "NewName");
    assert!(drain(&mut rx_b).iter().any(|e| matches!(
        e,
        ServerEvent::Update { user_public, .. } if user_public.name == "NewName"
    )));
}

#[test]
fn test_pitch_and_speed_clamp_to_room_range() {
    let mut settings = test_settings();
    settings.private.pitch.min = 10;
    settings.private.pitch.max = 90;
    let mut hub = Hub::new(settings);
    let (alice, _rx_a, _bob, _rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["pitch", "500"]);
    assert_eq!(hub.session(&alice).unwrap().profile.pitch, 90);

    send_command(&mut hub, &alice, &["pitch", "-3"]);
    assert_eq!(hub.session(&alice).unwrap().profile.pitch, 10);
}

#[test]
fn test_vaporwave_reply_and_room_broadcast() {
    let mut hub = Hub::new(test_settings());
    let (alice, mut rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["vaporwave"]);

    let own = drain(&mut rx_a);
    assert!(own.contains(&ServerEvent::Vaporwave));
    let room = drain(&mut rx_b);
    assert!(room.iter().any(|e| matches!(
        e,
        ServerEvent::Youtube { vid, .. } if vid == VAPORWAVE_VID
    )));
    // The cosmetic toggle itself stays private
    assert!(!room.contains(&ServerEvent::Vaporwave));
}

#[test]
fn test_command_before_login_is_ignored() {
    let mut hub = Hub::new(test_settings());
    let (guid, mut rx) = connect(&mut hub);

    send_command(&mut hub, &guid, &["joke"]);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_media_command_requires_http_prefix() {
    let mut hub = Hub::new(test_settings());
    let (alice, mut rx_a, _bob, mut rx_b) = lobby_pair(&mut hub);

    send_command(&mut hub, &alice, &["img", "https://catsite/cat.png"]);
    let events = drain(&mut rx_b);
    assert!(events.iter().any(|e| matches!(e, ServerEvent::Img { .. })));

    send_command(&mut hub, &alice, &["img", "notaurl"]);
    assert!(drain(&mut rx_b).is_empty());
    assert!(drain(&mut rx_a).contains(&ServerEvent::CommandFail {
        reason: CommandFailReason::InvalidFormat,
    }));
}
