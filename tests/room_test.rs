//! Room lifecycle and directory invariants, driven through the hub

use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use roomcast::config::Settings;
use roomcast::core::events::{LoginFailReason, ServerEvent};
use roomcast::core::hub::Hub;

fn test_settings(private_capacity: usize, public_capacity: usize) -> Settings {
    let mut settings = Settings::default();
    settings.private.capacity = private_capacity;
    settings.public.capacity = public_capacity;
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

fn login(hub: &mut Hub, guid: &str, room: Option<&str>, name: &str) {
    hub.login(guid, &json!({ "room": room, "name": name }));
}

#[test]
fn test_private_room_created_with_owner() {
    let mut hub = Hub::new(test_settings(4, 4));
    let (guid, mut rx) = connect(&mut hub);

    login(&mut hub, &guid, Some("lobby"), "Ali!ce");

    // Sanitized name drops the '!'
    assert_eq!(hub.session(&guid).unwrap().profile.name, "Alice");

    let events = drain(&mut rx);
    assert!(events.contains(&ServerEvent::Room {
        room: "lobby".to_string(),
        is_owner: true,
        is_public: false,
    }));
    assert!(hub.directory().contains("lobby"));
    assert!(!hub.directory().is_public("lobby"));
}

#[test]
fn test_second_member_is_not_owner() {
    let mut hub = Hub::new(test_settings(4, 4));
    let (alice, _rx_a) = connect(&mut hub);
    let (bob, mut rx_b) = connect(&mut hub);

    login(&mut hub, &alice, Some("lobby"), "alice");
    login(&mut hub, &bob, Some("lobby"), "bob");

    let events = drain(&mut rx_b);
    assert!(events.contains(&ServerEvent::Room {
        room: "lobby".to_string(),
        is_owner: false,
        is_public: false,
    }));
}

#[test]
fn test_full_room_rejects_third_login() {
    let mut hub = Hub::new(test_settings(2, 4));
    let (a, _rx_a) = connect(&mut hub);
    let (b, _rx_b) = connect(&mut hub);
    let (c, mut rx_c) = connect(&mut hub);

    login(&mut hub, &a, Some("lobby"), "a");
    login(&mut hub, &b, Some("lobby"), "b");
    login(&mut hub, &c, Some("lobby"), "c");

    let events = drain(&mut rx_c);
    assert!(events.contains(&ServerEvent::LoginFail {
        reason: LoginFailReason::Full,
    }));
    assert_eq!(hub.directory().get("lobby").unwrap().member_count(), 2);
    assert!(!hub.session(&c).unwrap().is_logged_in());
}

#[test]
fn test_public_overflow_spawns_fresh_room() {
    let mut hub = Hub::new(test_settings(4, 1));
    let (a, _rx_a) = connect(&mut hub);
    let (b, mut rx_b) = connect(&mut hub);

    login(&mut hub, &a, None, "a");
    login(&mut hub, &b, None, "b");

    let room_a = hub.session(&a).unwrap().room.clone().unwrap();
    let room_b = hub.session(&b).unwrap().room.clone().unwrap();
    assert_ne!(room_a, room_b);
    assert!(hub.directory().is_public(&room_a));
    assert!(hub.directory().is_public(&room_b));

    // The overflow login never sees a "full" failure
    let events = drain(&mut rx_b);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ServerEvent::LoginFail { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::Room { is_public: true, is_owner: false, .. }
    )));
}

#[test]
fn test_newest_public_room_wins() {
    let mut hub = Hub::new(test_settings(4, 2));
    let (a, _rx_a) = connect(&mut hub);
    let (b, _rx_b) = connect(&mut hub);

    login(&mut hub, &a, None, "a");
    login(&mut hub, &b, None, "b");

    // Room still has capacity, so both land together
    assert_eq!(
        hub.session(&a).unwrap().room,
        hub.session(&b).unwrap().room
    );
}

#[test]
fn test_empty_room_reclaimed_on_disconnect() {
    let mut hub = Hub::new(test_settings(4, 4));
    let (guid, _rx) = connect(&mut hub);

    login(&mut hub, &guid, Some("lobby"), "a");
    assert!(hub.directory().contains("lobby"));

    hub.disconnect(&guid);
    assert!(!hub.directory().contains("lobby"));
    assert_eq!(hub.directory().room_count(), 0);
}

#[test]
fn test_public_room_reclaim_clears_public_set() {
    let mut hub = Hub::new(test_settings(4, 4));
    let (guid, _rx) = connect(&mut hub);

    login(&mut hub, &guid, None, "a");
    let rid = hub.session(&guid).unwrap().room.clone().unwrap();
    assert!(hub.directory().is_public(&rid));

    hub.disconnect(&guid);
    assert!(!hub.directory().contains(&rid));
    assert!(!hub.directory().is_public(&rid));
}

#[test]
fn test_room_survives_while_members_remain() {
    let mut hub = Hub::new(test_settings(4, 4));
    let (a, _rx_a) = connect(&mut hub);
    let (b, mut rx_b) = connect(&mut hub);

    login(&mut hub, &a, Some("lobby"), "a");
    login(&mut hub, &b, Some("lobby"), "b");
    drain(&mut rx_b);

    hub.disconnect(&a);
    assert!(hub.directory().contains("lobby"));
    assert_eq!(hub.directory().get("lobby").unwrap().member_count(), 1);

    // Remaining member saw the leave notice
    let events = drain(&mut rx_b);
    assert!(events.contains(&ServerEvent::Leave { guid: a.clone() }));
}

#[test]
fn test_failed_login_leaves_no_room_behind() {
    let mut settings = test_settings(4, 4);
    settings.private.name_limit = 3;
    let mut hub = Hub::new(settings);
    let (guid, mut rx) = connect(&mut hub);

    login(&mut hub, &guid, Some("lobby"), "waytoolongname");

    let events = drain(&mut rx);
    assert!(events.contains(&ServerEvent::LoginFail {
        reason: LoginFailReason::NameLength,
    }));
    // The room the failed login pointed at was never created
    assert!(!hub.directory().contains("lobby"));
    assert_eq!(hub.directory().room_count(), 0);
}
