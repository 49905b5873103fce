use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use warp::ws::{Message, WebSocket};

use crate::core::connection::Connection;
use crate::core::events::InboundEnvelope;
use crate::core::hub::{lock_hub, SharedHub};

// Handle a WebSocket connection for its whole lifetime
pub async fn handle_ws_client(ws: WebSocket, addr: Option<SocketAddr>, hub: SharedHub) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    // Forward queued server events onto the socket, one task per connection
    tokio::task::spawn(async move {
        let mut rx = rx;
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::text(frame)).await {
                debug!("WebSocket send failed, client gone: {}", e);
                break;
            }
        }
    });

    // Ban check precedes session creation; a refused origin never gets to login
    let guid = {
        let mut hub_guard = match lock_hub(&hub) {
            Ok(guard) => guard,
            Err(e) => {
                error!("Failed to acquire hub lock for registration: {}", e);
                return;
            }
        };

        if let Some(ip) = addr.map(|a| a.ip()) {
            if hub_guard.ban.is_banned(&ip) {
                let connection = Connection::new(tx.clone(), addr);
                hub_guard.ban.handle_ban(&connection);
                return;
            }
        }

        let guid = hub_guard.connect(tx.clone(), addr);
        info!("Current connections: {}", hub_guard.session_count());
        guid
    };

    // Inbound events are processed in arrival order, each to completion
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_text() {
                    process_frame(&msg, &guid, &hub);
                }
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", guid, e);
                break;
            }
        }
    }

    // Graceful or abrupt, teardown always runs
    match lock_hub(&hub) {
        Ok(mut hub_guard) => {
            hub_guard.disconnect(&guid);
            info!("Current connections: {}", hub_guard.session_count());
        }
        Err(e) => {
            error!("Failed to acquire hub lock for disconnect: {}", e);
        }
    }
}

fn process_frame(msg: &Message, guid: &str, hub: &SharedHub) {
    let raw = match msg.to_str() {
        Ok(s) => s,
        Err(_) => {
            warn!("Non-text frame from {}", guid);
            return;
        }
    };

    let envelope: InboundEnvelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Unparseable frame from {}: {}", guid, e);
            return;
        }
    };

    match lock_hub(hub) {
        Ok(mut hub_guard) => hub_guard.handle_event(guid, envelope),
        Err(e) => error!("Failed to acquire hub lock for event: {}", e),
    }
}
