//! Transport handle owned by a session
//!
//! The connection is the session's only way to reach its client: an unbounded
//! channel drained by the per-connection forwarding task, which serializes
//! events onto the WebSocket. Sends are fire-and-forget; a closed channel
//! just means the client is already gone.

use log::warn;
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::core::events::ServerEvent;

pub struct Connection {
    pub sender: mpsc::UnboundedSender<ServerEvent>,
    /// Remote address, when the transport could report one
    pub addr: Option<SocketAddr>,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>, addr: Option<SocketAddr>) -> Self {
        Self { sender, addr }
    }

    /// Queue an event for delivery to this client
    pub fn send(&self, event: ServerEvent) -> bool {
        match self.sender.send(event) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to queue event for disconnected client");
                false
            }
        }
    }

    /// Address string for audit records, "N/A" when lookup failed
    pub fn describe_addr(&self) -> String {
        self.addr
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    /// Port string for audit records, "N/A" when lookup failed
    pub fn describe_port(&self) -> String {
        self.addr
            .map(|a| a.port().to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}
