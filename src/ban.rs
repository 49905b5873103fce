//! Origin-address ban list
//!
//! Consulted once per connection, before a session can attempt login.
//! Persistent storage of the list is out of scope; this keeps the in-memory
//! view and performs the ban-side-effects on a refused connection.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::core::connection::Connection;
use crate::core::events::ServerEvent;

/// Banned origins (address -> ban expiry, None for permanent)
#[derive(Debug, Default)]
pub struct BanGuard {
    entries: HashMap<IpAddr, Option<DateTime<Utc>>>,
}

impl BanGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ban an address, permanently or for a number of hours
    pub fn ban(&mut self, addr: IpAddr, duration_hours: Option<u64>) {
        let expiry = duration_hours.map(|hours| Utc::now() + Duration::hours(hours as i64));
        self.entries.insert(addr, expiry);
    }

    /// Lift a ban
    pub fn unban(&mut self, addr: &IpAddr) {
        self.entries.remove(addr);
    }

    pub fn is_banned(&self, addr: &IpAddr) -> bool {
        match self.entries.get(addr) {
            Some(Some(expiry)) => Utc::now() < *expiry,
            Some(None) => true, // Permanent ban
            None => false,
        }
    }

    /// Notify a refused connection; the transport glue drops it afterwards
    pub fn handle_ban(&self, connection: &Connection) {
        log::info!(target: "access", "banned connection refused: {}", connection.describe_addr());
        connection.send(ServerEvent::Ban);
    }
}
