//! Roomcast - a real-time multi-room broadcast server
//!
//! Clients hold a persistent WebSocket, join a named room, and exchange chat
//! text, media directives, and role-gated commands fanned out to the other
//! members of the same room.

pub mod ban;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod sanitize;

// Re-export main components
pub use config::*;
pub use constants::*;
