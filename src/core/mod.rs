//! Core session/room lifecycle and command dispatch

pub mod commands;
pub mod connection;
pub mod events;
pub mod hub;
pub mod room;
pub mod session;

pub use connection::Connection;
pub use hub::{create_hub, lock_hub, Hub, SharedHub};
pub use room::{Room, RoomDirectory};
pub use session::{Phase, Profile, Session};
