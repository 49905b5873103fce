//! Rooms and the process-wide room directory

use std::collections::HashMap;
use uuid::Uuid;

use crate::config::RoomPrefs;
use crate::error::{Result, RoomcastError};

/// A broadcast scope shared by a set of connected sessions
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    /// Immutable preference snapshot taken at creation time
    pub prefs: RoomPrefs,
    /// Member guids in insertion order; order only matters for broadcast
    /// iteration, never for correctness
    members: Vec<String>,
}

impl Room {
    pub fn new(id: String, prefs: RoomPrefs) -> Self {
        Self {
            id,
            prefs,
            members: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.prefs.capacity
    }

    pub fn add_member(&mut self, guid: String) -> Result<()> {
        if self.is_full() {
            return Err(RoomcastError::RoomFull);
        }
        if !self.members.contains(&guid) {
            self.members.push(guid);
        }
        Ok(())
    }

    /// Returns whether the guid was actually a member
    pub fn remove_member(&mut self, guid: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != guid);
        self.members.len() != before
    }

    pub fn has_member(&self, guid: &str) -> bool {
        self.members.iter().any(|m| m == guid)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// Registry of all live rooms plus the auto-assignable public subset.
///
/// Invariant: every id in `public_order` is a key of `rooms`, and a room
/// never outlives its last member.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
    /// Public room ids in creation order; the newest is the join candidate
    public_order: Vec<String>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, rid: &str) -> Option<&Room> {
        self.rooms.get(rid)
    }

    pub fn get_mut(&mut self, rid: &str) -> Option<&mut Room> {
        self.rooms.get_mut(rid)
    }

    pub fn contains(&self, rid: &str) -> bool {
        self.rooms.contains_key(rid)
    }

    pub fn is_public(&self, rid: &str) -> bool {
        self.public_order.iter().any(|id| id == rid)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Room id a no-room login lands in: the most recently created public
    /// room when it still has capacity, otherwise a fresh public room under
    /// an opaque id. Overflow never fails, it spawns.
    pub fn resolve_public_room(&mut self, prefs: &RoomPrefs) -> String {
        if let Some(rid) = self.public_order.last() {
            if let Some(room) = self.rooms.get(rid) {
                if !room.is_full() {
                    return rid.clone();
                }
            }
        }

        let rid = Uuid::new_v4().to_string();
        log::debug!("new public room: {}", rid);
        self.rooms.insert(rid.clone(), Room::new(rid.clone(), prefs.clone()));
        self.public_order.push(rid.clone());
        rid
    }

    /// Resolve a client-named room, creating it (owned by the requester)
    /// on first reference. Fails only when the room exists and is full.
    pub fn resolve_or_create_private(
        &mut self,
        rid: &str,
        requester: &str,
        prefs: &RoomPrefs,
    ) -> Result<&Room> {
        if let Some(room) = self.rooms.get(rid) {
            if room.is_full() {
                return Err(RoomcastError::RoomFull);
            }
        } else {
            let mut prefs = prefs.clone();
            prefs.owner = Some(requester.to_string());
            log::debug!("new private room: {} (owner {})", rid, requester);
            self.rooms.insert(rid.to_string(), Room::new(rid.to_string(), prefs));
        }
        // Just inserted or verified present
        self.rooms
            .get(rid)
            .ok_or_else(|| RoomcastError::RoomNotFound(rid.to_string()))
    }

    /// Drop an empty room from the directory and the public set. Must run
    /// synchronously inside the leave that emptied it; a stale empty room
    /// must never be observable.
    pub fn reclaim(&mut self, rid: &str) {
        let empty = self
            .rooms
            .get(rid)
            .map_or(false, |room| room.member_count() == 0);
        if !empty {
            return;
        }
        log::debug!("reclaiming empty room: {}", rid);
        self.rooms.remove(rid);
        self.public_order.retain(|id| id != rid);
    }
}
