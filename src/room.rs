//! Room definitions and registry
//!
//! A room is a named broadcast group, created lazily when first joined and
//! removed as soon as its last member leaves. Re-joining an emptied room's
//! name later creates a fresh room, indistinguishable on the wire.

use std::collections::{HashMap, HashSet};

use crate::types::{ClientId, RoomId};

/// A named broadcast group
#[derive(Debug)]
pub struct Room {
    /// Room id, assigned at creation
    pub id: RoomId,
    /// Lookup key; rooms are addressed by name on the wire
    pub name: String,
    /// Current members (no duplicates, insertion order irrelevant)
    members: HashSet<ClientId>,
}

impl Room {
    fn new(id: RoomId, name: String) -> Self {
        Self {
            id,
            name,
            members: HashSet::new(),
        }
    }

    /// Add a member. Returns false if it was already present.
    pub fn add_member(&mut self, id: ClientId) -> bool {
        self.members.insert(id)
    }

    /// Remove a member. Returns false if it was not present.
    pub fn remove_member(&mut self, id: ClientId) -> bool {
        self.members.remove(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.members.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Snapshot of the member set, for iterating while the registry is
    /// mutated or messages are queued.
    pub fn members(&self) -> Vec<ClientId> {
        self.members.iter().copied().collect()
    }
}

/// Registry of live rooms, keyed by name
///
/// Owns the monotonic room id counter (no ambient global).
#[derive(Debug, Default)]
pub struct RoomRegistry {
    next_id: u64,
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the room for `name`, creating it empty if absent.
    pub fn get_or_create(&mut self, name: &str) -> &mut Room {
        let next_id = &mut self.next_id;
        self.rooms.entry(name.to_string()).or_insert_with(|| {
            *next_id += 1;
            Room::new(RoomId::from_raw(*next_id), name.to_string())
        })
    }

    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    /// Drop the room if it has no members left. Returns true if removed.
    pub fn remove_if_empty(&mut self, name: &str) -> bool {
        if self.rooms.get(name).is_some_and(Room::is_empty) {
            self.rooms.remove(name);
            true
        } else {
            false
        }
    }

    /// Member snapshot for a room, empty if the room does not exist.
    pub fn members(&self, name: &str) -> Vec<ClientId> {
        self.rooms.get(name).map(Room::members).unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
