use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Tracks which live connections are subscribed to which conversation
///
/// Purely in-memory and owned by the broadcast core, which serializes all
/// access, so no interior locking is needed. Both directions are indexed so
/// that `leave` does not have to scan every room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// conversation_id -> subscribed connection ids
    rooms: HashMap<String, BTreeSet<String>>,
    /// connection_id -> conversation ids it joined
    memberships: HashMap<String, BTreeSet<String>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection to a room; returns false if it already was
    pub fn join(&mut self, connection_id: &str, conversation_id: &str) -> bool {
        let added = self
            .rooms
            .entry(conversation_id.to_string())
            .or_default()
            .insert(connection_id.to_string());

        if added {
            self.memberships
                .entry(connection_id.to_string())
                .or_default()
                .insert(conversation_id.to_string());
            debug!(
                connection_id = %connection_id,
                room_id = %conversation_id,
                "Connection joined room"
            );
        }

        added
    }

    /// Removes a connection from every room; returns the rooms it left
    pub fn leave(&mut self, connection_id: &str) -> Vec<String> {
        let Some(conversation_ids) = self.memberships.remove(connection_id) else {
            return Vec::new();
        };

        for conversation_id in &conversation_ids {
            if let Some(subscribers) = self.rooms.get_mut(conversation_id) {
                subscribers.remove(connection_id);
                if subscribers.is_empty() {
                    self.rooms.remove(conversation_id);
                }
            }
        }

        debug!(
            connection_id = %connection_id,
            rooms = conversation_ids.len(),
            "Connection left all rooms"
        );
        conversation_ids.into_iter().collect()
    }

    /// Snapshot of the connections currently subscribed to a room
    pub fn subscribers_of(&self, conversation_id: &str) -> Vec<String> {
        self.rooms
            .get(conversation_id)
            .map(|subscribers| subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, connection_id: &str) -> Vec<String> {
        self.memberships
            .get(connection_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one subscriber
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
