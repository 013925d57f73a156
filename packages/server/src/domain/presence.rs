//! Presence registry.
//!
//! Pure bookkeeping of who is online: user id → open connections with the
//! time each one was last heard from. Callers own the locking and turn the
//! returned transitions into `user.online` / `user.offline` events.

use std::collections::HashMap;

use super::{
    entity::User,
    value_object::{ConnectionId, Timestamp, UserId},
};

#[derive(Debug)]
struct PresenceEntry {
    user: User,
    connections: HashMap<ConnectionId, Timestamp>,
}

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    users: HashMap<UserId, PresenceEntry>,
    owners: HashMap<ConnectionId, UserId>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns `true` when the user just came online.
    pub fn connect(&mut self, user: User, connection: ConnectionId, now: Timestamp) -> bool {
        self.owners.insert(connection, user.id);
        let entry = self
            .users
            .entry(user.id)
            .or_insert_with(|| PresenceEntry {
                user: user.clone(),
                connections: HashMap::new(),
            });
        // keep the latest profile (name / avatar may have changed)
        entry.user = user;
        let was_offline = entry.connections.is_empty();
        entry.connections.insert(connection, now);
        was_offline
    }

    /// Refresh the liveness of a connection. Returns `false` for unknown ones.
    pub fn heartbeat(&mut self, connection: ConnectionId, now: Timestamp) -> bool {
        let Some(user_id) = self.owners.get(&connection) else {
            return false;
        };
        match self.users.get_mut(user_id) {
            Some(entry) => {
                entry.connections.insert(connection, now);
                true
            }
            None => false,
        }
    }

    /// Drop a connection. Returns the user when it was their last one.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<User> {
        let user_id = self.owners.remove(&connection)?;
        let entry = self.users.get_mut(&user_id)?;
        entry.connections.remove(&connection);
        if entry.connections.is_empty() {
            self.users.remove(&user_id).map(|entry| entry.user)
        } else {
            None
        }
    }

    /// Evict every connection silent for longer than `timeout_millis`.
    /// Returns the users that went offline as a result, ordered by id.
    pub fn evict_stale(&mut self, now: Timestamp, timeout_millis: i64) -> Vec<User> {
        let stale: Vec<ConnectionId> = self
            .users
            .values()
            .flat_map(|entry| entry.connections.iter())
            .filter(|(_, last_seen)| now.value() - last_seen.value() > timeout_millis)
            .map(|(connection, _)| *connection)
            .collect();

        let mut offline: Vec<User> = stale
            .into_iter()
            .filter_map(|connection| self.disconnect(connection))
            .collect();
        offline.sort_by_key(|user| user.id);
        offline
    }

    /// Online users ordered by id.
    pub fn online_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.values().map(|entry| entry.user.clone()).collect();
        users.sort_by_key(|user| user.id);
        users
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.users.contains_key(&user_id)
    }
}
