//! Client registry
//!
//! Owns the set of live sessions and the nickname index. The session id
//! counter lives here, not in a global: ids are minted on registration,
//! monotonically, and never reused while the process runs.
//!
//! Invariant: a nickname appears in the index iff some live session
//! currently holds it, so a name is "in use" exactly when the index says so.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::message::ServerMessage;
use crate::session::Session;
use crate::types::ClientId;

/// Registry of connected sessions with an exclusive nickname index
#[derive(Debug, Default)]
pub struct ClientRegistry {
    /// Monotonic id source for new sessions
    next_id: u64,
    /// All live sessions: ClientId -> Session
    sessions: HashMap<ClientId, Session>,
    /// Nickname -> ClientId, for the uniqueness check and private lookup
    names: HashMap<String, ClientId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a session for a new connection.
    ///
    /// Mints the next id and returns it; the session starts unregistered.
    pub fn register(&mut self, sender: mpsc::Sender<ServerMessage>) -> ClientId {
        self.next_id += 1;
        let id = ClientId::from_raw(self.next_id);
        self.sessions.insert(id, Session::new(id, sender));
        id
    }

    /// Remove a session, releasing its nickname.
    ///
    /// Returns the removed session so the caller can finish the disconnect
    /// sequence (room cleanup, best-effort BYE) before dropping it.
    pub fn unregister(&mut self, id: ClientId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        if let Some(name) = session.nickname() {
            self.names.remove(name);
        }
        Some(session)
    }

    pub fn get(&self, id: ClientId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Resolve a nickname to a live session id.
    pub fn lookup_name(&self, name: &str) -> Option<ClientId> {
        self.names.get(name).copied()
    }

    /// Claim `name` for `id`, exclusively.
    ///
    /// Fails if a different live session holds the name. Re-claiming one's
    /// own current nickname succeeds. On success the previous nickname (if
    /// any) is released and the session is updated.
    pub fn try_claim_name(&mut self, id: ClientId, name: &str) -> bool {
        match self.names.get(name) {
            Some(&owner) if owner != id => return false,
            _ => {}
        }
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        if let Some(old) = session.nickname.take() {
            self.names.remove(&old);
        }
        session.nickname = Some(name.to_string());
        self.names.insert(name.to_string(), id);
        true
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
