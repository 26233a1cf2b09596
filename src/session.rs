//! Session struct definition
//!
//! Server-side state for one connected client: identity, nickname, current
//! room, and the outbound message channel.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Protocol state of a session, derived from its fields
///
/// `Unregistered` until a nickname is set, `Idle` with a nickname but no
/// room, `InRoom` while a member of exactly one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unregistered,
    Idle,
    InRoom,
}

/// One connected client
///
/// Holds the session id, the optional nickname, the current room (set iff
/// the session is in a room) and the sender side of the bounded outbound
/// queue. The receiver side is drained by the connection's write task, so
/// dropping a `Session` closes the queue and lets the write task finish.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier, assigned by the client registry
    pub id: ClientId,
    /// Nickname (None before `/nick`)
    pub nickname: Option<String>,
    /// Name of the current room (Some iff state is `InRoom`)
    pub room: Option<String>,
    /// Server → client message channel
    sender: mpsc::Sender<ServerMessage>,
}

impl Session {
    /// Create a new session in the `Unregistered` state.
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            nickname: None,
            room: None,
            sender,
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> SessionState {
        match (&self.nickname, &self.room) {
            (None, _) => SessionState::Unregistered,
            (Some(_), None) => SessionState::Idle,
            (Some(_), Some(_)) => SessionState::InRoom,
        }
    }

    /// Whether a nickname has been set.
    pub fn is_registered(&self) -> bool {
        self.nickname.is_some()
    }

    /// Nickname, if set.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Queue a message for this session without blocking.
    ///
    /// The dispatch loop must never wait on a slow peer, so this is a
    /// `try_send`: a full queue means the peer has exhausted its
    /// backpressure allowance and is reported as `Backlogged`.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Backlogged,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}
