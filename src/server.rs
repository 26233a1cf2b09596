//! ChatServer actor implementation
//!
//! The central actor that owns all mutable state: the client registry, the
//! room registry, and every session. Commands from all connections funnel
//! through one mpsc channel, so mutations are serialized and broadcasts
//! observe a single global order. No other task touches this state.
//!
//! The actor never blocks on a peer: outbound delivery is `try_send` into
//! each session's bounded queue, and a session whose queue overflows or
//! closes is collected and disconnected after the current command finishes.

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::error::CommandError;
use crate::handler::handle_connection;
use crate::message::{ClientMessage, ServerMessage};
use crate::registry::ClientRegistry;
use crate::room::RoomRegistry;
use crate::types::ClientId;

/// Capacity of the actor's command channel. Read tasks await capacity
/// here, so a flooding client throttles itself rather than the server.
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Commands sent from connection handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection; the actor assigns and returns the session id
    Connect {
        sender: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<ClientId>,
    },
    /// Connection ended (orderly close or transport fault)
    Disconnect { client_id: ClientId },
    /// A decoded line from the client
    Request {
        client_id: ClientId,
        message: ClientMessage,
    },
    /// A line that failed to parse; answered with ERROR in order
    Malformed { client_id: ClientId },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// Live sessions and the nickname index
    clients: ClientRegistry,
    /// Live rooms, keyed by name
    rooms: RoomRegistry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
    /// Sessions whose outbound queue failed mid-command; reaped afterwards
    dead: Vec<ClientId>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            clients: ClientRegistry::new(),
            rooms: RoomRegistry::new(),
            receiver,
            dead: Vec::new(),
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped. A command's full effect (state transition plus broadcasts)
    /// completes before the next command is looked at.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command, then disconnect any peer that proved
    /// undeliverable while handling it.
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { sender, reply } => {
                self.handle_connect(sender, reply);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Request { client_id, message } => {
                self.dispatch(client_id, message);
            }
            ServerCommand::Malformed { client_id } => {
                self.send_to(client_id, ServerMessage::Error);
            }
        }
        self.reap();
    }

    /// Map a decoded line to the matching session/room operation.
    ///
    /// Command lines get exactly one OK/ERROR reply; chat lines get none.
    fn dispatch(&mut self, id: ClientId, message: ClientMessage) {
        if self.clients.get(id).is_none() {
            // lines already in flight from a session reaped moments ago
            return;
        }
        match message {
            ClientMessage::Nick { name } => {
                let result = self.handle_nick(id, name);
                self.reply(id, result);
            }
            ClientMessage::Join { room } => {
                let result = self.handle_join(id, room);
                self.reply(id, result);
            }
            ClientMessage::Leave => {
                let result = self.handle_leave(id);
                self.reply(id, result);
            }
            ClientMessage::Priv { to, text } => {
                let result = self.handle_priv(id, to, text);
                self.reply(id, result);
            }
            ClientMessage::Chat { text } => self.handle_chat(id, text),
            ClientMessage::Bye => self.handle_bye(id),
        }
    }

    fn reply(&mut self, id: ClientId, result: Result<(), CommandError>) {
        match result {
            Ok(()) => self.send_to(id, ServerMessage::Ok),
            Err(e) => {
                debug!("client {}: command rejected: {}", id, e);
                self.send_to(id, ServerMessage::Error);
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(&mut self, sender: mpsc::Sender<ServerMessage>, reply: oneshot::Sender<ClientId>) {
        let id = self.clients.register(sender);
        info!("client {} connected", id);
        debug!(
            "total clients: {}, total rooms: {}",
            self.clients.len(),
            self.rooms.room_count()
        );
        if reply.send(id).is_err() {
            // handler died before learning its id; undo the registration
            self.remove_session(id);
        }
    }

    /// Handle connection teardown reported by the handler
    fn handle_disconnect(&mut self, id: ClientId) {
        if self.clients.get(id).is_none() {
            return; // already gone via /bye or reaping
        }
        info!("client {} disconnected", id);
        self.remove_session(id);
    }

    /// Set or change a nickname.
    ///
    /// Re-claiming one's own nickname succeeds without a broadcast; an
    /// actual change while in a room tells the other members.
    fn handle_nick(&mut self, id: ClientId, name: String) -> Result<(), CommandError> {
        let session = self.clients.get(id).ok_or(CommandError::NotRegistered)?;
        let old = session.nickname.clone();
        let room = session.room.clone();

        if !self.clients.try_claim_name(id, &name) {
            return Err(CommandError::NameInUse(name));
        }
        info!("client {} set nickname '{}'", id, name);

        if let (Some(room), Some(old)) = (room, old) {
            if old != name {
                self.broadcast(&room, ServerMessage::NewNick { old, new: name }, Some(id));
            }
        }
        Ok(())
    }

    /// Join (and lazily create) a room, leaving the current one first.
    fn handle_join(&mut self, id: ClientId, room: String) -> Result<(), CommandError> {
        let session = self.clients.get(id).ok_or(CommandError::NotRegistered)?;
        let nick = session
            .nickname()
            .ok_or(CommandError::NotRegistered)?
            .to_string();
        if session.room.as_deref() == Some(room.as_str()) {
            return Err(CommandError::AlreadyInRoom(room));
        }

        if let Some(old) = session.room.clone() {
            self.depart_room(id, &old, &nick);
        }

        let target = self.rooms.get_or_create(&room);
        target.add_member(id);
        debug!(
            "room '{}' ({}) now has {} members",
            room,
            target.id,
            target.member_count()
        );
        if let Some(session) = self.clients.get_mut(id) {
            session.room = Some(room.clone());
        }
        info!("client {} joined room '{}'", id, room);

        self.broadcast(&room, ServerMessage::Joined { user: nick }, Some(id));
        Ok(())
    }

    /// Leave the current room.
    fn handle_leave(&mut self, id: ClientId) -> Result<(), CommandError> {
        let session = self.clients.get(id).ok_or(CommandError::NotRegistered)?;
        let Some(room) = session.room.clone() else {
            return Err(CommandError::NotInRoom);
        };
        let nick = session
            .nickname()
            .ok_or(CommandError::NotRegistered)?
            .to_string();

        self.depart_room(id, &room, &nick);
        info!("client {} left room '{}'", id, room);
        Ok(())
    }

    /// Broadcast a chat line to the other members of the current room.
    ///
    /// A client outside a room cannot chat; the line is dropped without a
    /// reply.
    fn handle_chat(&mut self, id: ClientId, text: String) {
        let Some(session) = self.clients.get(id) else {
            return;
        };
        let (Some(nick), Some(room)) = (
            session.nickname().map(str::to_string),
            session.room.clone(),
        ) else {
            debug!("client {} chatted outside a room, ignoring", id);
            return;
        };
        self.broadcast(&room, ServerMessage::Chat { from: nick, text }, Some(id));
    }

    /// Deliver a directed message, bypassing rooms entirely.
    fn handle_priv(&mut self, id: ClientId, to: String, text: String) -> Result<(), CommandError> {
        let session = self.clients.get(id).ok_or(CommandError::NotRegistered)?;
        let nick = session
            .nickname()
            .ok_or(CommandError::NotRegistered)?
            .to_string();
        if to == nick {
            return Err(CommandError::SelfTarget);
        }
        let target = self
            .clients
            .lookup_name(&to)
            .ok_or(CommandError::UnknownUser(to))?;

        self.send_to(target, ServerMessage::Chat { from: nick, text });
        Ok(())
    }

    /// Handle a graceful `/bye`
    fn handle_bye(&mut self, id: ClientId) {
        info!("client {} said bye", id);
        self.remove_session(id);
    }

    /// Full disconnect sequence: implicit leave, best-effort BYE, destroy.
    ///
    /// Afterwards the session is absent from every room's member set and
    /// from both registry indexes, and its nickname is released.
    fn remove_session(&mut self, id: ClientId) {
        let Some(session) = self.clients.unregister(id) else {
            return;
        };
        if let (Some(room), Some(nick)) = (session.room.clone(), session.nickname()) {
            let nick = nick.to_string();
            self.depart_room(id, &room, &nick);
        }
        // best-effort: the write task may already be gone
        let _ = session.send(ServerMessage::Bye);
        debug!(
            "total clients: {}, total rooms: {}",
            self.clients.len(),
            self.rooms.room_count()
        );
    }

    /// Remove `id` from `room`, tell the remaining members, and drop the
    /// room if it emptied.
    fn depart_room(&mut self, id: ClientId, room: &str, nick: &str) {
        if let Some(r) = self.rooms.get_mut(room) {
            r.remove_member(id);
        }
        if let Some(session) = self.clients.get_mut(id) {
            session.room = None;
        }
        if self.rooms.remove_if_empty(room) {
            debug!("room '{}' deleted (empty)", room);
        } else {
            self.broadcast(
                room,
                ServerMessage::Left {
                    user: nick.to_string(),
                },
                None,
            );
        }
    }

    /// Deliver `msg` to every member of `room` except `exclude`.
    ///
    /// One member's failure never prevents delivery to the rest; failed
    /// members are queued for disconnection.
    fn broadcast(&mut self, room: &str, msg: ServerMessage, exclude: Option<ClientId>) {
        for member in self.rooms.members(room) {
            if Some(member) == exclude {
                continue;
            }
            self.send_to(member, msg.clone());
        }
    }

    /// Queue one message for one session, marking it dead on failure.
    fn send_to(&mut self, id: ClientId, msg: ServerMessage) {
        let Some(session) = self.clients.get(id) else {
            return;
        };
        if let Err(e) = session.send(msg) {
            warn!("client {}: dropping session ({})", id, e);
            self.dead.push(id);
        }
    }

    /// Disconnect every session marked dead, including any that fail while
    /// their rooms are notified (worklist, not recursion).
    fn reap(&mut self) {
        while let Some(id) = self.dead.pop() {
            self.remove_session(id);
        }
    }
}

/// Accept connections on `listener` and relay between them until the
/// process ends. Spawns the ChatServer actor and one handler per socket.
pub async fn serve(listener: TcpListener) {
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(ChatServer::new(cmd_rx).run());

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("new connection from {}", addr);
                let cmd_tx = cmd_tx.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx).await {
                        error!("connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("failed to accept connection: {}", e);
            }
        }
    }
}
