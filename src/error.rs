//! Error types for the chat relay
//!
//! Defines the error taxonomy of the protocol engine. Fatality is visible
//! in the type: `ParseError` and `CommandError` become an `ERROR` line and
//! the connection stays open; `DecodeError` and I/O faults are fatal for
//! that one connection and never for the process.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Fatal framing errors from the line decoder
///
/// Any of these ends the connection: the byte stream can no longer be
/// trusted to contain well-formed frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A completed line was not valid UTF-8
    #[error("invalid UTF-8 in line")]
    InvalidUtf8,

    /// Buffered bytes exceeded the line length cap without a newline
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),
}

/// Malformed command lines
///
/// Produced at the codec boundary when a line classified as a command
/// cannot be turned into a typed `ClientMessage`. Answered with `ERROR`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Command verb is not part of the protocol
    #[error("unknown command: /{0}")]
    UnknownCommand(String),

    /// Known verb with a missing required argument
    #[error("/{0} is missing an argument")]
    MissingArgument(&'static str),

    /// Known verb with extra arguments
    #[error("/{0} takes no arguments")]
    TooManyArguments(&'static str),
}

/// Command failures against current session/room/registry state
///
/// Answered with `ERROR`; the session keeps its previous state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Nickname already claimed by a different live session
    #[error("nickname '{0}' is already in use")]
    NameInUse(String),

    /// Operation requires a nickname to be set first
    #[error("no nickname registered")]
    NotRegistered,

    /// Join names the room the session is already in
    #[error("already in room '{0}'")]
    AlreadyInRoom(String),

    /// Leave without a current room
    #[error("not in a room")]
    NotInRoom,

    /// Private message target has no live session
    #[error("no such user: '{0}'")]
    UnknownUser(String),

    /// Private message addressed to the sender itself
    #[error("cannot send a private message to yourself")]
    SelfTarget,
}

/// Outbound delivery failures
///
/// Either way the peer can no longer be served and is disconnected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the outbound channel has been closed
    #[error("outbound channel closed")]
    Closed,

    /// The bounded outbound queue is full (peer reads too slowly)
    #[error("outbound queue full")]
    Backlogged,
}

/// Connection-handler level errors (fatal for one connection)
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on the socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error on the inbound byte stream
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The server actor is gone (internal channel broken)
    #[error("server channel closed")]
    ChannelClosed,
}
